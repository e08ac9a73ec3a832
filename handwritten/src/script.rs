//! Session scripts: a recorded sequence of contact events, written as TOML.
//!
//! ```toml
//! text = "あ"
//!
//! [pen]
//! width = 4.0
//!
//! [[events]]
//! kind = "began"
//! contact = 1
//! samples = [{ x = 10.0, y = 10.0, stylus = true, force = 0.5 }]
//!
//! [[events]]
//! kind = "moved"
//! contact = 1
//! samples = [{ x = 20.0, y = 12.0, stylus = true, key = 7, estimated = ["force"] }]
//!
//! [[events]]
//! kind = "estimate"
//! contact = 1
//! key = 7
//! force = 0.8
//! ```
//!
//! An event with several samples delivers them as a coalesced batch, the last being the
//! event's own sample.

use handwritten_core::point::{EstimationKey, EstimationUpdate, Properties, RawSample};
use handwritten_core::router::{ContactFrame, ContactId, StrokeSessionRouter};
use ultraviolet::Vec2;

use crate::settings::{CanvasSettings, PenSettings};

#[derive(serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Force,
    Azimuth,
    Altitude,
    Location,
}
impl Property {
    fn flag(self) -> Properties {
        match self {
            Self::Force => Properties::FORCE,
            Self::Azimuth => Properties::AZIMUTH,
            Self::Altitude => Properties::ALTITUDE,
            Self::Location => Properties::LOCATION,
        }
    }
}
fn to_properties(properties: &[Property]) -> Properties {
    properties
        .iter()
        .fold(Properties::empty(), |acc, prop| acc | prop.flag())
}

fn upright() -> f32 {
    std::f32::consts::FRAC_PI_2
}
fn full_force() -> f32 {
    1.0
}

#[derive(serde::Deserialize, Clone, PartialEq, Debug)]
pub struct SampleDesc {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub time: f64,
    /// Omitted means the source does not report pressure.
    pub force: Option<f32>,
    #[serde(default = "upright")]
    pub altitude: f32,
    #[serde(default)]
    pub azimuth: f32,
    #[serde(default)]
    pub stylus: bool,
    /// Estimation key, required if anything is `estimated`.
    pub key: Option<u64>,
    #[serde(default)]
    pub estimated: Vec<Property>,
}
impl SampleDesc {
    pub fn to_sample(&self) -> anyhow::Result<RawSample> {
        let location = Vec2::new(self.x, self.y);
        let mut sample = if self.stylus {
            RawSample::stylus(
                location,
                self.force.unwrap_or(1.0),
                self.altitude,
                self.azimuth,
            )
        } else {
            RawSample {
                force: self.force,
                ..RawSample::direct(location)
            }
        };
        sample.timestamp = self.time;
        match (self.key, self.estimated.is_empty()) {
            (Some(key), _) => {
                sample = sample.with_estimates(EstimationKey(key), to_properties(&self.estimated));
            }
            (None, true) => (),
            (None, false) => {
                anyhow::bail!("sample at ({}, {}) is estimated without a key", self.x, self.y)
            }
        }
        Ok(sample)
    }
}

#[derive(serde::Deserialize, Clone, PartialEq, Debug)]
pub struct FrameDesc {
    pub contact: u32,
    pub samples: Vec<SampleDesc>,
    #[serde(default)]
    pub predicted: Vec<SampleDesc>,
}
impl FrameDesc {
    pub fn to_frame(&self) -> anyhow::Result<ContactFrame> {
        let samples = self
            .samples
            .iter()
            .map(SampleDesc::to_sample)
            .collect::<anyhow::Result<smallvec::SmallVec<[RawSample; 4]>>>()?;
        let Some(&sample) = samples.last() else {
            anyhow::bail!("event for contact {} has no samples", self.contact);
        };
        let mut frame = ContactFrame::single(sample);
        if samples.len() > 1 {
            frame.coalesced = samples;
        }
        for predicted in &self.predicted {
            frame.predicted.push(predicted.to_sample()?);
        }
        Ok(frame)
    }
}

#[derive(serde::Deserialize, Clone, PartialEq, Debug)]
pub struct UpdateDesc {
    pub contact: u32,
    pub key: u64,
    #[serde(default = "full_force")]
    pub force: f32,
    #[serde(default = "upright")]
    pub altitude: f32,
    #[serde(default)]
    pub azimuth: f32,
    /// Resolved location, if it was estimated.
    pub x: Option<f32>,
    pub y: Option<f32>,
    /// Properties still provisional after this update.
    #[serde(default)]
    pub estimated: Vec<Property>,
    /// Properties for which another update will follow.
    #[serde(default)]
    pub expecting: Vec<Property>,
}
impl UpdateDesc {
    /// `awaited` is what the sample under this key still expects an update for.
    pub fn to_update(&self, awaited: Properties) -> anyhow::Result<EstimationUpdate> {
        let location = match (self.x, self.y) {
            (Some(x), Some(y)) => Vec2::new(x, y),
            (None, None) if !awaited.contains(Properties::LOCATION) => Vec2::zero(),
            _ => anyhow::bail!("estimate for key {} must give both x and y", self.key),
        };
        Ok(EstimationUpdate {
            key: EstimationKey(self.key),
            force: self.force,
            altitude: self.altitude,
            azimuth: self.azimuth,
            location,
            precise_location: location,
            estimated: to_properties(&self.estimated),
            expecting_update: to_properties(&self.expecting),
        })
    }
}

#[derive(serde::Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Began(FrameDesc),
    Moved(FrameDesc),
    Ended(FrameDesc),
    Cancelled { contact: u32 },
    Estimate(UpdateDesc),
    Clear,
}

#[derive(serde::Deserialize, Clone, PartialEq, Debug, Default)]
pub struct Script {
    /// Overrides the pen from user settings.
    pub pen: Option<PenSettings>,
    /// Overrides the canvas from user settings.
    pub canvas: Option<CanvasSettings>,
    /// Stamped onto the canvas before any events.
    pub text: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}
impl Script {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&string)?)
    }
    /// Feed every event to the router, in order.
    pub fn replay(&self, router: &mut StrokeSessionRouter) -> anyhow::Result<()> {
        // Properties each estimation key still awaits.
        let mut awaited = hashbrown::HashMap::<u64, Properties>::new();
        for (idx, event) in self.events.iter().enumerate() {
            match event {
                Event::Began(desc) | Event::Moved(desc) | Event::Ended(desc) => {
                    let frame = desc.to_frame()?;
                    for sample in desc.samples.iter().chain(&desc.predicted) {
                        if let Some(key) = sample.key {
                            awaited.insert(key, to_properties(&sample.estimated));
                        }
                    }
                    let contact = ContactId(desc.contact);
                    match event {
                        Event::Began(_) => router.contact_began(contact, &frame),
                        Event::Moved(_) => router.contact_moved(contact, &frame),
                        _ => router.contact_ended(contact, &frame),
                    }
                }
                Event::Cancelled { contact } => router.contact_cancelled(ContactId(*contact)),
                Event::Estimate(desc) => {
                    let pending = awaited.get(&desc.key).copied().unwrap_or_default();
                    let update = desc.to_update(pending)?;
                    if update.expecting_update.is_empty() {
                        awaited.remove(&desc.key);
                    } else {
                        awaited.insert(desc.key, pending & update.expecting_update);
                    }
                    router.estimated_properties_updated(ContactId(desc.contact), &update);
                }
                Event::Clear => router.clear(),
            }
            log::trace!("replayed event {idx}: {:?}", router.dirty_rect());
        }
        Ok(())
    }
}

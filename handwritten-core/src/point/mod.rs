//! # Sample points
//!
//! One [`SamplePoint`] per input reading. Everything but the reconciliation state is fixed at
//! construction. Some inputs report provisional ("estimated") values for force, tilt, or
//! position, and promise a later [`EstimationUpdate`] sharing the sample's [`EstimationKey`].

pub mod estimation;
pub use estimation::EstimationTracker;

use ultraviolet::Vec2;

bitflags::bitflags! {
    /// How a point came to be, and where it is in its reconciliation lifecycle.
    /// The empty set is [`PointFlags::STANDARD`].
    #[derive(Copy, Clone, Eq, PartialEq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug, Default)]
    #[rustfmt::skip]
    #[repr(transparent)]
    pub struct PointFlags : u8 {
        /// A high-frequency sample batched alongside the main event.
        const COALESCED =    0b0000_0001;
        /// A provisional, forward-looking sample. Always purged at the next event.
        const PREDICTED =    0b0000_0010;
        /// Some properties still await an [`EstimationUpdate`].
        const NEEDS_UPDATE = 0b0000_0100;
        /// Every awaited property has been resolved.
        const UPDATED =      0b0000_1000;
        const CANCELLED =    0b0001_0000;
        /// Originated from a non-stylus source.
        const FINGER =       0b0010_0000;
    }
}
impl PointFlags {
    pub const STANDARD: Self = Self::empty();
}

bitflags::bitflags! {
    /// The sample properties which may be reported provisionally.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug, Default)]
    #[rustfmt::skip]
    #[repr(transparent)]
    pub struct Properties : u8 {
        const FORCE =    0b0001;
        const AZIMUTH =  0b0010;
        const ALTITUDE = 0b0100;
        const LOCATION = 0b1000;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum SourceKind {
    /// Finger, mouse, or any other source without tilt.
    #[default]
    Direct,
    Stylus,
}

/// Correlates a provisional sample with the update that later resolves it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EstimationKey(pub u64);

/// One reading as delivered by the input shell.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RawSample {
    /// Seconds, from an arbitrary epoch.
    pub timestamp: f64,
    /// Display-space location.
    pub location: Vec2,
    /// Sub-pixel location, used for curve math.
    pub precise_location: Vec2,
    /// Normalized pressure. `None` if the source does not report it at all.
    pub force: Option<f32>,
    /// Radians, `π/2` when perpendicular to the surface.
    pub altitude: f32,
    /// Radians, in the surface plane.
    pub azimuth: f32,
    pub source: SourceKind,
    pub estimation_key: Option<EstimationKey>,
    /// Properties whose values are currently provisional.
    pub estimated: Properties,
    /// Properties for which an update is still promised.
    pub expecting_update: Properties,
}
impl RawSample {
    /// A plain, fully resolved finger sample at `location`.
    #[must_use]
    pub fn direct(location: Vec2) -> Self {
        Self {
            timestamp: 0.0,
            location,
            precise_location: location,
            force: Some(0.0),
            altitude: 0.0,
            azimuth: 0.0,
            source: SourceKind::Direct,
            estimation_key: None,
            estimated: Properties::empty(),
            expecting_update: Properties::empty(),
        }
    }
    /// A plain, fully resolved stylus sample at `location`.
    #[must_use]
    pub fn stylus(location: Vec2, force: f32, altitude: f32, azimuth: f32) -> Self {
        Self {
            force: Some(force),
            altitude,
            azimuth,
            source: SourceKind::Stylus,
            ..Self::direct(location)
        }
    }
    /// Mark `properties` as provisional and awaiting an update under `key`.
    #[must_use = "returns a new sample and does not modify `self`"]
    pub fn with_estimates(mut self, key: EstimationKey, properties: Properties) -> Self {
        self.estimation_key = Some(key);
        self.estimated |= properties;
        self.expecting_update |= properties;
        self
    }
}

/// Authoritative values for a previously provisional sample.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct EstimationUpdate {
    pub key: EstimationKey,
    pub force: f32,
    pub altitude: f32,
    pub azimuth: f32,
    pub location: Vec2,
    pub precise_location: Vec2,
    /// Properties that remain provisional after this update.
    pub estimated: Properties,
    /// Properties for which yet another update is promised.
    pub expecting_update: Properties,
}
impl EstimationUpdate {
    /// A final update, resolving every property, carrying the values of `sample`.
    #[must_use]
    pub fn resolving(key: EstimationKey, sample: &RawSample) -> Self {
        Self {
            key,
            force: sample.force.unwrap_or(1.0),
            altitude: sample.altitude,
            azimuth: sample.azimuth,
            location: sample.location,
            precise_location: sample.precise_location,
            estimated: Properties::empty(),
            expecting_update: Properties::empty(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SamplePoint {
    pub sequence_number: u64,
    pub timestamp: f64,
    pub location: Vec2,
    pub precise_location: Vec2,
    pub force: f32,
    /// The source could not report pressure, so `force` was substituted with one.
    pub is_fixed_force: bool,
    pub altitude: f32,
    pub azimuth: f32,
    pub source: SourceKind,
    pub flags: PointFlags,
    pub estimation_key: Option<EstimationKey>,
    pub pending_update: Properties,
    pub still_estimated: Properties,
}
impl SamplePoint {
    #[must_use]
    pub fn new(sample: &RawSample, sequence_number: u64, flags: PointFlags) -> Self {
        let is_stylus = sample.source == SourceKind::Stylus;
        // A non-stylus reporting exactly zero can't sense pressure at all.
        let is_fixed_force = !is_stylus && sample.force == Some(0.0);
        let force = if is_fixed_force {
            1.0
        } else {
            sample.force.unwrap_or(1.0)
        };

        let mut flags = flags;
        let pending_update = sample.expecting_update;
        if !pending_update.is_empty() {
            flags |= PointFlags::NEEDS_UPDATE;
        }

        Self {
            sequence_number,
            timestamp: sample.timestamp,
            location: sample.location,
            precise_location: sample.precise_location,
            force,
            is_fixed_force,
            altitude: sample.altitude,
            azimuth: sample.azimuth,
            source: sample.source,
            flags,
            estimation_key: sample.estimation_key,
            pending_update,
            still_estimated: sample.estimated,
        }
    }
    /// Perceptual pressure, driving stroke width.
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        self.force
    }
    #[must_use]
    pub fn is_stylus(&self) -> bool {
        self.source == SourceKind::Stylus
    }
    #[must_use]
    pub fn awaits_update(&self) -> bool {
        self.estimation_key.is_some() && !self.pending_update.is_empty()
    }
    /// Apply an update carrying this point's key.
    /// Returns `false` without effect if the keys do not match.
    pub fn reconcile(&mut self, update: &EstimationUpdate) -> bool {
        if self.estimation_key != Some(update.key) {
            return false;
        }
        for property in Properties::all().iter() {
            if !self.pending_update.contains(property) {
                continue;
            }
            if property == Properties::FORCE {
                self.force = update.force;
            } else if property == Properties::AZIMUTH {
                self.azimuth = update.azimuth;
            } else if property == Properties::ALTITUDE {
                self.altitude = update.altitude;
            } else if property == Properties::LOCATION {
                self.location = update.location;
                self.precise_location = update.precise_location;
            }
            if !update.estimated.contains(property) {
                self.still_estimated.remove(property);
            }
            if !update.expecting_update.contains(property) {
                self.pending_update.remove(property);
            }
        }
        if self.pending_update.is_empty() {
            self.flags.remove(PointFlags::NEEDS_UPDATE);
            self.flags.insert(PointFlags::UPDATED);
        }
        true
    }
}

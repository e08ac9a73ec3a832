//! # Stroke sessions
//!
//! The router owns every stroke that hasn't been committed yet, keyed by the contact that
//! draws it. Input arrives per contact: sample frames on begin/move/end, cancellation, and
//! asynchronous estimation updates. Strokes whose contact has ended but which still await
//! updates are parked as *pending* until the last update arrives.
//!
//! Everything runs synchronously on the caller's thread. Mutation of the frozen canvas
//! requires `&mut self`, so commits and snapshot export can never interleave.

use crate::canvas::{FrozenCanvas, Snapshot, SnapshotError};
use crate::point::{EstimationUpdate, PointFlags, RawSample};
use crate::rect::{DirtyRect, DirtyRegion};
pub use crate::rect::Redraw;
use crate::stroke::{BatchKind, Stroke, StrokeStyle};
use crate::text::{Faces, TextError};

/// Identifies a contact for as long as it touches the surface. Assigned by the input shell
/// and free to be reused once the contact ends.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ContactId(pub u32);
impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contact #{}", self.0)
    }
}

/// Everything one input event reports for one contact.
#[derive(Clone, Debug)]
pub struct ContactFrame {
    pub sample: RawSample,
    /// Higher-frequency samples since the last event. When non-empty, the last element
    /// is the same reading as `sample`.
    pub coalesced: smallvec::SmallVec<[RawSample; 4]>,
    pub predicted: smallvec::SmallVec<[RawSample; 2]>,
}
impl ContactFrame {
    /// A frame with no coalesced or predicted samples.
    #[must_use]
    pub fn single(sample: RawSample) -> Self {
        Self {
            sample,
            coalesced: smallvec::SmallVec::new(),
            predicted: smallvec::SmallVec::new(),
        }
    }
}

pub struct StrokeSessionRouter {
    canvas: FrozenCanvas,
    style: StrokeStyle,
    /// Strokes whose contact is still down.
    active: hashbrown::HashMap<ContactId, Stroke>,
    /// Strokes whose contact ended while estimates were outstanding.
    pending: hashbrown::HashMap<ContactId, Stroke>,
    dirty: DirtyRegion,
}
impl StrokeSessionRouter {
    #[must_use]
    pub fn new(canvas: FrozenCanvas, style: StrokeStyle) -> Self {
        Self {
            canvas,
            style,
            active: hashbrown::HashMap::new(),
            pending: hashbrown::HashMap::new(),
            dirty: DirtyRegion::default(),
        }
    }
    #[must_use]
    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }
    /// Change the pen for strokes begun from now on.
    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }
    #[must_use]
    pub fn canvas(&self) -> &FrozenCanvas {
        &self.canvas
    }
    #[must_use]
    pub fn active_stroke(&self, contact: ContactId) -> Option<&Stroke> {
        self.active.get(&contact)
    }
    #[must_use]
    pub fn pending_stroke(&self, contact: ContactId) -> Option<&Stroke> {
        self.pending.get(&contact)
    }
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    /// The region invalidated so far, without taking it.
    #[must_use]
    pub fn dirty_rect(&self) -> DirtyRect {
        self.dirty.rect()
    }
    /// Take everything invalidated since the last call.
    pub fn take_redraw(&mut self) -> Redraw {
        self.dirty.take()
    }

    pub fn contact_began(&mut self, contact: ContactId, frame: &ContactFrame) {
        self.route_samples(contact, frame);
    }
    pub fn contact_moved(&mut self, contact: ContactId, frame: &ContactFrame) {
        self.route_samples(contact, frame);
    }
    pub fn contact_ended(&mut self, contact: ContactId, frame: &ContactFrame) {
        self.route_samples(contact, frame);
        self.end_contact(contact, false);
    }
    pub fn contact_cancelled(&mut self, contact: ContactId) {
        self.end_contact(contact, true);
    }

    /// Feed one frame into the contact's stroke, starting a stroke if there is none.
    pub fn route_samples(&mut self, contact: ContactId, frame: &ContactFrame) {
        let style = self.style;
        let stroke = self
            .active
            .entry(contact)
            .or_insert_with(|| Stroke::new(style));

        // Predictions from the previous event are stale now.
        let mut rect = stroke.remove_points_with_type(PointFlags::PREDICTED);
        if frame.coalesced.is_empty() {
            rect.union_assign(stroke.append_batch(
                BatchKind::Standard,
                std::slice::from_ref(&frame.sample),
            ));
        } else {
            rect.union_assign(stroke.append_batch(BatchKind::Coalesced, &frame.coalesced));
        }
        rect.union_assign(stroke.append_batch(BatchKind::Predicted, &frame.predicted));
        self.dirty.invalidate(rect);
    }
    /// The contact lifted or was cancelled. Unknown contacts are ignored.
    pub fn end_contact(&mut self, contact: ContactId, cancel: bool) {
        let Some(mut stroke) = self.active.remove(&contact) else {
            log::trace!("end of unknown {contact}");
            return;
        };
        if cancel {
            self.dirty.invalidate(stroke.cancel());
        } else {
            // Never commit guesses.
            self.dirty
                .invalidate(stroke.remove_points_with_type(PointFlags::PREDICTED));
        }
        if stroke.is_complete() {
            self.commit(stroke);
        } else {
            log::trace!(
                "{contact} ended with {} points awaiting updates",
                stroke.pending_len()
            );
            if let Some(displaced) = self.pending.insert(contact, stroke) {
                // Id reused before the old stroke settled. Keep what it has.
                self.force_commit(displaced);
            }
        }
    }
    /// End every contact still down, as if each had lifted.
    pub fn end_all(&mut self) {
        let contacts: Vec<ContactId> = self.active.keys().copied().collect();
        for contact in contacts {
            self.end_contact(contact, false);
        }
    }
    /// Resolve provisional properties for the contact's stroke, active first, else pending.
    pub fn estimated_properties_updated(&mut self, contact: ContactId, update: &EstimationUpdate) {
        if let Some(stroke) = self
            .active
            .get_mut(&contact)
            .filter(|stroke| stroke.is_tracking(update.key))
        {
            let (changed, rect) = stroke.reconcile_touch(update);
            if changed {
                self.dirty.invalidate(rect);
            }
            return;
        }
        let Some(stroke) = self.pending.get_mut(&contact) else {
            log::trace!("estimation update for unknown {contact}");
            return;
        };
        let (changed, rect) = stroke.reconcile_touch(update);
        if changed {
            self.dirty.invalidate(rect);
        }
        if stroke.is_complete() {
            if let Some(stroke) = self.pending.remove(&contact) {
                self.commit(stroke);
            }
        }
    }
    /// Commit every pending stroke as-is, giving up on outstanding estimates.
    pub fn flush_pending(&mut self) {
        let pending: Vec<Stroke> = self.pending.drain().map(|(_, stroke)| stroke).collect();
        for stroke in pending {
            self.force_commit(stroke);
        }
    }
    /// Discard the canvas and every uncommitted stroke.
    pub fn clear(&mut self) {
        self.canvas.clear();
        self.active.clear();
        self.pending.clear();
        self.dirty.invalidate_all();
    }
    /// Stamp text into the canvas, see [`crate::text`].
    pub fn stamp_text(&mut self, text: &str, faces: &Faces) -> Result<(), TextError> {
        crate::text::stamp_text(&mut self.canvas, text, faces)?;
        self.dirty.invalidate_all();
        Ok(())
    }
    /// Export the committed drawing, ignoring live strokes. `None` if nothing was committed.
    pub fn snapshot(&self, width: u32, height: u32) -> Option<Result<Snapshot, SnapshotError>> {
        self.canvas.snapshot(width, height)
    }
    /// Export the committed drawing, even if empty.
    pub fn snapshot_always(&self, width: u32, height: u32) -> Result<Snapshot, SnapshotError> {
        self.canvas.snapshot_always(width, height)
    }
    /// Repaint the whole scene into `target` (device space): frozen canvas, then live strokes.
    pub fn draw(&self, target: &mut tiny_skia::PixmapMut) {
        let transform = self.canvas.transform();
        self.canvas.draw_into(target);
        for stroke in self.active.values().chain(self.pending.values()) {
            stroke.draw_live(target, transform);
        }
    }

    /// Move the stroke into the frozen canvas. The pixels don't move, so the region they
    /// cover has already been reported by the appends and reconciliations that made them.
    fn commit(&mut self, mut stroke: Stroke) {
        let _ = stroke.finalize();
        self.canvas.composite(&stroke);
    }
    fn force_commit(&mut self, mut stroke: Stroke) {
        stroke.abandon_estimates();
        self.commit(stroke);
    }
}

#[cfg(test)]
mod test {
    use super::{ContactFrame, ContactId, StrokeSessionRouter};
    use crate::canvas::FrozenCanvas;
    use crate::color::Color;
    use crate::point::{EstimationKey, EstimationUpdate, PointFlags, Properties, RawSample};
    use crate::rect::{DirtyRect, Redraw};
    use crate::stroke::StrokeStyle;
    use ultraviolet::Vec2;

    fn router() -> StrokeSessionRouter {
        let canvas = FrozenCanvas::new(200.0, 200.0, 1.0).unwrap();
        let style = StrokeStyle::new(Color::BLACK, 6.0, true, false).unwrap();
        StrokeSessionRouter::new(canvas, style)
    }
    fn stylus(x: f32, y: f32) -> RawSample {
        RawSample::stylus(Vec2::new(x, y), 0.5, 0.5, 0.0)
    }
    fn frame(sample: RawSample) -> ContactFrame {
        ContactFrame::single(sample)
    }
    /// The event's sample, as the last of its coalesced batch.
    fn coalesced(samples: &[RawSample]) -> ContactFrame {
        ContactFrame {
            sample: *samples.last().unwrap(),
            coalesced: samples.iter().copied().collect(),
            predicted: smallvec::SmallVec::new(),
        }
    }

    #[test]
    fn begin_creates_stroke() {
        let mut router = router();
        let contact = ContactId(1);
        router.contact_began(contact, &frame(stylus(10.0, 10.0)));
        let stroke = router.active_stroke(contact).unwrap();
        assert_eq!(stroke.live_points().len(), 1);
        assert_eq!(stroke.live_points()[0].flags, PointFlags::STANDARD);
        assert!(matches!(router.take_redraw(), Redraw::Region(_)));
    }
    #[test]
    fn coalesced_frames() {
        let mut router = router();
        let contact = ContactId(1);
        router.contact_began(
            contact,
            &coalesced(&[stylus(0.0, 0.0), stylus(1.0, 0.0), stylus(2.0, 0.0)]),
        );
        let flags: Vec<PointFlags> = router
            .active_stroke(contact)
            .unwrap()
            .live_points()
            .iter()
            .map(|p| p.flags)
            .collect();
        assert_eq!(
            flags,
            [
                PointFlags::COALESCED,
                PointFlags::COALESCED,
                PointFlags::STANDARD
            ]
        );
    }
    #[test]
    fn predictions_replaced_each_event() {
        let mut router = router();
        let contact = ContactId(3);
        let mut first = frame(stylus(20.0, 100.0));
        first.predicted.push(stylus(60.0, 100.0));
        first.predicted.push(stylus(100.0, 100.0));
        router.contact_began(contact, &first);
        assert_eq!(router.active_stroke(contact).unwrap().live_points().len(), 3);

        let mut second = frame(stylus(40.0, 100.0));
        second.predicted.push(stylus(80.0, 100.0));
        router.contact_moved(contact, &second);
        let xs: Vec<f32> = router
            .active_stroke(contact)
            .unwrap()
            .live_points()
            .iter()
            .map(|p| p.location.x)
            .collect();
        assert_eq!(xs, [20.0, 40.0, 80.0]);

        // Predictions riding on the final event are not committed.
        let mut last = frame(stylus(60.0, 100.0));
        last.predicted.push(stylus(180.0, 100.0));
        router.contact_ended(contact, &last);
        assert!(router.active_stroke(contact).is_none());

        let snapshot = router.snapshot(200, 200).unwrap().unwrap();
        assert_eq!(snapshot.pixel(50, 100), Some([0, 0, 0, 255]));
        assert_eq!(snapshot.pixel(150, 100), Some([255, 255, 255, 255]));
    }
    #[test]
    fn complete_stroke_commits_on_end() {
        let mut router = router();
        let contact = ContactId(2);
        router.contact_began(contact, &frame(stylus(20.0, 100.0)));
        router.contact_moved(contact, &frame(stylus(100.0, 100.0)));
        router.contact_ended(contact, &frame(stylus(180.0, 100.0)));
        assert_eq!(router.active_len(), 0);
        assert_eq!(router.pending_len(), 0);

        let snapshot = router.snapshot(200, 200).unwrap().unwrap();
        assert_eq!(snapshot.pixel(100, 100), Some([0, 0, 0, 255]));
        assert_eq!(snapshot.pixel(100, 10), Some([255, 255, 255, 255]));
    }
    #[test]
    fn estimation_scenario() {
        let mut router = router();
        let contact = ContactId(7);
        let key = EstimationKey(99);
        let mut expected = DirtyRect::NULL;

        router.contact_began(contact, &frame(stylus(10.0, 10.0)));
        router.contact_moved(contact, &frame(stylus(20.0, 10.0)));
        let pending = stylus(30.0, 10.0).with_estimates(key, Properties::FORCE);
        router.contact_moved(contact, &frame(pending));
        router.contact_moved(contact, &frame(stylus(40.0, 10.0)));
        {
            let stroke = router.active_stroke(contact).unwrap();
            assert!(!stroke.is_complete());
            assert!(stroke.live_points()[2].flags.contains(PointFlags::NEEDS_UPDATE));
            expected.union_assign(stroke.live_bounds());
        }

        let mut update = EstimationUpdate::resolving(key, &pending);
        update.force = 0.75;
        router.estimated_properties_updated(contact, &update);
        {
            let stroke = router.active_stroke(contact).unwrap();
            assert!(stroke.is_complete());
            assert_eq!(stroke.live_points()[2].force, 0.75);
            expected.union_assign(stroke.live_bounds());
        }
        assert_eq!(router.dirty_rect(), expected);

        router.end_contact(contact, false);
        assert!(router.active_stroke(contact).is_none());
        assert_eq!(router.pending_len(), 0);
        // Committing reports nothing new.
        assert_eq!(router.dirty_rect(), expected);
        assert_eq!(
            router.take_redraw(),
            expected.bounds().map_or(Redraw::Nothing, Redraw::Region)
        );
    }
    #[test]
    fn redraw_is_union_of_append_and_reconcile() {
        // Thin enough that a resolved force widens the halo beyond the pen width.
        let style = StrokeStyle::new(Color::BLACK, 0.25, true, false).unwrap();
        let canvas = FrozenCanvas::new(200.0, 200.0, 1.0).unwrap();
        let mut router = StrokeSessionRouter::new(canvas, style);
        let mut shadow = crate::stroke::Stroke::new(style);
        let mut expected = DirtyRect::NULL;

        let contact = ContactId(9);
        let key = EstimationKey(5);
        let pending =
            stylus(30.0, 10.0).with_estimates(key, Properties::FORCE | Properties::LOCATION);
        let samples = [stylus(10.0, 10.0), stylus(20.0, 10.0), pending, stylus(40.0, 10.0)];
        for (idx, sample) in samples.iter().enumerate() {
            if idx == 0 {
                router.contact_began(contact, &frame(*sample));
            } else {
                router.contact_moved(contact, &frame(*sample));
            }
            expected.union_assign(shadow.append_batch(
                crate::stroke::BatchKind::Standard,
                std::slice::from_ref(sample),
            ));
        }

        let mut update = EstimationUpdate::resolving(key, &pending);
        update.force = 1.0;
        update.location = Vec2::new(30.0, 60.0);
        update.precise_location = update.location;
        router.estimated_properties_updated(contact, &update);
        let (changed, rect) = shadow.reconcile_touch(&update);
        assert!(changed);
        expected.union_assign(rect);

        // The recomputed stroke bounds reach further than anything reported.
        let live = router.active_stroke(contact).unwrap().live_bounds();
        assert!(!expected.contains_rect(&live));

        router.end_contact(contact, false);
        assert!(router.canvas().is_touched());
        assert_eq!(router.dirty_rect(), expected);
    }
    #[test]
    fn pending_until_last_update() {
        let mut router = router();
        let contact = ContactId(4);
        let key = EstimationKey(1);
        let pending = stylus(50.0, 50.0).with_estimates(key, Properties::LOCATION);
        router.contact_began(contact, &frame(stylus(10.0, 50.0)));
        router.contact_ended(contact, &frame(pending));

        assert!(router.active_stroke(contact).is_none());
        assert_eq!(
            router.pending_stroke(contact).unwrap().live_points().len(),
            2
        );
        assert!(!router.canvas().is_touched());

        // The contact id gets reused by a new touch before the update shows up.
        router.contact_began(contact, &frame(stylus(100.0, 100.0)));

        let mut update = EstimationUpdate::resolving(key, &pending);
        update.location = Vec2::new(60.0, 50.0);
        update.precise_location = update.location;
        router.estimated_properties_updated(contact, &update);

        assert!(router.pending_stroke(contact).is_none());
        assert!(router.canvas().is_touched());
        // The new touch was left alone.
        assert_eq!(router.active_stroke(contact).unwrap().live_points().len(), 1);
    }
    #[test]
    fn cancel_commits_immediately() {
        let mut router = router();
        let contact = ContactId(5);
        router.contact_began(contact, &frame(stylus(10.0, 10.0)));
        router.contact_moved(
            contact,
            &frame(stylus(90.0, 90.0).with_estimates(EstimationKey(3), Properties::FORCE)),
        );
        router.contact_cancelled(contact);
        assert_eq!(router.active_len(), 0);
        assert_eq!(router.pending_len(), 0);
        assert!(router.canvas().is_touched());
    }
    #[test]
    fn unknown_contacts_ignored() {
        let mut router = router();
        router.contact_cancelled(ContactId(40));
        router.end_contact(ContactId(41), false);
        let update = EstimationUpdate::resolving(EstimationKey(0), &stylus(0.0, 0.0));
        router.estimated_properties_updated(ContactId(42), &update);
        assert_eq!(router.take_redraw(), Redraw::Nothing);
        assert!(!router.canvas().is_touched());
    }
    #[test]
    fn end_all_lifts_every_contact() {
        let mut router = router();
        router.contact_began(ContactId(1), &frame(stylus(10.0, 10.0)));
        router.contact_began(
            ContactId(2),
            &frame(stylus(50.0, 50.0).with_estimates(EstimationKey(2), Properties::FORCE)),
        );
        router.end_all();
        assert_eq!(router.active_len(), 0);
        assert_eq!(router.pending_len(), 1);
        assert!(router.pending_stroke(ContactId(2)).is_some());
    }
    #[test]
    fn flush_commits_pending() {
        let mut router = router();
        let contact = ContactId(6);
        router.contact_began(contact, &frame(stylus(10.0, 10.0)));
        router.contact_ended(
            contact,
            &frame(stylus(50.0, 10.0).with_estimates(EstimationKey(8), Properties::AZIMUTH)),
        );
        assert_eq!(router.pending_len(), 1);
        router.flush_pending();
        assert_eq!(router.pending_len(), 0);
        assert!(router.canvas().is_touched());
    }
    #[test]
    fn clear_discards_everything() {
        let mut router = router();
        router.contact_began(ContactId(1), &frame(stylus(10.0, 10.0)));
        router.contact_ended(ContactId(2), &frame(stylus(10.0, 10.0)));
        let _ = router.take_redraw();

        router.clear();
        assert_eq!(router.active_len(), 0);
        assert_eq!(router.pending_len(), 0);
        assert!(router.snapshot(128, 128).is_none());
        assert_eq!(router.take_redraw(), Redraw::Full);
    }
    #[test]
    fn style_applies_to_new_strokes() {
        let mut router = router();
        router.contact_began(ContactId(1), &frame(stylus(10.0, 10.0)));
        let wide = StrokeStyle::new(Color::BLACK, 20.0, false, false).unwrap();
        router.set_style(wide);
        router.contact_began(ContactId(2), &frame(stylus(10.0, 10.0)));
        assert_eq!(router.active_stroke(ContactId(1)).unwrap().style().width(), 6.0);
        assert_eq!(router.active_stroke(ContactId(2)).unwrap().style().width(), 20.0);
    }
    #[test]
    fn draw_shows_live_over_frozen() {
        let mut router = router();
        router.contact_began(ContactId(1), &frame(stylus(20.0, 100.0)));
        router.contact_moved(ContactId(1), &frame(stylus(180.0, 100.0)));
        let mut target = tiny_skia::Pixmap::new(200, 200).unwrap();
        router.draw(&mut target.as_mut());
        assert!(target.pixel(100, 100).unwrap().alpha() > 200);
        // Still live, so not in the snapshot.
        assert!(router.snapshot(200, 200).is_none());
    }
}

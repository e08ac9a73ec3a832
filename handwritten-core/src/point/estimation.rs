//! Tracks which live points of a stroke still await an estimation update.

use super::{EstimationKey, SamplePoint};

/// Maps estimation keys to the sequence number of the live point they belong to.
///
/// Points are referred to by sequence number rather than by reference, as the owning
/// stroke is free to move its point buffer around.
#[derive(Clone, Debug, Default)]
pub struct EstimationTracker {
    pending: hashbrown::HashMap<EstimationKey, u64>,
}
impl EstimationTracker {
    /// Start tracking `point`, if it awaits any update. Returns whether it was tracked.
    pub fn track(&mut self, point: &SamplePoint) -> bool {
        match point.estimation_key {
            Some(key) if point.awaits_update() => {
                self.pending.insert(key, point.sequence_number);
                true
            }
            _ => false,
        }
    }
    #[must_use]
    pub fn get(&self, key: EstimationKey) -> Option<u64> {
        self.pending.get(&key).copied()
    }
    pub fn forget(&mut self, key: EstimationKey) -> Option<u64> {
        self.pending.remove(&key)
    }
    pub fn clear(&mut self) {
        self.pending.clear();
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod test {
    use super::EstimationTracker;
    use crate::point::{EstimationKey, PointFlags, Properties, RawSample, SamplePoint};
    use ultraviolet::Vec2;

    #[test]
    fn tracks_only_pending() {
        let mut tracker = EstimationTracker::default();
        let plain = SamplePoint::new(&RawSample::direct(Vec2::zero()), 0, PointFlags::STANDARD);
        assert!(!tracker.track(&plain));
        assert!(tracker.is_empty());

        let sample = RawSample::stylus(Vec2::zero(), 0.5, 1.0, 0.0)
            .with_estimates(EstimationKey(11), Properties::ALTITUDE);
        let pending = SamplePoint::new(&sample, 1, PointFlags::STANDARD);
        assert!(tracker.track(&pending));
        assert_eq!(tracker.get(EstimationKey(11)), Some(1));
        assert_eq!(tracker.len(), 1);

        assert_eq!(tracker.forget(EstimationKey(11)), Some(1));
        assert!(tracker.is_empty());
        assert_eq!(tracker.forget(EstimationKey(11)), None);
    }
    #[test]
    fn key_without_expectation_is_ignored() {
        let mut tracker = EstimationTracker::default();
        let mut sample = RawSample::stylus(Vec2::zero(), 0.5, 1.0, 0.0);
        sample.estimation_key = Some(EstimationKey(3));
        let point = SamplePoint::new(&sample, 0, PointFlags::STANDARD);
        assert!(!tracker.track(&point));
    }
}

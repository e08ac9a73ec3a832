//! Classification of the sample batches which accompany each input event.

use crate::point::{PointFlags, RawSample, SourceKind};
use crate::rect::DirtyRect;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BatchKind {
    /// A single authoritative sample.
    Standard,
    /// High-frequency samples. The last one is the event's own sample.
    Coalesced,
    /// Provisional look-ahead samples.
    Predicted,
}
impl BatchKind {
    #[must_use]
    pub fn base_flags(self) -> PointFlags {
        match self {
            Self::Standard => PointFlags::STANDARD,
            Self::Coalesced => PointFlags::COALESCED,
            Self::Predicted => PointFlags::PREDICTED,
        }
    }
}

/// Pair every sample in the batch with the flags it should be appended with.
pub fn classify(
    kind: BatchKind,
    samples: &[RawSample],
) -> impl ExactSizeIterator<Item = (PointFlags, &RawSample)> + '_ {
    let last = samples.len().saturating_sub(1);
    samples.iter().enumerate().map(move |(idx, sample)| {
        let mut flags = kind.base_flags();
        if sample.source != SourceKind::Stylus {
            flags |= PointFlags::FINGER;
        }
        if !sample.expecting_update.is_empty() {
            flags |= PointFlags::NEEDS_UPDATE;
        }
        if kind == BatchKind::Coalesced && idx == last {
            flags.remove(PointFlags::COALESCED);
        }
        (flags, sample)
    })
}

impl super::Stroke {
    /// Classify and append a whole batch, returning the union of every appended point's region.
    pub fn append_batch(&mut self, kind: BatchKind, samples: &[RawSample]) -> DirtyRect {
        classify(kind, samples)
            .map(|(flags, sample)| self.append(sample, flags))
            .collect()
    }
}

/// Start recorded for a segment whose first block has not been seen yet.
pub const UNRESOLVED_START: u32 = u32::MAX;

/// Lowest block number known to begin each output segment.
///
/// Segment 0 implicitly starts at block 1. A segment switch marks its index
/// pending; the next block observed becomes a candidate start for it.
/// Later segments are assumed to cover higher block numbers than earlier
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMap {
    starts: Vec<u32>,
    pending: Option<usize>,
}

impl Default for SegmentMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentMap {
    pub fn new() -> Self {
        Self {
            starts: vec![1],
            pending: None,
        }
    }

    /// A switch to `segment` was seen in the source stream.
    pub fn record_switch(&mut self, segment: usize) {
        if self.starts.len() <= segment {
            self.starts.resize(segment + 1, UNRESOLVED_START);
        }
        self.pending = Some(segment);
    }

    /// A block was seen; it may lower the start of a pending segment.
    pub fn observe_block(&mut self, number: u32) {
        if let Some(segment) = self.pending.take() {
            let start = &mut self.starts[segment];
            if number < *start {
                *start = number;
            }
        }
    }

    /// Greatest segment whose start is at or below `number`. Blocks below
    /// every recorded start belong to segment 0.
    pub fn resolve(&self, number: u32) -> usize {
        self.starts
            .iter()
            .rposition(|&start| start <= number)
            .unwrap_or(0)
    }

    pub fn starts(&self) -> &[u32] {
        &self.starts
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_observed_starts() {
        let mut map = SegmentMap::new();
        map.record_switch(0);
        map.observe_block(1);
        map.record_switch(1);
        map.observe_block(500);

        assert_eq!(map.resolve(250), 0);
        assert_eq!(map.resolve(499), 0);
        assert_eq!(map.resolve(500), 1);
        assert_eq!(map.resolve(10_000), 1);
    }

    #[test]
    fn switch_pads_with_unresolved_starts() {
        let mut map = SegmentMap::new();
        map.record_switch(3);
        assert_eq!(map.starts(), &[1, UNRESOLVED_START, UNRESOLVED_START, UNRESOLVED_START]);
        assert!(map.is_pending());

        map.observe_block(900);
        assert_eq!(map.starts()[3], 900);
        assert!(!map.is_pending());
        assert_eq!(map.resolve(899), 0);
        assert_eq!(map.resolve(900), 3);
    }

    #[test]
    fn only_first_block_after_switch_counts() {
        let mut map = SegmentMap::new();
        map.record_switch(1);
        map.observe_block(300);
        map.observe_block(200);
        assert_eq!(map.starts(), &[1, 300]);
    }

    #[test]
    fn repeated_switch_lowers_start() {
        let mut map = SegmentMap::new();
        map.record_switch(1);
        map.observe_block(300);
        map.record_switch(1);
        map.observe_block(250);
        map.record_switch(1);
        map.observe_block(400);
        assert_eq!(map.starts(), &[1, 250]);
    }

    #[test]
    fn blocks_below_every_start_fall_into_first_segment() {
        let map = SegmentMap::new();
        assert_eq!(map.resolve(0), 0);
        assert_eq!(map.len(), 1);
    }
}

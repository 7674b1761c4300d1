use crate::state::StateCategory;

/// Counters accumulated over the device's lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceStats {
    /// Commits that had at least one dirty category.
    pub commits: u64,
    /// Successful applies per category, indexed by [`StateCategory::index`].
    pub applies: [u64; 8],
    pub draws: u64,
    pub immediate_draws: u64,
    pub compactions: u64,
    /// Bytes moved by compaction copies.
    pub bytes_relocated: u64,
    pub deletions_drained: u64,
    pub frames_presented: u64,
}

impl DeviceStats {
    pub fn applies_of(&self, category: StateCategory) -> u64 {
        self.applies[category.index()]
    }

    pub fn total_applies(&self) -> u64 {
        self.applies.iter().sum()
    }
}

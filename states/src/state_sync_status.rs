/// Per-slot freshness marker used by the sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateSyncStatus {
    /// Registered but never synced; derived computes in this status run on
    /// the next sync even when no dependency is dirty.
    #[default]
    BeforeInit,
    /// A recompute is in flight during the current sync pass.
    Pending,
    /// Mutated since the last sync.
    Dirty,
    /// Up to date.
    Clean,
}

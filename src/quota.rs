//! Copies/quota reconciliation.
//!
//! The single canonical computation for "copies used vs. package quota",
//! queried continuously during editing (progress display, limit messaging)
//! and used to gate saves. Every caller goes through this module — editors
//! never re-derive the projected total from their own working state.

// ============================================================================
// QuotaStatus
// ============================================================================

/// Snapshot of a collection's allocation against the package quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    /// Copies allocated across the collection.
    pub used: u32,
    /// Copies the package entitles the customer to.
    pub quota: u32,
}

impl QuotaStatus {
    pub fn new(used: u32, quota: u32) -> Self {
        Self { used, quota }
    }

    /// Copies still available; zero when at or over the limit.
    pub fn remaining(&self) -> u32 {
        self.quota.saturating_sub(self.used)
    }

    /// True once the package is fully allocated.
    pub fn is_complete(&self) -> bool {
        self.used >= self.quota
    }

    /// True when allocation exceeds the quota — possible after a package was
    /// retroactively shrunk. Surfaced to the caller, never auto-corrected;
    /// saves stay blocked until the user reduces allocation.
    pub fn is_over_limit(&self) -> bool {
        self.used > self.quota
    }
}

// ============================================================================
// Computations
// ============================================================================

/// Total copies allocated across a collection of saved items.
///
/// Calendars pass their single shared value once, not twelve times.
pub fn used_copies<I>(copies: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    copies.into_iter().sum()
}

/// Projected total if an in-progress, not-yet-saved edit were committed:
/// the current total minus the item being replaced (when editing an existing
/// one) plus the pending working-slot allocation.
pub fn projected(used: u32, replaced: Option<u32>, pending: u32) -> u32 {
    used.saturating_sub(replaced.unwrap_or(0)) + pending
}

// ============================================================================
// Tests
// ============================================================================

use reserva_core::{DomainResult, ResourceId};
use reserva_inventory::LedgerEntry;

/// Read access to ledger entries.
///
/// Implemented by the store itself (non-blocking, possibly stale reads for
/// display) and by open transactions (reads that include staged writes).
pub trait LedgerRead {
    fn entries_for(&self, resource: ResourceId) -> DomainResult<Vec<LedgerEntry>>;
}

/// A unit of work holding locks on a fixed set of resources.
///
/// Nothing becomes visible to other readers until `commit`. Dropping a
/// transaction without committing discards its writes and releases its locks.
pub trait LedgerTransaction: LedgerRead {
    /// Resources this transaction holds locks on.
    fn scope(&self) -> &[ResourceId];

    /// Stage an entry. Fails when the entry's resource is outside the scope.
    fn append(&mut self, entry: LedgerEntry) -> DomainResult<()>;

    /// Flip PENDING claims on `resource` matching `matches` to COMPLETED.
    ///
    /// Returns how many entries changed; claims already completed are skipped.
    fn complete_claims(
        &mut self,
        resource: ResourceId,
        matches: &dyn Fn(&LedgerEntry) -> bool,
    ) -> DomainResult<usize>;

    fn commit(self) -> DomainResult<()>;

    fn rollback(self);
}

/// Transactional persistence boundary for the stock ledger.
///
/// `begin` acquires resource-scoped locks for the whole scope at once, so the
/// check-then-act sequence of a claim (read capacity, read claims, compare,
/// write) cannot interleave with another claim on the same resources.
pub trait LedgerStore: LedgerRead + Send + Sync {
    type Tx<'a>: LedgerTransaction
    where
        Self: 'a;

    fn begin(&self, scope: &[ResourceId]) -> DomainResult<Self::Tx<'_>>;

    /// Resources carrying at least one PENDING claim that matches `matches`.
    fn resources_with_pending_claims(
        &self,
        matches: &dyn Fn(&LedgerEntry) -> bool,
    ) -> DomainResult<Vec<ResourceId>>;
}

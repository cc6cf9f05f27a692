use std::collections::HashSet;
use std::sync::{Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use reserva_core::{DomainError, DomainResult, EntryId, ResourceId};
use reserva_inventory::{EntryStatus, LedgerEntry};

use super::r#trait::{LedgerRead, LedgerStore, LedgerTransaction};

/// In-memory append-only stock ledger with resource-scoped locks.
///
/// Intended for tests/dev and single-process deployments. Locks are taken for
/// a whole scope at once (all or none), so two transactions can never
/// deadlock waiting on each other's resources.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    entries: RwLock<Vec<LedgerEntry>>,
    held: Mutex<HashSet<ResourceId>>,
    released: Condvar,
    lock_timeout: Duration,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            lock_timeout,
        }
    }

    /// Total number of entries ever appended.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, scope: &[ResourceId]) -> DomainResult<()> {
        let deadline = Instant::now() + self.lock_timeout;
        let mut held = self
            .held
            .lock()
            .map_err(|_| DomainError::conflict("ledger lock table poisoned"))?;

        while scope.iter().any(|r| held.contains(r)) {
            let now = Instant::now();
            if now >= deadline {
                warn!(resources = scope.len(), "timed out waiting for ledger locks");
                return Err(DomainError::conflict("timed out waiting for resource locks"));
            }
            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| DomainError::conflict("ledger lock table poisoned"))?;
            held = guard;
        }

        held.extend(scope.iter().copied());
        Ok(())
    }

    fn release_locks(&self, scope: &[ResourceId]) {
        match self.held.lock() {
            Ok(mut held) => {
                for r in scope {
                    held.remove(r);
                }
            }
            Err(poisoned) => {
                let mut held = poisoned.into_inner();
                for r in scope {
                    held.remove(r);
                }
            }
        }
        self.released.notify_all();
    }
}

impl LedgerRead for InMemoryLedgerStore {
    fn entries_for(&self, resource: ResourceId) -> DomainResult<Vec<LedgerEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| DomainError::conflict("ledger poisoned"))?;
        Ok(entries
            .iter()
            .filter(|e| e.resource == resource)
            .cloned()
            .collect())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    type Tx<'a> = InMemoryLedgerTx<'a>;

    fn begin(&self, scope: &[ResourceId]) -> DomainResult<Self::Tx<'_>> {
        let mut scope = scope.to_vec();
        scope.sort();
        scope.dedup();
        self.acquire(&scope)?;
        debug!(resources = scope.len(), "ledger transaction started");
        Ok(InMemoryLedgerTx {
            store: self,
            scope,
            staged: Vec::new(),
            completed: HashSet::new(),
        })
    }

    fn resources_with_pending_claims(
        &self,
        matches: &dyn Fn(&LedgerEntry) -> bool,
    ) -> DomainResult<Vec<ResourceId>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| DomainError::conflict("ledger poisoned"))?;
        let mut resources: Vec<ResourceId> = entries
            .iter()
            .filter(|e| e.is_pending_claim() && matches(e))
            .map(|e| e.resource)
            .collect();
        resources.sort();
        resources.dedup();
        Ok(resources)
    }
}

/// Open transaction on an [`InMemoryLedgerStore`].
#[derive(Debug)]
pub struct InMemoryLedgerTx<'a> {
    store: &'a InMemoryLedgerStore,
    scope: Vec<ResourceId>,
    staged: Vec<LedgerEntry>,
    completed: HashSet<EntryId>,
}

impl InMemoryLedgerTx<'_> {
    fn ensure_in_scope(&self, resource: ResourceId) -> DomainResult<()> {
        if self.scope.binary_search(&resource).is_err() {
            return Err(DomainError::invariant(format!(
                "resource {resource} is outside the transaction scope"
            )));
        }
        Ok(())
    }
}

impl LedgerRead for InMemoryLedgerTx<'_> {
    fn entries_for(&self, resource: ResourceId) -> DomainResult<Vec<LedgerEntry>> {
        let mut entries = self.store.entries_for(resource)?;
        for e in entries.iter_mut() {
            if self.completed.contains(&e.id) {
                e.status = EntryStatus::Completed;
            }
        }
        entries.extend(self.staged.iter().filter(|e| e.resource == resource).cloned());
        Ok(entries)
    }
}

impl LedgerTransaction for InMemoryLedgerTx<'_> {
    fn scope(&self) -> &[ResourceId] {
        &self.scope
    }

    fn append(&mut self, entry: LedgerEntry) -> DomainResult<()> {
        self.ensure_in_scope(entry.resource)?;
        self.staged.push(entry);
        Ok(())
    }

    fn complete_claims(
        &mut self,
        resource: ResourceId,
        matches: &dyn Fn(&LedgerEntry) -> bool,
    ) -> DomainResult<usize> {
        self.ensure_in_scope(resource)?;
        let mut count = 0;

        for e in self
            .staged
            .iter_mut()
            .filter(|e| e.resource == resource && e.is_pending_claim())
        {
            if matches(e) {
                e.status = EntryStatus::Completed;
                count += 1;
            }
        }

        let committed = self.store.entries_for(resource)?;
        for e in committed.iter().filter(|e| e.is_pending_claim() && matches(e)) {
            if self.completed.insert(e.id) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn commit(mut self) -> DomainResult<()> {
        let staged = std::mem::take(&mut self.staged);
        let completed = std::mem::take(&mut self.completed);
        let mut entries = self
            .store
            .entries
            .write()
            .map_err(|_| DomainError::conflict("ledger poisoned"))?;

        if !completed.is_empty() {
            for e in entries.iter_mut().filter(|e| completed.contains(&e.id)) {
                e.status = EntryStatus::Completed;
            }
        }
        debug!(
            appended = staged.len(),
            completed = completed.len(),
            "ledger transaction committed"
        );
        entries.extend(staged);
        Ok(())
    }

    fn rollback(self) {
        debug!(discarded = self.staged.len(), "ledger transaction rolled back");
    }
}

impl Drop for InMemoryLedgerTx<'_> {
    fn drop(&mut self) {
        self.store.release_locks(&self.scope);
    }
}

//! Optimistic mutations with snapshot rollback.
//!
//! A mutation runs in two phases. [`OptimisticSyncClient::begin`] claims the
//! record, snapshots it and computes the speculative state locally; rule
//! violations fail here without touching the store. The caller shows the
//! speculative record right away, then [`OptimisticSyncClient::complete`]
//! sends the wire request and either commits or hands back the snapshot.
//!
//! At most one mutation per NUP is in flight. The claim is released when the
//! [`PendingMutation`] is completed or dropped.

use crate::error::{CoreError, StoreError};
use crate::model::{Principal, ProcessRecord, Status, StatusTransition};
use crate::registry::AssignmentRegistry;
use crate::store::{CollaboratorUpdateRequest, RecordStore, StatusUpdateRequest};
use crate::workflow::StatusWorkflow;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// What the user asked to change on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ChangeStatus(Status),
    /// Empty name clears the assignment.
    Assign(String),
}

impl Operation {
    const fn kind(&self) -> &'static str {
        match self {
            Self::ChangeStatus(_) => "status",
            Self::Assign(_) => "assign",
        }
    }
}

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Claim on one NUP; released on drop.
#[derive(Debug)]
struct InFlightGuard {
    nup: String,
    set: InFlightSet,
}

impl InFlightGuard {
    fn acquire(set: &InFlightSet, nup: &str) -> Result<Self, CoreError> {
        let mut held = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(nup.to_string()) {
            return Err(CoreError::MutationInFlight {
                nup: nup.to_string(),
            });
        }
        Ok(Self {
            nup: nup.to_string(),
            set: Arc::clone(set),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.nup);
    }
}

#[derive(Debug, Clone)]
enum WireRequest {
    Status(StatusUpdateRequest),
    Collaborator(CollaboratorUpdateRequest),
}

/// A mutation applied locally but not yet confirmed by the store.
#[derive(Debug)]
pub struct PendingMutation {
    guard: InFlightGuard,
    request: WireRequest,
    snapshot: ProcessRecord,
    speculative: ProcessRecord,
    transition: Option<StatusTransition>,
}

impl PendingMutation {
    #[must_use]
    pub fn nup(&self) -> &str {
        &self.guard.nup
    }

    /// The record as it was before the mutation.
    #[must_use]
    pub const fn snapshot(&self) -> &ProcessRecord {
        &self.snapshot
    }

    /// The record as it should look once the store accepts the change.
    #[must_use]
    pub const fn speculative(&self) -> &ProcessRecord {
        &self.speculative
    }
}

/// Result of sending a pending mutation.
#[derive(Debug)]
pub enum MutationOutcome {
    /// The store accepted the change; `record` is authoritative.
    Committed {
        record: ProcessRecord,
        transition: Option<StatusTransition>,
    },
    /// The store call failed; `snapshot` must replace the speculative state.
    RolledBack {
        snapshot: ProcessRecord,
        error: StoreError,
    },
}

impl MutationOutcome {
    /// The record the caller should hold after this outcome.
    #[must_use]
    pub const fn record(&self) -> &ProcessRecord {
        match self {
            Self::Committed { record, .. } => record,
            Self::RolledBack { snapshot, .. } => snapshot,
        }
    }

    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

pub struct OptimisticSyncClient<S> {
    store: S,
    workflow: StatusWorkflow,
    registry: Arc<AssignmentRegistry>,
    in_flight: InFlightSet,
}

impl<S: RecordStore> OptimisticSyncClient<S> {
    pub fn new(store: S, workflow: StatusWorkflow, registry: Arc<AssignmentRegistry>) -> Self {
        Self {
            store,
            workflow,
            registry,
            in_flight: Arc::default(),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<AssignmentRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn workflow(&self) -> &StatusWorkflow {
        &self.workflow
    }

    #[must_use]
    pub fn is_in_flight(&self, nup: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(nup)
    }

    /// Claim `held`'s NUP and compute the speculative record.
    ///
    /// # Errors
    ///
    /// [`CoreError::MutationInFlight`] if the record already has a pending
    /// mutation; [`CoreError::TransitionDenied`] for a refused status change.
    pub fn begin(
        &self,
        held: &ProcessRecord,
        operation: Operation,
        actor: &Principal,
    ) -> Result<PendingMutation, CoreError> {
        let guard = InFlightGuard::acquire(&self.in_flight, &held.nup)?;
        debug!(nup = %held.nup, op = operation.kind(), "mutation started");

        let (speculative, transition, request) = match operation {
            Operation::ChangeStatus(target) => {
                let (record, transition) = self.workflow.change_status(held, target, actor)?;
                let request = StatusUpdateRequest::new(held.status, target, actor);
                (record, Some(transition), WireRequest::Status(request))
            }
            Operation::Assign(name) => {
                let record = self.registry.assign(held, &name, actor);
                let request = CollaboratorUpdateRequest {
                    novo_colaborador: name,
                    usuario_email: actor.email.clone(),
                };
                (record, None, WireRequest::Collaborator(request))
            }
        };

        Ok(PendingMutation {
            guard,
            request,
            snapshot: held.clone(),
            speculative,
            transition,
        })
    }

    /// Send the pending request and settle the mutation.
    pub fn complete(&self, pending: PendingMutation) -> MutationOutcome {
        let PendingMutation {
            guard,
            request,
            snapshot,
            speculative,
            transition,
        } = pending;

        let sent = match &request {
            WireRequest::Status(body) => self.store.update_status(&guard.nup, body),
            WireRequest::Collaborator(body) => self.store.update_collaborator(&guard.nup, body),
        };
        drop(guard);

        match sent {
            Ok(()) => {
                info!(nup = %speculative.nup, status = %speculative.status, "mutation committed");
                MutationOutcome::Committed {
                    record: speculative,
                    transition,
                }
            }
            Err(error) => {
                warn!(nup = %snapshot.nup, error = %error, "mutation rolled back");
                MutationOutcome::RolledBack { snapshot, error }
            }
        }
    }

    /// Apply `operation` to `held` optimistically and settle it.
    ///
    /// On success `held` carries the new state. On a store failure `held` is
    /// restored to its snapshot and a recoverable error is returned.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::begin`], or [`CoreError::Connectivity`] after
    /// a rollback.
    pub fn mutate(
        &self,
        held: &mut ProcessRecord,
        operation: Operation,
        actor: &Principal,
    ) -> Result<Option<StatusTransition>, CoreError> {
        let pending = self.begin(held, operation, actor)?;
        held.clone_from(pending.speculative());
        match self.complete(pending) {
            MutationOutcome::Committed { record, transition } => {
                *held = record;
                Ok(transition)
            }
            MutationOutcome::RolledBack { snapshot, error } => {
                *held = snapshot;
                Err(CoreError::Connectivity(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn actor() -> Principal {
        Principal::new("rossy@maida.health", "Rossy")
    }

    fn client_with(records: &[&str]) -> OptimisticSyncClient<MemoryStore> {
        let store = MemoryStore::default().with_records(records.iter().map(|n| ProcessRecord::new(*n)));
        OptimisticSyncClient::new(
            store,
            StatusWorkflow::default(),
            Arc::new(AssignmentRegistry::default()),
        )
    }

    #[test]
    fn committed_status_change_matches_store() {
        let client = client_with(&["1"]);
        let mut held = client.store().get("1").unwrap().unwrap();

        let transition = client
            .mutate(&mut held, Operation::ChangeStatus(Status::EmAnalise), &actor())
            .unwrap();

        assert!(transition.is_some());
        assert_eq!(held.status, Status::EmAnalise);
        let stored = client.store().get("1").unwrap().unwrap();
        assert_eq!(stored.status, Status::EmAnalise);
        assert!(!client.is_in_flight("1"));
    }

    #[test]
    fn store_refusal_restores_snapshot() {
        let client = client_with(&["1"]);
        // Held copy is stale: the store thinks it is still pending.
        let mut held = ProcessRecord::new("1");
        held.status = Status::ParaAnalise;
        let before = held.clone();

        let err = client
            .mutate(&mut held, Operation::ChangeStatus(Status::EmAnalise), &actor())
            .unwrap_err();

        assert!(err.is_recoverable());
        assert_eq!(held, before);
        assert!(!client.is_in_flight("1"));
    }

    #[test]
    fn denied_transition_never_reaches_store() {
        let mut finalized = ProcessRecord::new("1");
        finalized.status = Status::AssinadoETramitado;
        let client = OptimisticSyncClient::new(
            MemoryStore::default().with_records([finalized.clone()]),
            StatusWorkflow::default(),
            Arc::new(AssignmentRegistry::default()),
        );

        let mut held = finalized.clone();
        let err = client
            .mutate(&mut held, Operation::ChangeStatus(Status::Arquivado), &actor())
            .unwrap_err();
        assert!(matches!(err, CoreError::TransitionDenied { .. }));
        assert_eq!(held, finalized);
        assert_eq!(client.store().get("1").unwrap().unwrap(), finalized);
    }

    #[test]
    fn one_mutation_in_flight_per_record() {
        let client = client_with(&["1", "2"]);
        let one = ProcessRecord::new("1");
        let two = ProcessRecord::new("2");

        let pending = client
            .begin(&one, Operation::ChangeStatus(Status::EmAnalise), &actor())
            .unwrap();
        assert!(client.is_in_flight("1"));

        let again = client.begin(&one, Operation::Assign("Karen".into()), &actor());
        assert!(matches!(again, Err(CoreError::MutationInFlight { .. })));

        let other = client
            .begin(&two, Operation::ChangeStatus(Status::Arquivado), &actor())
            .unwrap();

        assert!(client.complete(pending).is_committed());
        assert!(client.complete(other).is_committed());
        assert!(!client.is_in_flight("1"));
        assert!(!client.is_in_flight("2"));
    }

    #[test]
    fn dropping_pending_mutation_releases_claim() {
        let client = client_with(&["1"]);
        let held = ProcessRecord::new("1");
        let pending = client
            .begin(&held, Operation::ChangeStatus(Status::EmAnalise), &actor())
            .unwrap();
        assert_eq!(pending.snapshot(), &held);
        assert_eq!(pending.speculative().status, Status::EmAnalise);
        drop(pending);
        assert!(!client.is_in_flight("1"));
    }

    #[test]
    fn assignment_is_persisted_and_registered() {
        let client = client_with(&["1"]);
        let mut held = client.store().get("1").unwrap().unwrap();

        let transition = client
            .mutate(&mut held, Operation::Assign("Zuleica".into()), &actor())
            .unwrap();

        assert!(transition.is_none());
        assert_eq!(held.responsavel.as_deref(), Some("Zuleica"));
        assert!(client.registry().contains("Zuleica"));
        let stored = client.store().get("1").unwrap().unwrap();
        assert_eq!(stored.responsavel.as_deref(), Some("Zuleica"));
    }
}

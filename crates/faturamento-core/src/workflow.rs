//! Status workflow: the only place that changes a record's status.
//!
//! Every accepted change appends exactly one [`StatusTransition`] to the
//! record's history. The single rule is that a finalized record
//! (`assinado e tramitado`) cannot leave the terminal status.

use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::model::{Principal, ProcessRecord, Status, StatusTransition};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct StatusWorkflow {
    clock: Arc<dyn Clock>,
}

impl Default for StatusWorkflow {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl StatusWorkflow {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Move `record` to `target`, returning the new record and its audit entry.
    ///
    /// The input record is never modified.
    ///
    /// # Errors
    ///
    /// [`CoreError::TransitionDenied`] when the record is finalized and
    /// `target` is a different status.
    pub fn change_status(
        &self,
        record: &ProcessRecord,
        target: Status,
        actor: &Principal,
    ) -> Result<(ProcessRecord, StatusTransition), CoreError> {
        record
            .status
            .can_transition_to(target)
            .map_err(|denied| CoreError::TransitionDenied {
                nup: record.nup.clone(),
                current: denied.from,
                target: denied.to,
            })?;

        let now = self.clock.now();
        let transition = StatusTransition {
            from: record.status,
            to: target,
            actor_email: actor.email.clone(),
            actor_name: actor.display_name.clone(),
            at: now,
        };

        let mut updated = record.clone();
        updated.status = target;
        updated.ultima_atualizacao = Some(now);
        updated.historico_status.push(transition.clone());

        debug!(nup = %record.nup, from = %transition.from, to = %target, "status changed");
        Ok((updated, transition))
    }

    /// Statuses a record may currently move to, in display order.
    #[must_use]
    pub fn allowed_targets(record: &ProcessRecord) -> Vec<Status> {
        Status::ALL
            .into_iter()
            .filter(|target| record.status.can_transition_to(*target).is_ok())
            .collect()
    }
}

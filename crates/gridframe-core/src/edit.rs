use crate::error::GridError;
use crate::format::ValidationError;
use crate::format::Validator;
use crate::format::coerce_number;
use crate::row::RowId;
use serde_json::Value;

/// Decision of the `before_edit` hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditGate {
    Allow,
    /// Normal control flow, not an error: the state machine simply does
    /// not transition.
    Veto,
    /// Hold the transition open until the host resolves the ticket —
    /// e.g. a server-fetched editor option list.
    Defer,
}

/// Handle for resolving a deferred edit gate. Carries the generation it
/// was minted under; a resolution whose generation no longer matches is
/// stale and gets discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditTicket {
    generation: u64,
}

/// What happened to a ticket resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateResolution {
    /// The session moved to editing.
    Opened,
    /// The session it belonged to was cancelled or superseded; the
    /// resolution had no effect.
    Stale,
    /// The gate reported failure; the cell reverted to idle.
    Failed(String),
}

/// The transient state of one in-progress cell edit.
#[derive(Clone, Debug, PartialEq)]
pub struct EditSession {
    pub row: RowId,
    pub column_id: String,
    pub original: Value,
    pub pending: Value,
    pub errors: Vec<ValidationError>,
    /// Editor options delivered by a deferred gate, if any.
    pub options: Option<Vec<Value>>,
}

impl EditSession {
    /// Dirty means pending differs from original after normalization:
    /// numbers compare numerically, strings compare trimmed.
    pub fn is_dirty(&self) -> bool {
        if let (Some(a), Some(b)) = (coerce_number(&self.pending), coerce_number(&self.original)) {
            return a != b;
        }
        match (&self.pending, &self.original) {
            (Value::String(a), Value::String(b)) => a.trim() != b.trim(),
            (a, b) => a != b,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
enum Phase {
    #[default]
    Idle,
    /// Gate deferred; input stays live, the session is not editing yet.
    Pending(EditSession),
    Editing(EditSession),
}

/// Per-cell edit state machine: idle → editing → (commit | cancel) → idle,
/// with an optional deferred hold between idle and editing.
///
/// Every transition out of idle bumps the generation counter, which is
/// the stale-async guard: a deferred resolution is applied only when its
/// ticket generation is still current.
#[derive(Debug, Default)]
pub struct EditController {
    phase: Phase,
    generation: u64,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.phase, Phase::Editing(_))
    }

    /// The live session, editing or gate-pending.
    pub fn session(&self) -> Option<&EditSession> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Pending(s) | Phase::Editing(s) => Some(s),
        }
    }

    /// Opens an edit session immediately (gate allowed).
    /// Starting over a live session cancels it first; the caller emits
    /// the corresponding cancel notification from the returned session.
    pub fn begin(&mut self, row: RowId, column_id: &str, original: Value) -> Option<EditSession> {
        let cancelled = self.take_session();
        self.generation += 1;
        self.phase = Phase::Editing(Self::session_for(row, column_id, original));
        cancelled
    }

    /// Opens a deferred session and mints its ticket.
    pub fn begin_deferred(
        &mut self,
        row: RowId,
        column_id: &str,
        original: Value,
    ) -> (EditTicket, Option<EditSession>) {
        let cancelled = self.take_session();
        self.generation += 1;
        self.phase = Phase::Pending(Self::session_for(row, column_id, original));
        (
            EditTicket {
                generation: self.generation,
            },
            cancelled,
        )
    }

    /// Applies the outcome of a deferred gate. Stale tickets — the
    /// session was cancelled, committed, or superseded since the ticket
    /// was minted — are discarded without touching state.
    pub fn resolve_gate(
        &mut self,
        ticket: EditTicket,
        outcome: Result<Option<Vec<Value>>, String>,
    ) -> GateResolution {
        if ticket.generation != self.generation || !matches!(self.phase, Phase::Pending(_)) {
            log::debug!(
                "resolve_gate: discarding stale ticket (generation {})",
                ticket.generation
            );
            return GateResolution::Stale;
        }
        let Phase::Pending(mut session) = std::mem::take(&mut self.phase) else {
            return GateResolution::Stale;
        };
        match outcome {
            Ok(options) => {
                session.options = options;
                self.phase = Phase::Editing(session);
                GateResolution::Opened
            }
            Err(message) => {
                // Revert to the pre-request state; the caller reports the
                // failure upward as a notification.
                self.generation += 1;
                GateResolution::Failed(message)
            }
        }
    }

    /// Updates the pending value and re-runs every validator; all
    /// failures surface together on the session.
    pub fn set_pending(&mut self, value: Value, validators: &[Validator]) -> &[ValidationError] {
        let Phase::Editing(session) = &mut self.phase else {
            return &[];
        };
        session.pending = value;
        session.errors = validators
            .iter()
            .filter_map(|v| match v.run(&session.pending) {
                Ok(()) => None,
                Err(message) => Some(ValidationError {
                    validator: v.name.clone(),
                    message,
                }),
            })
            .collect();
        &session.errors
    }

    /// Closes the session for commit. Requires an editing session with a
    /// clean validation pass; the caller writes the value through the
    /// field path.
    pub fn commit(&mut self) -> Result<EditSession, GridError> {
        match std::mem::take(&mut self.phase) {
            Phase::Editing(session) => {
                if session.errors.is_empty() {
                    self.generation += 1;
                    Ok(session)
                } else {
                    let errors = session.errors.clone();
                    self.phase = Phase::Editing(session);
                    Err(GridError::ValidationFailed(errors))
                }
            }
            other => {
                self.phase = other;
                Err(GridError::NoEditSession)
            }
        }
    }

    /// Discards the session at any point before commit, including while a
    /// deferred gate is in flight (its eventual resolution goes stale).
    pub fn cancel(&mut self) -> Option<EditSession> {
        let session = self.take_session();
        if session.is_some() {
            self.generation += 1;
        }
        session
    }

    fn take_session(&mut self) -> Option<EditSession> {
        match std::mem::take(&mut self.phase) {
            Phase::Idle => None,
            Phase::Pending(s) | Phase::Editing(s) => Some(s),
        }
    }

    fn session_for(row: RowId, column_id: &str, original: Value) -> EditSession {
        EditSession {
            row,
            column_id: column_id.to_string(),
            pending: original.clone(),
            original,
            errors: Vec::new(),
            options: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn begin_set_commit_round_trip() {
        let mut c = EditController::new();
        c.begin(RowId(0), "name", json!("old"));
        assert!(c.is_editing());
        c.set_pending(json!("new"), &[]);
        let session = c.commit().unwrap();
        assert_eq!(session.pending, json!("new"));
        assert_eq!(session.original, json!("old"));
        assert!(c.is_idle());
    }

    #[test]
    fn cancel_discards_pending() {
        let mut c = EditController::new();
        c.begin(RowId(0), "name", json!("old"));
        c.set_pending(json!("new"), &[]);
        let session = c.cancel().unwrap();
        assert_eq!(session.original, json!("old"));
        assert!(c.is_idle());
        assert!(matches!(c.commit(), Err(GridError::NoEditSession)));
    }

    #[test]
    fn all_validator_failures_surface_together() {
        let mut c = EditController::new();
        c.begin(RowId(0), "n", json!(1));
        let validators = vec![Validator::required(), Validator::numeric()];
        let errors = c.set_pending(json!(""), &validators);
        assert_eq!(errors.len(), 2);
        assert!(matches!(c.commit(), Err(GridError::ValidationFailed(e)) if e.len() == 2));
        // Still editing after a failed commit.
        assert!(c.is_editing());
        c.set_pending(json!("42"), &validators);
        assert!(c.commit().is_ok());
    }

    #[test]
    fn deferred_gate_opens_with_options() {
        let mut c = EditController::new();
        let (ticket, _) = c.begin_deferred(RowId(0), "status", json!("open"));
        assert!(!c.is_editing());
        let resolution = c.resolve_gate(ticket, Ok(Some(vec![json!("open"), json!("closed")])));
        assert_eq!(resolution, GateResolution::Opened);
        assert!(c.is_editing());
        assert_eq!(
            c.session().unwrap().options,
            Some(vec![json!("open"), json!("closed")])
        );
    }

    #[test]
    fn cancel_while_gate_in_flight_makes_resolution_stale() {
        let mut c = EditController::new();
        let (ticket, _) = c.begin_deferred(RowId(0), "status", json!("open"));
        assert!(c.cancel().is_some());
        assert_eq!(
            c.resolve_gate(ticket, Ok(None)),
            GateResolution::Stale
        );
        assert!(c.is_idle());
    }

    #[test]
    fn superseded_session_makes_old_ticket_stale() {
        let mut c = EditController::new();
        let (old_ticket, _) = c.begin_deferred(RowId(0), "a", json!(1));
        let (new_ticket, cancelled) = c.begin_deferred(RowId(1), "b", json!(2));
        assert!(cancelled.is_some());
        assert_eq!(c.resolve_gate(old_ticket, Ok(None)), GateResolution::Stale);
        assert_eq!(c.resolve_gate(new_ticket, Ok(None)), GateResolution::Opened);
        assert_eq!(c.session().unwrap().row, RowId(1));
    }

    #[test]
    fn failed_gate_reverts_to_idle() {
        let mut c = EditController::new();
        let (ticket, _) = c.begin_deferred(RowId(0), "a", json!(1));
        let resolution = c.resolve_gate(ticket, Err("fetch failed".to_string()));
        assert_eq!(resolution, GateResolution::Failed("fetch failed".to_string()));
        assert!(c.is_idle());
        // And the ticket cannot apply twice.
        assert_eq!(c.resolve_gate(ticket, Ok(None)), GateResolution::Stale);
    }

    #[test]
    fn dirty_compares_post_normalization() {
        let session = EditSession {
            row: RowId(0),
            column_id: "n".into(),
            original: json!("14"),
            pending: json!(14.0),
            errors: Vec::new(),
            options: None,
        };
        assert!(!session.is_dirty());
        let session = EditSession {
            pending: json!("  x  "),
            original: json!("x"),
            ..session
        };
        assert!(!session.is_dirty());
        let session = EditSession {
            pending: json!("y"),
            ..session
        };
        assert!(session.is_dirty());
    }
}

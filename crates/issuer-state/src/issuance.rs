//! # Sub-Request Lifecycle
//!
//! One [`SubRequestLifecycle`] per credential definition in an issuance
//! request. The orchestrator is the only writer; it calls [`issue`] or
//! [`fail`] exactly once per sub-request. Both reject a sub-request that
//! already reached a terminal state, so a late writer can never overwrite
//! a recorded outcome.
//!
//! [`issue`]: SubRequestLifecycle::issue
//! [`fail`]: SubRequestLifecycle::fail

use serde::{Deserialize, Serialize};
use thiserror::Error;

use issuer_core::Timestamp;

use crate::failure::FailureReason;

// ─── Issuance State ──────────────────────────────────────────────────

/// Status of a sub-request, or of a whole request (see [`overall_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuanceState {
    /// Accepted, work outstanding.
    Pending,
    /// Credential signed and stored (terminal).
    Issued,
    /// Ended with a failure reason (terminal).
    Failed,
}

impl IssuanceState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Issued | Self::Failed)
    }
}

impl std::fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Issued => "ISSUED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Derive a request-level status from its sub-request states.
///
/// PENDING while any sub-request is pending, ISSUED when every sub-request
/// issued, FAILED otherwise. A request with no sub-requests is FAILED.
pub fn overall_status<I>(states: I) -> IssuanceState
where
    I: IntoIterator<Item = IssuanceState>,
{
    let mut any = false;
    let mut all_issued = true;
    for state in states {
        any = true;
        match state {
            IssuanceState::Pending => return IssuanceState::Pending,
            IssuanceState::Failed => all_issued = false,
            IssuanceState::Issued => {}
        }
    }
    if any && all_issued {
        IssuanceState::Issued
    } else {
        IssuanceState::Failed
    }
}

// ─── Issuance Mode ───────────────────────────────────────────────────

/// How sub-requests of one request relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssuanceMode {
    /// Any unknown credential definition fails the whole request before
    /// any attestation is resolved.
    #[default]
    FailFast,
    /// Each sub-request succeeds or fails on its own.
    Independent,
}

impl std::fmt::Display for IssuanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::FailFast => "failFast",
            Self::Independent => "independent",
        })
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Rejected lifecycle transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The sub-request already reached a terminal state.
    #[error("sub-request is in terminal state {state}")]
    AlreadyTerminal { state: IssuanceState },

    /// The target state is not reachable from the current one.
    #[error("invalid issuance transition: {from} -> {to}")]
    InvalidTransition {
        from: IssuanceState,
        to: IssuanceState,
    },
}

// ─── Transition Record ───────────────────────────────────────────────

/// One entry in a sub-request's transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
    pub from_state: IssuanceState,
    pub to_state: IssuanceState,
    pub timestamp: Timestamp,
    pub reason: String,
}

// ─── Lifecycle ───────────────────────────────────────────────────────

/// Lifecycle of a single sub-request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRequestLifecycle {
    state: IssuanceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    transitions: Vec<TransitionRecord>,
}

impl Default for SubRequestLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl SubRequestLifecycle {
    /// A fresh PENDING lifecycle.
    pub fn new() -> Self {
        Self {
            state: IssuanceState::Pending,
            failure: None,
            transitions: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> IssuanceState {
        self.state
    }

    /// Failure reason, present only in FAILED.
    pub fn failure(&self) -> Option<&FailureReason> {
        self.failure.as_ref()
    }

    /// Transition log, oldest first.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// PENDING → ISSUED.
    pub fn issue(&mut self) -> Result<(), TransitionError> {
        self.require_pending(IssuanceState::Issued)?;
        self.do_transition(IssuanceState::Issued, "credential issued".to_string());
        Ok(())
    }

    /// PENDING → FAILED, recording `reason`.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), TransitionError> {
        self.require_pending(IssuanceState::Failed)?;
        self.do_transition(IssuanceState::Failed, reason.to_string());
        self.failure = Some(reason);
        Ok(())
    }

    fn require_pending(&self, target: IssuanceState) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::AlreadyTerminal { state: self.state });
        }
        if self.state != IssuanceState::Pending {
            return Err(TransitionError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: IssuanceState, reason: String) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: Timestamp::now(),
            reason,
        });
        self.state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signing_failure() -> FailureReason {
        FailureReason::SigningFailed {
            detail: "timeout".into(),
        }
    }

    #[test]
    fn new_lifecycle_is_pending() {
        let life = SubRequestLifecycle::new();
        assert_eq!(life.state(), IssuanceState::Pending);
        assert!(!life.is_terminal());
        assert!(life.failure().is_none());
        assert!(life.transitions().is_empty());
    }

    #[test]
    fn pending_to_issued() {
        let mut life = SubRequestLifecycle::new();
        life.issue().unwrap();
        assert_eq!(life.state(), IssuanceState::Issued);
        assert_eq!(life.transitions().len(), 1);
        assert_eq!(life.transitions()[0].from_state, IssuanceState::Pending);
    }

    #[test]
    fn pending_to_failed_records_reason() {
        let mut life = SubRequestLifecycle::new();
        life.fail(signing_failure()).unwrap();
        assert_eq!(life.state(), IssuanceState::Failed);
        assert_eq!(life.failure(), Some(&signing_failure()));
        assert_eq!(life.transitions()[0].reason, "signing failed: timeout");
    }

    #[test]
    fn issued_cannot_fail() {
        let mut life = SubRequestLifecycle::new();
        life.issue().unwrap();
        assert_eq!(
            life.fail(signing_failure()),
            Err(TransitionError::AlreadyTerminal {
                state: IssuanceState::Issued
            })
        );
        assert_eq!(life.state(), IssuanceState::Issued);
        assert!(life.failure().is_none());
    }

    #[test]
    fn failed_cannot_issue() {
        let mut life = SubRequestLifecycle::new();
        life.fail(signing_failure()).unwrap();
        assert!(life.issue().is_err());
        assert_eq!(life.state(), IssuanceState::Failed);
    }

    #[test]
    fn overall_status_rules() {
        use IssuanceState::*;
        assert_eq!(overall_status([Issued, Issued]), Issued);
        assert_eq!(overall_status([Issued, Pending, Failed]), Pending);
        assert_eq!(overall_status([Issued, Failed]), Failed);
        assert_eq!(overall_status([Failed]), Failed);
        assert_eq!(overall_status(Vec::new()), Failed);
    }

    #[test]
    fn state_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_value(IssuanceState::Pending).unwrap(),
            "PENDING"
        );
        assert_eq!(IssuanceState::Failed.to_string(), "FAILED");
        assert_eq!(
            serde_json::to_value(IssuanceMode::Independent).unwrap(),
            "independent"
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Issue,
        Fail,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Issue), Just(Op::Fail)]
    }

    proptest! {
        #[test]
        fn status_is_monotone(ops in proptest::collection::vec(op(), 1..16)) {
            let mut life = SubRequestLifecycle::new();
            let mut terminal: Option<IssuanceState> = None;
            for op in ops {
                let result = match op {
                    Op::Issue => life.issue(),
                    Op::Fail => life.fail(signing_failure()),
                };
                match terminal {
                    Some(state) => {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(life.state(), state);
                    }
                    None => {
                        prop_assert!(result.is_ok());
                        prop_assert!(life.is_terminal());
                        terminal = Some(life.state());
                    }
                }
                prop_assert_eq!(life.transitions().len(), 1);
            }
        }
    }
}

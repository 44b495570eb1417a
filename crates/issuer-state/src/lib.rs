//! # issuer-state — Issuance Lifecycle
//!
//! Every credential definition named in an issuance request becomes one
//! sub-request with its own lifecycle:
//!
//! ```text
//! PENDING ──▶ ISSUED  (terminal)
//!    │
//!    └─────▶ FAILED   (terminal, carries a FailureReason)
//! ```
//!
//! Transitions are monotone: once a sub-request reaches a terminal state
//! every further transition is rejected with [`TransitionError`]. The
//! request-level status is derived from its sub-requests by
//! [`overall_status`].
//!
//! - [`issuance`]: states, modes, the sub-request lifecycle.
//! - [`failure`]: the structured failure taxonomy recorded on FAILED
//!   sub-requests.

pub mod failure;
pub mod issuance;

pub use failure::FailureReason;
pub use issuance::{
    overall_status, IssuanceMode, IssuanceState, SubRequestLifecycle, TransitionError,
    TransitionRecord,
};

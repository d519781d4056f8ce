//! Convenience re-exports for downstream crates.

pub use crate::auth::token::decode_subject;
pub use crate::auth::{
    AuthBackend, AuthCoordinator, AuthPhase, GuardDecision, LoginOutcome, RouteGuard, SessionStore,
};
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::types::{Identity, NewTask, Profile, ProfileUpdate, Session, Task, TaskUpdate};

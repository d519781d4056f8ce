#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod types;

pub mod auth;
#[doc(hidden)]
pub mod prelude;

pub use auth::{
    AuthBackend, AuthCoordinator, AuthPhase, GuardDecision, LoginOutcome, PhaseSubscription,
    RouteGuard, SessionStore, Subscription,
};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use types::{Identity, NewTask, Profile, ProfileUpdate, Session, Task, TaskUpdate};

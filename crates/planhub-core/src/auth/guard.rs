//! Navigation gatekeeper for protected views.

use std::fmt;
use std::sync::Arc;

use super::{AuthCoordinator, TRACING_TARGET};

/// Default route unauthenticated navigations are redirected to.
pub const DEFAULT_SIGN_IN_ROUTE: &str = "/sign-in";

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The navigation may proceed.
    Allow,
    /// The navigation must be redirected to the sign-in route.
    RedirectTo(String),
}

impl GuardDecision {
    /// Whether this decision allows the navigation.
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Decides whether a protected route may be entered.
///
/// The logged-in fast path is synchronous and touches no network. When
/// no session is loaded, exactly one
/// [`refresh_session`](AuthCoordinator::refresh_session) attempt is made
/// per navigation (a surviving HttpOnly cookie may still be valid after
/// a reload); any failure is terminal for that navigation — a flapping
/// network never produces repeated attempts.
#[derive(Clone)]
pub struct RouteGuard {
    coordinator: Arc<AuthCoordinator>,
    sign_in_route: String,
}

impl fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGuard")
            .field("sign_in_route", &self.sign_in_route)
            .finish_non_exhaustive()
    }
}

impl RouteGuard {
    /// Creates a guard redirecting to [`DEFAULT_SIGN_IN_ROUTE`].
    pub fn new(coordinator: Arc<AuthCoordinator>) -> Self {
        Self::with_sign_in_route(coordinator, DEFAULT_SIGN_IN_ROUTE)
    }

    /// Creates a guard with a custom sign-in route.
    pub fn with_sign_in_route(
        coordinator: Arc<AuthCoordinator>,
        sign_in_route: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            sign_in_route: sign_in_route.into(),
        }
    }

    /// Checks whether the given protected route may be entered.
    pub async fn can_enter(&self, route: &str) -> GuardDecision {
        if self.coordinator.is_logged_in() {
            return GuardDecision::Allow;
        }

        // One refresh attempt per navigation, then the decision is final.
        match self.coordinator.refresh_session().await {
            Ok(()) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    route,
                    "Session refreshed during guard check"
                );
                GuardDecision::Allow
            }
            Err(error) => {
                if !error.is_benign() {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        route,
                        kind = ?error.kind,
                        "Guard check failed; redirecting"
                    );
                }
                GuardDecision::RedirectTo(self.sign_in_route.clone())
            }
        }
    }
}

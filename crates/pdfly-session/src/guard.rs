//! Route access decisions derived from the session state

use crate::manager::AuthState;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Verification still in flight; show a loading state
    Wait,
    Allow,
    Redirect(&'static str),
}

/// Pages that require a signed-in user
pub fn protected_route(state: AuthState) -> RouteDecision {
    match state {
        AuthState::Verifying => RouteDecision::Wait,
        AuthState::Authenticated => RouteDecision::Allow,
        AuthState::Unauthenticated => RouteDecision::Redirect(LOGIN_PATH),
    }
}

/// Login and signup pages; signed-in users are sent on to the dashboard
pub fn public_route(state: AuthState) -> RouteDecision {
    match state {
        AuthState::Verifying => RouteDecision::Wait,
        AuthState::Authenticated => RouteDecision::Redirect(DASHBOARD_PATH),
        AuthState::Unauthenticated => RouteDecision::Allow,
    }
}

pub fn optional_route(state: AuthState) -> RouteDecision {
    match state {
        AuthState::Verifying => RouteDecision::Wait,
        _ => RouteDecision::Allow,
    }
}

//! Route gating for signed-in and admin-only views.

use shared::domain::Role;
use tracing::warn;

use crate::session::SessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    Register,
    Dashboard,
    Admin,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::Admin => "/admin",
        }
    }

    /// Where `/` and unknown paths lead.
    pub fn landing(authenticated: bool) -> Self {
        if authenticated {
            Self::Dashboard
        } else {
            Self::SignIn
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(Route),
    /// Access cannot be decided yet; show a loading indicator.
    Pending,
}

pub struct AccessGuard;

impl AccessGuard {
    pub fn decide(authenticated: bool) -> GuardDecision {
        if authenticated {
            GuardDecision::Render
        } else {
            GuardDecision::Redirect(Route::SignIn)
        }
    }

    /// Checks the stored credential as of now, not the cached session flag.
    pub async fn check(session: &SessionManager) -> GuardDecision {
        Self::decide(session.is_authenticated().await)
    }
}

pub struct AdminGuard;

impl AdminGuard {
    /// Decision from what is known right now; an unresolved role is
    /// `Pending`, never a denial.
    pub fn decide(authenticated: bool, role: Option<Role>) -> GuardDecision {
        match (authenticated, role) {
            (false, _) => GuardDecision::Redirect(Route::SignIn),
            (true, None) => GuardDecision::Pending,
            (true, Some(Role::Admin)) => GuardDecision::Render,
            (true, Some(Role::User)) => GuardDecision::Redirect(Route::Dashboard),
        }
    }

    /// Resolves the role if needed and returns a final decision.
    pub async fn check(session: &SessionManager) -> GuardDecision {
        if !session.is_authenticated().await {
            return GuardDecision::Redirect(Route::SignIn);
        }
        match session.resolve_role().await {
            Ok(Some(role)) => Self::decide(true, Some(role)),
            Ok(None) => GuardDecision::Redirect(Route::Dashboard),
            Err(err) if err.requires_sign_in() => GuardDecision::Redirect(Route::SignIn),
            Err(err) => {
                warn!("guard: could not resolve role: {err}");
                GuardDecision::Redirect(Route::Dashboard)
            }
        }
    }
}

//! Screen routing derived from session state.
//!
//! Surfaces ask for a destination; the session decides whether they get it.

use crate::model::session::SessionState;
use serde::{Deserialize, Serialize};

/// Top-level screens of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Launch-time restore has not settled yet.
    Loading,
    Auth,
    Home,
    Notes,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Auth => "auth",
            Self::Home => "home",
            Self::Notes => "notes",
        }
    }

    /// Screens that require a signed-in user.
    pub fn requires_session(self) -> bool {
        matches!(self, Self::Home | Self::Notes)
    }
}

/// Resolves the screen to show for `requested`.
///
/// - Before restore settles everything routes to `Loading`.
/// - Signed-out users (including `Authenticating` and `Error`) stay on `Auth`.
/// - Signed-in users asking for `Auth` or `Loading` land on `Home`.
pub fn resolve_route(state: &SessionState, restore_complete: bool, requested: Route) -> Route {
    if !restore_complete {
        return Route::Loading;
    }
    if !state.is_authenticated() {
        return Route::Auth;
    }
    if requested.requires_session() {
        requested
    } else {
        Route::Home
    }
}

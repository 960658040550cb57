use shared::Role;
use std::fmt;

use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Admin,
    Customer,
}

impl Route {
    /// Map a path to a route. `/` and anything unknown go to login.
    pub fn from_path(path: &str) -> Self {
        match path.trim().trim_start_matches('#').trim_end_matches('/') {
            "/register" => Route::Register,
            "/admin" => Route::Admin,
            "/customer" => Route::Customer,
            _ => Route::Login,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Admin => "/admin",
            Route::Customer => "/customer",
        }
    }

    pub fn required_role(self) -> Option<Role> {
        match self {
            Route::Admin => Some(Role::Admin),
            Route::Customer => Some(Role::Customer),
            Route::Login | Route::Register => None,
        }
    }

    pub fn dashboard_for(role: Role) -> Self {
        match role {
            Role::Admin => Route::Admin,
            Role::Customer => Route::Customer,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Resolve the route to actually show for `requested`.
///
/// A protected route is reachable only with a token and the matching role;
/// otherwise the session is cleared and login is shown instead.
pub fn resolve(requested: Route, session: &mut SessionContext) -> Route {
    match requested.required_role() {
        None => requested,
        Some(role) if session.allows(role) => requested,
        Some(role) => {
            tracing::debug!(route = %requested, required = %role, "Redirecting to login");
            session.clear();
            Route::Login
        }
    }
}

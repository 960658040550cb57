//! Client-side session: who is signed in and with which role.
//!
//! This only decides which screens the client shows. It is not a security
//! boundary; the API authorizes every request from the bearer token.

use shared::Role;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    /// A login request for `role` is in flight
    Authenticating { role: Role },
    Authenticated { token: String, role: Role },
}

/// Explicit session handed to every view instead of ambient global state
#[derive(Debug, Default)]
pub struct SessionContext {
    state: AuthState,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn token(&self) -> Option<&str> {
        match &self.state {
            AuthState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match &self.state {
            AuthState::Authenticated { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn is_authenticating(&self) -> bool {
        matches!(self.state, AuthState::Authenticating { .. })
    }

    /// Enter `Authenticating`. Returns false if a login is already in flight.
    ///
    /// Starting a new login from `Authenticated` drops the old session first.
    pub fn begin_login(&mut self, role: Role) -> bool {
        if self.is_authenticating() {
            return false;
        }
        self.state = AuthState::Authenticating { role };
        true
    }

    /// Finish a login with the token from the server. The role is the one
    /// chosen when the login started, not anything the server returned.
    pub fn complete_login(&mut self, token: String) -> Option<Role> {
        match self.state {
            AuthState::Authenticating { role } => {
                tracing::info!(role = %role, "Signed in");
                self.state = AuthState::Authenticated { token, role };
                Some(role)
            }
            _ => None,
        }
    }

    pub fn fail_login(&mut self) {
        if self.is_authenticating() {
            self.state = AuthState::Anonymous;
        }
    }

    /// Whether a route protected for `role` may be shown
    pub fn allows(&self, role: Role) -> bool {
        matches!(&self.state, AuthState::Authenticated { token, role: r } if !token.is_empty() && *r == role)
    }

    /// Log out. Does nothing unless the user confirmed.
    pub fn logout(&mut self, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        self.clear();
        true
    }

    pub fn clear(&mut self) {
        if self.state != AuthState::Anonymous {
            tracing::info!("Session cleared");
        }
        self.state = AuthState::Anonymous;
    }
}

use shared::{Envelope, LoginData, Role};

use crate::api::ApiClient;
use crate::credentials::CredentialStore;
use crate::error::ApiResult;
use crate::router::Route;
use crate::session::SessionContext;
use crate::validation::{self, validate_login};
use crate::views::UNEXPECTED_ERROR;

const LOGIN_FAILED: &str = "Login failed. Please try again.";

/// Form values captured when a submission starts
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    role: Role,
    email: String,
    password: String,
    remember: bool,
}

impl LoginAttempt {
    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn send(&self, api: &ApiClient) -> ApiResult<Envelope<LoginData>> {
        api.login(self.role, &self.email, &self.password).await
    }
}

/// Login form state
#[derive(Debug)]
pub struct LoginView {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub remember: bool,
    pub password_visible: bool,
    pub error: Option<String>,
    pub loading: bool,
    store: CredentialStore,
}

impl LoginView {
    /// Build the form, pre-filled from remembered credentials if any parse
    pub fn mount(store: CredentialStore) -> Self {
        let mut view = Self {
            email: String::new(),
            password: String::new(),
            role: Role::Customer,
            remember: false,
            password_visible: false,
            error: None,
            loading: false,
            store,
        };

        if let Some(saved) = view.store.load() {
            view.email = saved.email;
            view.password = saved.password.unwrap_or_default();
            view.role = saved.role;
            view.remember = true;
        }
        view
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn is_form_valid(&self) -> bool {
        validate_login(&self.email, &self.password).is_ok()
    }

    pub fn email_invalid(&self) -> bool {
        !self.email.is_empty() && !validation::is_valid_email(&self.email)
    }

    pub fn password_invalid(&self) -> bool {
        !self.password.is_empty() && !validation::is_valid_password(&self.password)
    }

    /// Update the email. Moving away from the remembered address turns
    /// remember off; the record itself stays until the next submit.
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        if self.remember {
            if let Ok(Some(saved)) = self.store.read() {
                if saved.email != self.email {
                    self.remember = false;
                }
            }
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Same rule as [`set_email`](Self::set_email), for the role toggle
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        if self.remember {
            if let Ok(Some(saved)) = self.store.read() {
                if saved.role != role {
                    self.remember = false;
                }
            }
        }
    }

    pub fn set_remember(&mut self, remember: bool) {
        self.remember = remember;
    }

    pub fn toggle_password_visible(&mut self) {
        self.password_visible = !self.password_visible;
    }

    /// Submit the form. Returns the dashboard route on success.
    ///
    /// Invalid input is reported without touching the network. The role used
    /// for the session is the one selected here, not one from the server.
    pub async fn submit(&mut self, api: &ApiClient, session: &mut SessionContext) -> Option<Route> {
        let attempt = self.begin_submit(session)?;
        let result = attempt.send(api).await;
        self.finish_submit(attempt, result, session)
    }

    /// Validate and mark the form as loading. Returns the credentials to send,
    /// or `None` when a submission is already in flight or the input is invalid.
    pub fn begin_submit(&mut self, session: &mut SessionContext) -> Option<LoginAttempt> {
        if self.loading {
            return None;
        }
        self.error = None;

        if let Err(e) = validate_login(&self.email, &self.password) {
            self.error = Some(e.to_string());
            return None;
        }

        if !session.begin_login(self.role) {
            return None;
        }
        self.loading = true;
        Some(LoginAttempt {
            role: self.role,
            email: self.email.clone(),
            password: self.password.clone(),
            remember: self.remember,
        })
    }

    /// Apply the server's answer to `attempt`
    pub fn finish_submit(
        &mut self,
        attempt: LoginAttempt,
        result: ApiResult<Envelope<LoginData>>,
        session: &mut SessionContext,
    ) -> Option<Route> {
        self.loading = false;

        let envelope = match result {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Login request failed: {}", e);
                session.fail_login();
                self.error = Some(UNEXPECTED_ERROR.to_string());
                return None;
            }
        };

        let token = match envelope.data.as_ref().map(|d| d.token.clone()) {
            Some(token) if envelope.success && !token.is_empty() => token,
            _ => {
                session.fail_login();
                self.error = Some(envelope.message_or(LOGIN_FAILED));
                return None;
            }
        };

        self.persist_remembered(&attempt);
        session.complete_login(token);
        Some(Route::dashboard_for(attempt.role))
    }

    fn persist_remembered(&self, attempt: &LoginAttempt) {
        let result = if attempt.remember {
            self.store.save(&attempt.email, &attempt.password, attempt.role)
        } else {
            self.store.clear()
        };
        if let Err(e) = result {
            tracing::warn!("Failed to update remembered credentials: {}", e);
        }
    }
}

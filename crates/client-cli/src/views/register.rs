use shared::RegisterRequest;

use crate::api::{Ack, ApiClient};
use crate::error::ApiResult;
use crate::router::Route;
use crate::validation::{self, validate_registration};
use crate::views::UNEXPECTED_ERROR;

const REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

/// Customer self-registration form
#[derive(Debug, Default)]
pub struct RegisterView {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_visible: bool,
    pub error: Option<String>,
    pub loading: bool,
}

impl RegisterView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_form_valid(&self) -> bool {
        validate_registration(&self.name, &self.email, &self.password).is_ok()
    }

    pub fn name_invalid(&self) -> bool {
        !self.name.is_empty() && !validation::is_valid_name(&self.name)
    }

    pub fn email_invalid(&self) -> bool {
        !self.email.is_empty() && !validation::is_valid_email(&self.email)
    }

    pub fn password_invalid(&self) -> bool {
        !self.password.is_empty() && !validation::is_valid_password(&self.password)
    }

    /// Submit the form; on success the caller should show the login route
    pub async fn submit(&mut self, api: &ApiClient) -> Option<Route> {
        let request = self.begin_submit()?;
        let result = api.register_customer(&request).await;
        self.finish_submit(result)
    }

    /// Validate and mark the form as loading. Returns the request body to
    /// send, or `None` when already loading or the input is invalid.
    pub fn begin_submit(&mut self) -> Option<RegisterRequest> {
        if self.loading {
            return None;
        }
        self.error = None;

        if let Err(e) = validate_registration(&self.name, &self.email, &self.password) {
            self.error = Some(e.to_string());
            return None;
        }

        self.loading = true;
        Some(RegisterRequest {
            email: self.email.clone(),
            password: self.password.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
        })
    }

    pub fn finish_submit(&mut self, result: ApiResult<Ack>) -> Option<Route> {
        self.loading = false;
        match result {
            Ok(envelope) if envelope.success => {
                tracing::info!("Registered new customer account");
                Some(Route::Login)
            }
            Ok(envelope) => {
                self.error = Some(envelope.message_or(REGISTRATION_FAILED));
                None
            }
            Err(e) => {
                tracing::warn!("Registration request failed: {}", e);
                self.error = Some(UNEXPECTED_ERROR.to_string());
                None
            }
        }
    }
}

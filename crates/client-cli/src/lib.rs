//! packdesk: terminal client for the pack subscription API.
//!
//! The view controllers in [`views`] hold all screen state and talk to the
//! API through [`api::ApiClient`]; [`tui`] only renders them.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod router;
pub mod session;
pub mod tui;
pub mod validation;
pub mod views;

pub use api::ApiClient;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use session::SessionContext;

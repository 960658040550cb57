//! Headless view controllers.
//!
//! Each view owns its form and list state, calls the API, and reports what to
//! show through a [`Notice`]. The TUI only draws them, forwards keys and runs
//! their network work on background tasks.

pub mod admin;
pub mod customer;
pub mod login;
pub mod register;

pub use admin::AdminDashboard;
pub use customer::CustomerDashboard;
pub use login::LoginView;
pub use register::RegisterView;

use std::sync::{Mutex, MutexGuard};

/// Message shown for transport or decode failures
pub const UNEXPECTED_ERROR: &str = "Unexpected error. Please try again.";

/// Lock state shared with background tasks. A panicked task leaves the
/// data as it was, so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// A status line set by a view action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, text: text.into() }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

//! Wire types shared between the packdesk client and its tests.

mod envelope;
mod models;

pub use envelope::Envelope;
pub use models::*;

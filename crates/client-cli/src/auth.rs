//! Account commands that run without the TUI

use anyhow::{bail, Result};
use packdesk::credentials::CredentialStore;
use packdesk::router::Route;
use packdesk::views::RegisterView;
use packdesk::ApiClient;

/// Register a customer account through the same form logic the TUI uses
pub async fn register(
    api: &ApiClient,
    name: String,
    email: String,
    phone: String,
    password: String,
) -> Result<()> {
    let mut view = RegisterView {
        name,
        email,
        phone,
        password,
        ..RegisterView::default()
    };

    match view.submit(api).await {
        Some(Route::Login) => {
            println!("\x1b[1;32m✅ Account created for {}\x1b[0m", view.email);
            println!("Run '\x1b[1mpackdesk\x1b[0m' to sign in.");
            Ok(())
        }
        _ => bail!(
            "{}",
            view.error
                .unwrap_or_else(|| "Registration failed. Please try again.".to_string())
        ),
    }
}

/// Delete the remembered login record, if any
pub fn forget(store: &CredentialStore) -> Result<()> {
    if !store.path().exists() {
        println!("\x1b[33m✗ No remembered login\x1b[0m");
        return Ok(());
    }
    store.clear()?;
    println!("\x1b[32m✅ Remembered login removed\x1b[0m");
    Ok(())
}

//! Terminal front end.
//!
//! Renders the active view controller and maps keys to its actions. Network
//! actions run on background tasks and report back over a channel, so the
//! screen keeps redrawing and taking keys while requests are in flight.

mod app;
mod render;

pub use app::{Action, App, Confirm, Screen};

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

/// Take over the terminal, run `app` until it quits, then restore the terminal
pub async fn run(app: &mut App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

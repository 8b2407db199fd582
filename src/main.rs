use std::io;
use std::sync::Arc;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use bookhub::config::AppConfig;
use bookhub::core::api::{ExchangeApi, HttpExchangeApi};
use bookhub::core::logging::{self, StartupError};
use bookhub::core::query::CacheInvalidator;
use bookhub::core::session::SessionContext;
use bookhub::tui::app::AppState;
use bookhub::tui::services::Services;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let config = AppConfig::load();

    // Initialize logging
    let _log_guard = logging::init(&config.log_dir());
    log::info!("{} v{} starting", bookhub::NAME, bookhub::VERSION);

    let api: Arc<dyn ExchangeApi> = Arc::new(HttpExchangeApi::new(&config.api).map_err(|source| {
        StartupError::Api {
            url: config.api.base_url.clone(),
            source,
        }
    })?);

    let session = SessionContext::new();
    if session.initialize(api.as_ref()).await.is_none() {
        log::warn!("No active session; browsing requires signing in on the web first");
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (invalidator, invalidate_rx) = CacheInvalidator::channel();
    let services = Services::new(api, session, invalidator, config, event_tx);
    let mut app = AppState::new(event_rx, invalidate_rx, services);

    // Setup terminal
    enable_raw_mode().map_err(StartupError::from)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(StartupError::from)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(StartupError::from)?;

    // Run the app
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode().map_err(StartupError::from)?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).map_err(StartupError::from)?;
    terminal.show_cursor().map_err(StartupError::from)?;

    result.map_err(StartupError::from)?;
    log::info!("Shutting down");
    Ok(())
}

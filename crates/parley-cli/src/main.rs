//! `parley` — terminal chat client.
//!
//! # Usage
//!
//! ```
//! parley --config parley.toml
//! parley --data-dir ~/.local/share/parley
//! parley --embedded
//! ```
//!
//! Logs go to `--log-file` (default `parley.log`) so they don't tear the UI;
//! the level is taken from `RUST_LOG`.

mod app;
mod embedded;
mod ui;

use std::{fs::File, io, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parley_core::{
  app::ClientApp,
  config::{DEFAULT_WEB_URL, RawConfig},
  session::SessionController,
};
use parley_store_sqlite::{SqliteAccounts, SqliteStore};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Terminal client for Parley chat")]
struct Args {
  /// Path to the TOML config file (api_key, project_id, app_id, ...).
  #[arg(short, long, value_name = "FILE", default_value = "parley.toml")]
  config: PathBuf,

  /// Directory holding the local database; overrides `data_dir`.
  #[arg(long, value_name = "DIR", env = "PARLEY_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// Open the hosted web client in the platform browser instead of the TUI.
  #[arg(long)]
  embedded: bool,

  /// Where to write logs.
  #[arg(long, value_name = "FILE", default_value = "parley.log")]
  log_file: PathBuf,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let log_file = File::create(&args.log_file)
    .with_context(|| format!("creating log file {}", args.log_file.display()))?;
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_ansi(false)
    .with_writer(Arc::new(log_file))
    .init();

  let mut raw = RawConfig::load(Some(args.config.as_path()))
    .with_context(|| format!("loading config from {}", args.config.display()))?;
  if let Some(dir) = args.data_dir {
    raw.data_dir = Some(dir);
  }

  if args.embedded {
    let url = raw
      .web_url
      .filter(|u| !u.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_WEB_URL.to_string());
    return embedded::open(&url);
  }

  let config = raw.validate().context("invalid configuration")?;
  std::fs::create_dir_all(&config.data_dir)
    .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
  let feed_limit = config.feed_limit;

  let client = ClientApp::initialize(config)?;
  let store = SqliteStore::open(&client)
    .await
    .context("opening message store")?;
  let accounts = SqliteAccounts::open(&client)
    .await
    .context("opening identity provider")?;
  info!(app = client.name(), "client ready");

  let session = SessionController::new(Arc::new(accounts));
  let mut app = App::new(session, store, feed_limit);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Draw the resolving screen once before the persisted session loads.
  let run_result = match terminal.draw(|f| ui::draw(f, &app)) {
    Ok(_) => {
      app.start().await;
      run_event_loop(&mut terminal, &mut app).await
    }
    Err(e) => Err(e).context("drawing frame"),
  };

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting. Feed
    // updates land in the binding's watch channel and show up on the next
    // frame.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event {
      if !app.handle_key(key).await? {
        break;
      }
    }
  }

  Ok(())
}

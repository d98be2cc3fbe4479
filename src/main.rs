// src/main.rs
mod api;
mod config;
mod errors;
mod input;
mod logging;
mod models;
mod theme;
mod ui;

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;

use api::ApiClient;
use config::Settings;
use models::{ConfirmDelete, Filter, Selection, StatusDialog, User};
use theme::Theme;

#[derive(Parser)]
#[command(name = "roster", version, about = "Terminal client for bulk user administration")]
struct Cli {
    /// Override the server URL from the config file
    #[arg(long)]
    server: Option<String>,

    /// API token for the admin endpoints, persisted to the user config
    #[arg(long)]
    token: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::new().context("could not load configuration")?;
    if let Some(server) = cli.server {
        settings.server_url = server;
    }
    if let Some(token) = cli.token {
        config::save_api_token(&token)?;
        settings.api_token = Some(token);
    }

    let _guard = logging::init(&settings)?;
    tracing::info!(server = %settings.server_url, "starting roster");

    let rt = Runtime::new()?;
    let api = Arc::new(ApiClient::new(&settings)?);
    let users = rt
        .block_on(api.fetch_users())
        .with_context(|| format!("could not load users from {}", settings.server_url))?;
    tracing::info!(count = users.len(), "loaded user roster");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, users, &settings, &api, &rt);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut users: Vec<User>,
    settings: &Settings,
    api: &Arc<ApiClient>,
    rt: &Runtime,
) -> anyhow::Result<()> {
    let mut selection = Selection::default();
    let mut cursor = 0usize;
    let mut filter = Filter::default();
    let mut confirm = ConfirmDelete::default();
    let status = Arc::new(Mutex::new(StatusDialog::default()));
    let theme = Theme::default();

    loop {
        terminal.draw(|f| {
            ui::render(
                f,
                &users,
                &selection,
                cursor,
                &filter,
                &confirm,
                &status,
                &theme,
                &settings.server_url,
            );
        })?;

        // A successful delete leaves the roster stale; refetch so every
        // derived state comes from the server's fresh data.
        let stale = {
            let st = status.lock().unwrap();
            st.roster_stale && !st.loading
        };
        if stale {
            status.lock().unwrap().roster_stale = false;
            match rt.block_on(api.fetch_users()) {
                Ok(fresh) => {
                    tracing::info!(count = fresh.len(), "roster reloaded");
                    users = fresh;
                    selection.clear();
                    cursor = 0;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "roster reload failed");
                    status.lock().unwrap().open(format!("Reload failed: {err}"));
                }
            }
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key_event) = event::read()? {
                let keep_running = input::handle_key(
                    key_event.code,
                    &users,
                    &mut selection,
                    &mut cursor,
                    &mut filter,
                    &mut confirm,
                    &status,
                    api,
                    rt,
                )?;
                if !keep_running {
                    break;
                }
            }
        }
    }
    Ok(())
}

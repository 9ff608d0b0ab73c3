mod app;
mod scroll;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;

use app::App;
use client::{ChatClient, IngestClient};
use config::{load_env_file, Endpoints, Settings};
use scholia_core::ChatEngine;

#[cfg(not(debug_assertions))]
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "scholia",
    about = "Terminal chat for a RAG backend, with cited sources"
)]
struct Args {
    /// Chat endpoint URL (overrides environment and settings)
    #[arg(long)]
    chat_url: Option<String>,

    /// Ingestion endpoint URL (overrides environment and settings)
    #[arg(long)]
    ingest_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before parsing args so env-based endpoint overrides apply.
    load_env_file();
    let args = Args::parse();

    // In dev mode, log to a local ./scholia.log recreated on each run; in
    // release mode, to the data dir with daily rotation.
    #[cfg(debug_assertions)]
    let (non_blocking, _guard) = {
        let path = PathBuf::from("./scholia.log");
        let _ = std::fs::remove_file(&path);
        let file = std::fs::File::create(&path)?;
        tracing_appender::non_blocking(file)
    };

    #[cfg(not(debug_assertions))]
    let (non_blocking, _guard) = {
        let log_dir = config::PathManager::log_dir().unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&log_dir)?;
        let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "scholia.log");
        tracing_appender::non_blocking(file_appender)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let settings = Settings::load();
    let endpoints = Endpoints::resolve(args.chat_url, args.ingest_url, &settings);
    tracing::info!(
        "Starting scholia (chat: {}, ingest: {})",
        endpoints.chat,
        endpoints.ingest
    );

    let engine = ChatEngine::new(
        ChatClient::new(endpoints.chat.clone()),
        IngestClient::new(endpoints.ingest.clone()),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(engine, endpoints.chat.clone());

    while !app.should_quit {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        app.drain_engine_events();
        app.tick();

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.scroll.scroll_up(3, app.last_max_scroll);
                    }
                    MouseEventKind::ScrollDown => {
                        app.scroll.scroll_down(3, app.last_max_scroll);
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    Ok(())
}

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use bishop_client::{Conversation, Dispatcher, HttpBackend};
use bishop_config::{Config, ConfigManager};
use bishop_session::{landing, AuthFlow, JsonFileStore, SessionBook, StateStore, TrialGate};

mod app;
mod logging;
mod pages;
mod ui;

use app::{App, Focus, Route};
use pages::SERVICE_PAGES;

#[derive(Parser)]
#[command(name = "bishop")]
#[command(about = "Terminal chat client for the Bishop faith assistant")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, env = "BISHOP_CONFIG", default_value = "~/.bishop/config.json")]
    config: String,

    /// Override backend.base_url for this run
    #[arg(long)]
    base_url: Option<String>,

    /// Override storage.state_file for this run
    #[arg(long)]
    state_file: Option<String>,

    /// Override trial.threshold for this run
    #[arg(long)]
    threshold: Option<u32>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the config file
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Print one value (e.g. backend.base_url, trial.threshold)
    Get { key: String },
    /// Set one value and save
    Set { key: String, value: String },
    /// Write the default config
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
    /// Print the whole config
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path =
        bishop_config::expand_tilde(&cli.config).unwrap_or_else(|| PathBuf::from(&cli.config));

    if let Some(Commands::Config(args)) = &cli.command {
        return handle_config(args, &config_path).await;
    }

    let manager = ConfigManager::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    let mut config = manager.snapshot().await;
    apply_overrides(&mut config, &cli)?;

    let _guard = logging::init(&config.logging)?;
    let mut app = build_app(&config).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Exiting on error: {:?}", err);
        eprintln!("Error: {:?}", err);
    }
    info!("Bye");

    Ok(())
}

/// Command-line flags win over the config file; nothing is written back.
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(base_url) = &cli.base_url {
        config.set_value("backend.base_url", base_url)?;
    }
    if let Some(state_file) = &cli.state_file {
        config.set_value("storage.state_file", state_file)?;
    }
    if let Some(threshold) = cli.threshold {
        config.set_value("trial.threshold", &threshold.to_string())?;
    }
    ConfigManager::validate(config)?;
    Ok(())
}

async fn build_app(config: &Config) -> anyhow::Result<App> {
    let state_path = config
        .storage
        .state_file
        .as_deref()
        .and_then(bishop_config::expand_tilde)
        .or_else(bishop_config::default_state_path)
        .context("Could not determine state file path")?;
    let store = JsonFileStore::open(state_path.clone())
        .await
        .with_context(|| format!("Failed to open state file {:?}", state_path))?;
    let state = StateStore::new(Arc::new(store));

    let backend = HttpBackend::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_seconds),
    )?;

    let threshold = config.trial.threshold;
    let book = SessionBook::load(state.clone()).await?;
    let gate = TrialGate::new(state.clone(), threshold);
    let route = Route::from(landing(&state, threshold).await?);
    info!(
        "Starting on {:?} with {} saved sessions (backend: {})",
        route,
        book.len(),
        backend.base_url()
    );

    let conversation = Conversation::new(book, gate, Dispatcher::new(Arc::new(backend)));
    let mut app = App::new(conversation, AuthFlow::new(state), route);
    app.refresh().await?;
    Ok(app)
}

async fn handle_config(args: &ConfigArgs, config_path: &Path) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Get { key } => {
            let manager = ConfigManager::load(config_path).await?;
            match manager.snapshot().await.get_value(key) {
                Some(value) => println!("{} = {}", key, value),
                None => anyhow::bail!("Key not found: {}", key),
            }
        }
        ConfigCommands::Set { key, value } => {
            let manager = ConfigManager::load(config_path).await?;
            let mut config = manager.snapshot().await;
            config.set_value(key, value)?;
            manager.update(|current| *current = config).await?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                println!("Config already exists at {:?}", config_path);
                println!("Use --force to overwrite");
                return Ok(());
            }
            let manager = ConfigManager::new(Config::default(), config_path.to_path_buf());
            manager.save().await?;
            println!("Config initialized at {:?}", config_path);
        }
        ConfigCommands::Show => {
            let manager = ConfigManager::load(config_path).await?;
            let config = manager.snapshot().await;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    let mut last_tick = tokio::time::Instant::now();
    let tick_rate = tokio::time::Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| tokio::time::Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press {
                    match handle_key_event(app, key).await {
                        Ok(true) => return Ok(()),
                        Ok(false) => {}
                        Err(e) => {
                            error!("Key handling failed: {:?}", e);
                            app.notice = Some(format!("Error: {}", e));
                        }
                    }
                }
            }
        }

        // Replies land here, on the same task that owns the state.
        if let Err(e) = app.on_tick().await {
            error!("Failed to apply reply: {:?}", e);
            app.notice = Some(format!("Error: {}", e));
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = tokio::time::Instant::now();
        }
    }
}

async fn handle_key_event(app: &mut App, key: KeyEvent) -> anyhow::Result<bool> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Ok(true);
    }

    match app.route {
        Route::Chat if app.login_modal_visible() => match key.code {
            KeyCode::Enter => app.open_login(),
            KeyCode::Esc => app.dismiss_login_modal(),
            _ => {}
        },
        Route::Chat => handle_chat_key(app, key, ctrl).await?,
        Route::Login => match key.code {
            KeyCode::Enter => app.submit_phone().await?,
            KeyCode::Esc => app.back_to_chat(),
            KeyCode::Backspace => {
                app.phone_input.pop();
            }
            KeyCode::Char(c) if !ctrl => app.phone_input.push(c),
            _ => {}
        },
        Route::Verify => match key.code {
            KeyCode::Char('r') if ctrl => app.resend_code(),
            KeyCode::Enter => app.submit_code().await?,
            KeyCode::Esc => app.back_to_chat(),
            KeyCode::Backspace => {
                app.code_input.pop();
            }
            KeyCode::Char(c) => app.push_code_digit(c),
            _ => {}
        },
        Route::KidsCorner => match key.code {
            KeyCode::Right | KeyCode::Tab => app.next_kids_tab(),
            KeyCode::Left | KeyCode::BackTab => app.prev_kids_tab(),
            KeyCode::Esc => app.back_to_chat(),
            _ => {}
        },
        Route::ServicePage(_) => match key.code {
            KeyCode::Enter => app.new_chat(),
            KeyCode::Esc => app.back_to_chat(),
            _ => {}
        },
    }
    Ok(false)
}

async fn handle_chat_key(app: &mut App, key: KeyEvent, ctrl: bool) -> anyhow::Result<()> {
    match key.code {
        KeyCode::Char('n') if ctrl => app.new_chat(),
        KeyCode::Char('k') if ctrl => app.open_kids_corner(),
        KeyCode::Char('l') if ctrl => app.open_login(),
        KeyCode::Char('o') if ctrl => app.sign_out().await?,
        KeyCode::F(n @ 2..=6) => {
            if let Some(page) = SERVICE_PAGES.get(usize::from(n) - 2) {
                app.open_service_page(page.key);
            }
        }
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Esc => app.focus = Focus::Input,
        KeyCode::Enter => match app.focus {
            Focus::Input => app.send_message().await?,
            Focus::Sidebar => app.select_session(),
            Focus::Tiles => app.choose_tile().await?,
        },
        KeyCode::Up => app.move_up(),
        KeyCode::Down => app.move_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::Backspace if app.focus == Focus::Input => {
            app.input.pop();
        }
        KeyCode::Char(c) if !ctrl && app.focus == Focus::Input => app.input.push(c),
        _ => {}
    }
    Ok(())
}

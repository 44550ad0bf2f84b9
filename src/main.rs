mod api;
mod config;
mod dashboard;
mod engine;
mod storage;
mod types;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::{DashboardApi, HttpDashboardClient};
use config::{DashboardConfig, SettingsPatch};
use dashboard::{
    actions, render_settings, render_status, value_or_dash, DashboardSession, Poller, TerminalGuard, Theme,
};
use engine::RunModeState;
use storage::LocalStore;
use types::truncate_address;

#[derive(Parser)]
#[command(name = "dicebot-dashboard")]
#[command(version = "0.1.0")]
#[command(about = "Terminal dashboard and control client for the dice betting bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./dashboard.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bot API base URL, overrides the configuration
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Live dashboard with keyboard controls
    Watch,
    /// Print one snapshot with the inferred bot status
    Status,
    /// Start the bot (requires a connected wallet)
    Start,
    /// Stop the bot
    Stop,
    /// Reset the bot's statistics
    ResetStats {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask the bot to re-read wallet balances
    RefreshBalances,
    /// Show or change the betting strategy settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Send a wallet private key to the bot
    Connect {
        /// Private key (0x + 64 hex characters); prompted for when omitted
        #[arg(long)]
        key: Option<String>,
    },
    /// Forget the stored wallet key and stop the bot
    Disconnect,
    /// Show or set the colour theme
    Theme {
        /// light or dark
        theme: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the bot's current settings
    Show,
    /// Change individual settings (percentages are whole numbers)
    Set(SetArgs),
    /// Restore and save the default settings
    ResetDefaults,
}

#[derive(Args)]
struct SetArgs {
    /// Minimum bet, percent of balance
    #[arg(long)]
    min_bet: Option<u32>,
    /// Maximum bet, percent of balance
    #[arg(long)]
    max_bet: Option<u32>,
    /// Win streak rate, percent
    #[arg(long)]
    win_streak_rate: Option<u32>,
    /// Loss recovery rate, percent
    #[arg(long)]
    loss_recovery: Option<u32>,
    /// Games without a 69 before chasing it
    #[arg(long)]
    chase_threshold: Option<u32>,
    /// Bet multiplier while chasing 69
    #[arg(long)]
    chase_multiplier: Option<Decimal>,
    /// Win sensitivity, percent
    #[arg(long)]
    win_sensitivity: Option<u32>,
    /// Loss sensitivity, percent
    #[arg(long)]
    loss_sensitivity: Option<u32>,
    /// Number of recent games the strategy tracks
    #[arg(long)]
    max_track_games: Option<u32>,
}

impl From<SetArgs> for SettingsPatch {
    fn from(args: SetArgs) -> Self {
        SettingsPatch {
            min_bet_pct: args.min_bet,
            max_bet_pct: args.max_bet,
            win_streak_rate_pct: args.win_streak_rate,
            loss_recovery_pct: args.loss_recovery,
            chase_threshold: args.chase_threshold,
            chase_multiplier: args.chase_multiplier,
            win_sensitivity_pct: args.win_sensitivity,
            loss_sensitivity_pct: args.loss_sensitivity,
            max_track_games: args.max_track_games,
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat, live_view: bool) -> Result<()> {
    // The live view owns the terminal, so only errors get through by default.
    let default_level = match (verbose, live_view) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

/// Everything a command needs: config, API client, local store and a
/// session seeded from the stored run mode and theme.
struct Context {
    config: DashboardConfig,
    api: Arc<dyn DashboardApi>,
    store: LocalStore,
    session: DashboardSession,
}

impl Context {
    fn open(config: DashboardConfig) -> Result<Self> {
        let client = HttpDashboardClient::new(&config.api)?;
        info!("Talking to bot at {}", client.base_url());
        let api: Arc<dyn DashboardApi> = Arc::new(client);
        let store = LocalStore::open(&config.storage.path, &config.storage.session_dir())?;
        let run = RunModeState::new(store.run_mode()?);
        let session = DashboardSession::new(&config.polling, run, store.theme()?);
        Ok(Self {
            config,
            api,
            store,
            session,
        })
    }

    /// Fetches a snapshot; when the bot does not report a wallet, the stored
    /// credential is sent again. The reconnect is attempted even when the
    /// snapshot fails; the first error is returned afterwards.
    async fn sync(&mut self) -> Result<()> {
        let stats = actions::refresh_stats(self.api.as_ref(), &mut self.session).await;
        match &stats {
            Ok(false) => info!("Bot has not reported a balance yet"),
            Ok(true) => {}
            Err(err) => warn!(%err, "stats fetch failed"),
        }
        if !self.session.wallet_connected()
            && actions::reconnect(self.api.as_ref(), &self.store, &mut self.session).await?
        {
            info!("Reconnected stored wallet");
        }
        stats.map(|_| ())
    }

    fn print_status(&self) {
        for line in render_status(&self.session, &self.config.display) {
            println!("{}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format, matches!(cli.command, Commands::Watch))?;

    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
        config
            .validate()
            .map_err(|errors| anyhow!("invalid configuration: {}", errors.join(", ")))?;
    }

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("Dice bot dashboard v0.1.0");
    let mut ctx = Context::open(config)?;

    match cli.command {
        Commands::Watch => run_watch(ctx).await?,
        Commands::Status => {
            ctx.sync().await?;
            if let Err(err) = actions::load_settings(ctx.api.as_ref(), &mut ctx.session).await {
                warn!(%err, "settings unavailable");
            }
            ctx.print_status();
        }
        Commands::Start => {
            run_start(&mut ctx).await?;
            println!("Bot started");
        }
        Commands::Stop => {
            actions::stop(ctx.api.as_ref(), &ctx.store, &mut ctx.session).await?;
            println!("Bot stopping");
        }
        Commands::ResetStats { yes } => {
            if !yes && !confirm("Reset all statistics? [y/N] ")? {
                println!("Cancelled");
                return Ok(());
            }
            actions::reset_stats(ctx.api.as_ref(), &mut ctx.session).await?;
            println!("Statistics reset");
        }
        Commands::RefreshBalances => {
            actions::refresh_balances(ctx.api.as_ref(), &mut ctx.session).await?;
            let snap = &ctx.session.snapshot;
            println!("\n=== Balances ===");
            println!("Balance: {} 🍌", value_or_dash(snap.current_balance.as_ref()));
            println!("S: {}", value_or_dash(snap.s_token_balance.as_ref()));
        }
        Commands::Settings { action } => run_settings(&mut ctx, action).await?,
        Commands::Connect { key } => {
            let key = match key {
                Some(key) => key,
                None => rpassword::prompt_password("Private key: ")?,
            };
            actions::connect_wallet(ctx.api.as_ref(), &ctx.store, &mut ctx.session, &key).await?;
            let address = ctx
                .session
                .wallet
                .as_ref()
                .and_then(|w| w.address.as_deref())
                .map(truncate_address)
                .unwrap_or_else(|| "unknown address".to_string());
            println!("Wallet connected: {}", address);
        }
        Commands::Disconnect => {
            actions::disconnect(ctx.api.as_ref(), &ctx.store, &mut ctx.session).await?;
            println!("Wallet disconnected");
        }
        Commands::Theme { theme } => match theme {
            Some(raw) => {
                let theme: Theme = raw.parse().map_err(|e: String| anyhow!(e))?;
                ctx.store.store_theme(theme)?;
                println!("Theme set to {}", theme);
            }
            None => println!("{}", ctx.store.theme()?),
        },
        Commands::Config => unreachable!("handled before the context is opened"),
    }

    Ok(())
}

/// A failed snapshot does not stop the start: the stored wallet is still
/// re-sent and the start request still goes out.
async fn run_start(ctx: &mut Context) -> Result<()> {
    if let Err(err) = ctx.sync().await {
        warn!(%err, "continuing without a fresh snapshot");
    }
    actions::start(ctx.api.as_ref(), &ctx.store, &mut ctx.session).await
}

async fn run_watch(mut ctx: Context) -> Result<()> {
    if let Err(err) = ctx.sync().await {
        warn!(%err, "initial sync failed");
        ctx.session.alert = Some(err.to_string());
    }
    if let Err(err) = actions::load_settings(ctx.api.as_ref(), &mut ctx.session).await {
        warn!(%err, "settings unavailable");
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let terminal = TerminalGuard::enter()?;
    let reader = dashboard::spawn_key_reader(tx);

    let poller = Poller::new(
        Arc::clone(&ctx.api),
        ctx.store.clone(),
        ctx.session,
        &ctx.config.polling,
        ctx.config.display.clone(),
    );
    let result = poller.run(&terminal, rx).await;

    drop(terminal);
    if reader.join().is_err() {
        warn!("key reader thread panicked");
    }

    let session = result?;
    println!("Dashboard closed ({})", session.run.mode());
    Ok(())
}

async fn run_settings(ctx: &mut Context, action: SettingsAction) -> Result<()> {
    let current = actions::load_settings(ctx.api.as_ref(), &mut ctx.session).await?;

    let patch = match action {
        SettingsAction::Show => {
            println!("\n=== Strategy Settings ===");
            for line in render_settings(&current) {
                println!("{}", line);
            }
            return Ok(());
        }
        SettingsAction::Set(args) => {
            let patch = SettingsPatch::from(args);
            if patch.is_empty() {
                bail!("No settings given; see `settings set --help`");
            }
            Some(patch)
        }
        SettingsAction::ResetDefaults => None,
    };

    let editor = ctx
        .session
        .settings
        .as_mut()
        .ok_or_else(|| anyhow!("Settings have not been loaded"))?;
    match patch {
        Some(patch) => editor.apply(&patch).map_err(|e| anyhow!(e))?,
        None => editor.reset_defaults(),
    }

    let saved = actions::save_settings(ctx.api.as_ref(), &mut ctx.session).await?;
    println!("Bot settings updated successfully");
    for line in render_settings(&saved) {
        println!("{}", line);
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

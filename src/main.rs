use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use stiletto_bot::application::errors::{BotError, ConfigError};
use stiletto_bot::application::messaging::CommandRouter;
use stiletto_bot::application::moderation::{ModerationEngine, SpamSignatures, ViolationLedger};
use stiletto_bot::application::resources::ResourceGovernor;
use stiletto_bot::application::services::MessageService;
use stiletto_bot::application::supervisor::{ConnectionSupervisor, ShutdownSignal};
use stiletto_bot::domain::entities::{CredentialHandle, Session};
use stiletto_bot::infrastructure::adapters::console::ConsoleConnector;
use stiletto_bot::infrastructure::config::Config;
use stiletto_bot::plugins::builtin_registry;

#[derive(Parser)]
#[command(name = "stiletto-bot")]
#[command(about = "Session supervisor for a moderated group chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Owner id (overrides config and BOT_OWNER_ID)
    #[arg(short, long)]
    owner: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run => {
            let (mut config, load_warning) = load_config(&cli.config);
            if let Some(owner) = cli.owner {
                config.bot.owner = owner;
            }
            init_logging(cli.debug || config.bot.debug);
            if let Some(warning) = load_warning {
                tracing::warn!("{}", warning);
            }

            match run_bot(config) {
                Ok(()) => 0,
                Err(e) => {
                    tracing::error!("Bot stopped: {}", e);
                    1
                }
            }
        }
        Commands::Version => {
            println!("stiletto-bot v{}", env!("CARGO_PKG_VERSION"));
            0
        }
        Commands::InitConfig => match Config::default().to_yaml() {
            Ok(yaml) => {
                println!("{}", yaml);
                println!("\nSave this to config.yaml and adjust as needed.");
                0
            }
            Err(e) => {
                eprintln!("Failed to render config: {}", e);
                1
            }
        },
    };

    std::process::exit(code);
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// File config (or defaults) with environment overrides. Load failures fall
/// back to defaults and are reported once logging is up.
fn load_config(path: &str) -> (Config, Option<String>) {
    if !Path::new(path).exists() {
        return (Config::load_env(), None);
    }
    match Config::load(path) {
        Ok(mut config) => {
            config.apply_env();
            (config, None)
        }
        Err(e) => (
            Config::load_env(),
            Some(format!("Failed to load config: {}, using defaults", e)),
        ),
    }
}

fn run_bot(config: Config) -> Result<(), BotError> {
    config.validate()?;
    if !config.adapters.console.enabled {
        return Err(ConfigError::InvalidValue("no transport adapter enabled".to_string()).into());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(supervise(config));
    // a pending stdin read cannot be cancelled
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn supervise(config: Config) -> Result<(), BotError> {
    tracing::info!("Starting stiletto-bot: {}", config.bot.name);
    if config.bot.owner.is_empty() {
        tracing::warn!("No owner configured; owner commands are disabled");
    }

    let (shutdown, shutdown_rx) = ShutdownSignal::channel();

    let governor = Arc::new(ResourceGovernor::new(config.resource_limits()));

    let moderation = if config.moderation.enabled {
        Arc::new(ModerationEngine::new(
            SpamSignatures::new().with_phrases(config.moderation.spam_phrases.iter().cloned()),
            ViolationLedger::new(config.violation_ttl()),
            config.escalation_policy(),
        ))
    } else {
        tracing::info!("Moderation disabled");
        Arc::new(ModerationEngine::disabled())
    };
    let sweeper = moderation.spawn_sweeper(Duration::from_millis(config.moderation.sweep_interval_ms));

    let registry = builtin_registry(&config.bot.prefix, shutdown.clone())?;
    tracing::info!("Registered {} commands", registry.len());
    let router = CommandRouter::new(config.bot.prefix.clone(), config.bot.owner.clone(), Arc::new(registry))
        .with_governor(governor);
    let service = Arc::new(MessageService::new(moderation, Arc::new(router)));

    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            interrupt.trigger();
        }
    });

    let connector = ConsoleConnector::stdin(config.adapters.console.clone(), shutdown);
    let session = Session::new(CredentialHandle::new(&config.connection.auth_dir));
    let supervisor = ConnectionSupervisor::new(
        connector,
        config.reconnect_policy(),
        session,
        service,
        shutdown_rx,
    );

    let result = supervisor.run().await;
    sweeper.abort();
    result?;

    tracing::info!("Stopped cleanly");
    Ok(())
}

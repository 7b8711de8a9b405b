use clap::{Parser, Subcommand};
use lib::channels::TelegramClient;
use lib::config::{self, Settings};

#[derive(Parser)]
#[command(name = "recicla")]
#[command(about = "Recicla CLI — classify waste photos sent to a Telegram bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook listener. Every POST is handled as a Telegram update: the photo is downloaded, classified, and answered in the chat.
    Serve {
        /// Config file path (default: RECICLA_CONFIG_PATH or ~/.recicla/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listener port (default: PORT env, then config, then 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Manage the bot's webhook registration with Telegram.
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Point the bot's webhook at a public URL (setWebhook).
    Set {
        /// Public HTTPS URL Telegram should POST updates to
        #[arg(long)]
        url: String,

        /// Config file path (default: RECICLA_CONFIG_PATH or ~/.recicla/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Remove the bot's webhook (deleteWebhook).
    Delete {
        /// Config file path (default: RECICLA_CONFIG_PATH or ~/.recicla/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match command_or_default(cli.command) {
        Commands::Version => {
            println!("recicla {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Serve { config, port } => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Webhook { action } => {
            if let Err(e) = run_webhook(action).await {
                log::error!("webhook failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

/// No subcommand means serve with the default config and env.
fn command_or_default(command: Option<Commands>) -> Commands {
    command.unwrap_or(Commands::Serve {
        config: None,
        port: None,
    })
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (config, path) = config::load_config(config_path)?;
    log::debug!("config loaded from {}", path.display());
    let mut settings = Settings::resolve(&config)?;
    if let Some(p) = port {
        settings.port = p;
    }
    log::info!("starting gateway on {}", settings.bind_addr());
    lib::gateway::run_gateway(settings).await
}

async fn run_webhook(action: WebhookAction) -> anyhow::Result<()> {
    let config_path = match &action {
        WebhookAction::Set { config, .. } | WebhookAction::Delete { config } => config.clone(),
    };
    let (config, _) = config::load_config(config_path)?;
    let token = config::resolve_telegram_token(&config).ok_or_else(|| {
        anyhow::anyhow!(
            "telegram.botToken or {} is required",
            config::ENV_BOT_TOKEN
        )
    })?;
    let telegram = TelegramClient::new(token, config::resolve_telegram_api_base(&config));

    match action {
        WebhookAction::Set { url, .. } => {
            telegram.set_webhook(&url).await.map_err(anyhow::Error::msg)?;
            println!("webhook set to {}", url);
        }
        WebhookAction::Delete { .. } => {
            telegram.delete_webhook().await.map_err(anyhow::Error::msg)?;
            println!("webhook removed");
        }
    }
    Ok(())
}

// Command-line front end for the Gölbucks API client

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use golbucks_client::models::{EventFilter, LoginInput, PageQuery, RegisterInput};
use golbucks_client::{
    ApiClient, ApiError, ClientConfig, KeyringStore, Preferences, SecretStore, TokenBackend,
    TokenStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "golbucks")]
#[command(about = "Gölbucks citizen-services client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        /// Falls back to GOLBUCKS_PASSWORD
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        /// Falls back to GOLBUCKS_PASSWORD
        #[arg(short, long)]
        password: Option<String>,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show whether a session is stored
    Status,

    /// Show the signed-in user
    Me,

    /// Show the Gölbucks balance
    Balance,

    /// List Gölbucks transactions
    Transactions {
        #[command(flatten)]
        page: PageArgs,
    },

    /// List events
    Events {
        #[arg(short, long)]
        category: Option<String>,

        /// Only events that have not started yet
        #[arg(short, long)]
        upcoming: bool,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List news
    News {
        #[arg(short, long)]
        category: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List rewards in the marketplace
    Rewards {
        #[arg(short, long)]
        category: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List open surveys
    Surveys {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Daily Gölbucks reward
    DailyReward {
        #[command(subcommand)]
        action: DailyRewardAction,
    },
}

#[derive(Subcommand)]
enum DailyRewardAction {
    /// Claim today's reward
    Claim,
    /// Show streak and next claim time
    Status,
}

#[derive(clap::Args)]
struct PageArgs {
    #[arg(short, long)]
    limit: Option<u32>,

    #[arg(short, long)]
    offset: Option<u32>,
}

impl From<PageArgs> for PageQuery {
    fn from(args: PageArgs) -> Self {
        PageQuery {
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "golbucks_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    debug!(api_url = %config.api_url, "Loaded configuration");

    let preferences = Arc::new(Preferences::in_dir(&config.data_dir));
    let backend: Arc<dyn SecretStore> = match config.token_backend {
        TokenBackend::Keyring => Arc::new(KeyringStore::new(config.keyring_service.clone())),
        TokenBackend::File => preferences.clone(),
    };
    let tokens = Arc::new(TokenStore::new(backend));
    tokens.initialize();

    let client = ApiClient::new(&config, tokens)?.with_preferences(preferences.clone());

    match run(&client, cli.command).await {
        Ok(()) => Ok(()),
        Err(Failure::Api(e)) => Err(anyhow!(e.user_message(preferences.language()))),
        Err(Failure::Other(e)) => Err(e),
    }
}

enum Failure {
    Api(ApiError),
    Other(anyhow::Error),
}

impl From<ApiError> for Failure {
    fn from(e: ApiError) -> Self {
        Failure::Api(e)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Other(e)
    }
}

async fn run(client: &ApiClient, command: Commands) -> Result<(), Failure> {
    match command {
        Commands::Login { email, password } => {
            let input = LoginInput {
                email,
                password: password_or_env(password)?,
            };
            print_json(&client.auth().login(&input).await?)
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            let input = RegisterInput {
                email,
                password: password_or_env(password)?,
                first_name,
                last_name,
                phone,
            };
            print_json(&client.auth().register(&input).await?)
        }
        Commands::Logout => {
            client.auth().logout();
            println!("Signed out");
            Ok(())
        }
        Commands::Status => {
            let tokens = client.tokens();
            let user = client.preferences().and_then(|p| p.user());
            print_json(&serde_json::json!({
                "authenticated": tokens.is_authenticated(),
                "expiresAt": tokens.expires_at(),
                "expired": tokens.is_expired(chrono::Utc::now()),
                "user": user,
            }))
        }
        Commands::Me => print_json(&client.auth().me().await?),
        Commands::Balance => print_json(&client.users().golbucks().await?),
        Commands::Transactions { page } => {
            print_json(&client.users().transactions(page.into()).await?.items)
        }
        Commands::Events {
            category,
            upcoming,
            page,
        } => {
            let filter = EventFilter {
                category,
                upcoming_only: upcoming,
                page: page.into(),
            };
            print_json(&client.events().list(&filter).await?.items)
        }
        Commands::News { category, page } => print_json(
            &client
                .news()
                .list(category.as_deref(), page.into())
                .await?
                .items,
        ),
        Commands::Rewards { category, page } => print_json(
            &client
                .rewards()
                .list(category.as_deref(), page.into())
                .await?
                .items,
        ),
        Commands::Surveys { page } => print_json(&client.surveys().list(page.into()).await?.items),
        Commands::DailyReward { action } => match action {
            DailyRewardAction::Claim => print_json(&client.daily_reward().claim().await?),
            DailyRewardAction::Status => print_json(&client.daily_reward().status().await?),
        },
    }
}

fn password_or_env(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => std::env::var("GOLBUCKS_PASSWORD")
            .map_err(|_| anyhow!("Pass --password or set GOLBUCKS_PASSWORD")),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Failure> {
    let text = serde_json::to_string_pretty(value).map_err(anyhow::Error::from)?;
    println!("{text}");
    Ok(())
}

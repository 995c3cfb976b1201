
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use wellness_session::config::{ClientConfig, ConfigError};
use wellness_session::context::ExecutionContext;
use wellness_session::net::api::HttpAuthApi;
use wellness_session::net::error::ApiError;
use wellness_session::net::types::{ProfilePatch, UserProfile};
use wellness_session::services::auth::{AuthFlows, FlowError, RegistrationForm};
use wellness_session::state::session::{ProfileUpdate, SessionCoordinator};
use wellness_session::util::storage::FileStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client setup failed: {0}")]
    Client(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Flow(#[from] FlowError),
    #[error("password reset failed: {0}")]
    Reset(String),
    #[error("not logged in; run `wellness login` first")]
    NotLoggedIn,
    #[error("profile changed while the request was in flight; try again")]
    Stale,
    #[error("nothing to update; pass at least one field")]
    EmptyPatch,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "wellness", about = "Wellness tracker account and session CLI")]
struct Cli {
    #[arg(long, env = "WELLNESS_STORE_DIR", default_value = ".wellness")]
    store_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(Credentials),
    Register {
        #[command(flatten)]
        credentials: Credentials,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },
    Logout,
    Status,
    Token,
    Profile(ProfileCommand),
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        uid: String,
        token: String,
        #[arg(long, env = "WELLNESS_PASSWORD")]
        password: String,
    },
    DeleteAccount {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Export,
}

#[derive(Args, Debug)]
struct Credentials {
    email: String,
    #[arg(long, env = "WELLNESS_PASSWORD")]
    password: String,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Show,
    Refresh,
    Update(ProfileUpdateArgs),
}

#[derive(Args, Debug)]
struct ProfileUpdateArgs {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long, help = "Weight in kilograms")]
    weight: Option<f64>,
    #[arg(long, help = "Height in centimeters")]
    height: Option<f64>,
    #[arg(long)]
    activity_level: Option<String>,
    #[arg(long)]
    health_goal: Option<String>,
    #[arg(long)]
    wants_newsletter: Option<bool>,
}

impl From<ProfileUpdateArgs> for ProfilePatch {
    fn from(args: ProfileUpdateArgs) -> Self {
        Self {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            age: args.age,
            gender: args.gender,
            weight: args.weight,
            height: args.height,
            activity_level: args.activity_level,
            health_goal: args.health_goal,
            wants_newsletter: args.wants_newsletter,
        }
    }
}

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "warn";

fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let api = Arc::new(HttpAuthApi::new(&config)?);
    tracing::debug!(api_url = api.base_url(), store = %cli.store_dir.display(), "starting");

    let store = Arc::new(FileStore::in_dir(&cli.store_dir));
    let session = SessionCoordinator::builder(store, api.clone())
        .config(config)
        .context(ExecutionContext::Interactive)
        .build();
    session.initialize().await;
    let flows = AuthFlows::new(api, session);

    run(&flows, cli.command).await
}

async fn run(flows: &AuthFlows, command: Command) -> Result<(), CliError> {
    let session = flows.session();
    match command {
        Command::Login(credentials) => {
            let profile = flows.login_with_password(&credentials.email, &credentials.password).await?;
            println!("logged in as {}", profile.display_name().unwrap_or_default());
        }
        Command::Register { credentials, username, first_name, last_name } => {
            let form = RegistrationForm {
                email: credentials.email,
                confirm_password: credentials.password.clone(),
                password: credentials.password,
                username: username.unwrap_or_default(),
                first_name,
                last_name,
            };
            let profile = flows.register(&form).await?;
            println!("registered {}", profile.display_name().unwrap_or_default());
        }
        Command::Logout => {
            flows.logout().await;
            println!("logged out");
        }
        Command::Status => {
            let state = session.snapshot();
            if state.logged_in {
                let name = state.user.and_then(|u| u.display_name()).unwrap_or_default();
                println!("logged in as {name}");
            } else {
                println!("logged out");
            }
        }
        Command::Token => {
            let token = session.auth_token().ok_or(CliError::NotLoggedIn)?;
            println!("{token}");
        }
        Command::Profile(profile) => run_profile(flows, profile.command).await?,
        Command::ChangePassword { current, new } => {
            flows.change_password(&current, &new, &new).await?;
            println!("password changed");
        }
        Command::ForgotPassword { email } => {
            let message = flows.forgot_password(&email).await?;
            println!("{}", message.unwrap_or_else(|| "reset link requested".to_owned()));
        }
        Command::ResetPassword { uid, token, password } => {
            match flows.reset_password(&uid, &token, &password, &password).await {
                Ok(profile) => println!("password reset; logged in as {}", profile.display_name().unwrap_or_default()),
                Err(FlowError::Api(e)) => return Err(CliError::Reset(e.reset_password_message())),
                Err(e) => return Err(e.into()),
            }
        }
        Command::DeleteAccount { yes } => {
            if !yes {
                println!("refusing to delete the account without --yes");
                return Ok(());
            }
            flows.delete_account().await?;
            println!("account deleted");
        }
        Command::Export => {
            let data = flows.export_user_data().await?;
            print_json(&data)?;
        }
    }
    Ok(())
}

async fn run_profile(flows: &AuthFlows, command: ProfileSubcommand) -> Result<(), CliError> {
    let outcome = match command {
        ProfileSubcommand::Show => {
            let profile = flows.session().current_user().ok_or(CliError::NotLoggedIn)?;
            return print_profile(&profile);
        }
        ProfileSubcommand::Refresh => flows.refresh_profile().await?,
        ProfileSubcommand::Update(args) => {
            let patch = ProfilePatch::from(args);
            if patch.is_empty() {
                return Err(CliError::EmptyPatch);
            }
            flows.update_profile(&patch).await?
        }
    };
    match outcome {
        ProfileUpdate::Applied(profile) => print_profile(&profile),
        ProfileUpdate::Stale => Err(CliError::Stale),
        ProfileUpdate::NoToken => Err(CliError::NotLoggedIn),
    }
}

fn print_profile(profile: &UserProfile) -> Result<(), CliError> {
    print_json(&serde_json::to_value(profile)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

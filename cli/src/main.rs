use std::sync::Arc;

use clap::{Parser, Subcommand};
use mentorlink_client::config::ClientConfig;
use mentorlink_client::error::{ApiError, ConfigError, ErrorCode};
use mentorlink_client::net::api::ApiClient;
use mentorlink_client::net::types::{MePayload, Role};
use mentorlink_client::shell::AppShell;
use mentorlink_client::state::auth::AuthStore;
use mentorlink_client::state::session::SessionMachine;
use mentorlink_client::store::credentials::CredentialStore;
use mentorlink_client::store::persist::FileStore;
use mentorlink_client::util::guard::{GuardOutcome, RouteGuard};
use serde_json::{Value, json};


const SESSION_FILE: &str = ".mentorlink/session.json";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("missing --{0} (or pass --data)")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("access to {path} denied; redirected to {to}")]
    Redirected { path: String, to: String },
}

#[derive(Parser, Debug)]
#[command(name = "mentorlink", about = "Mentoring platform API client")]
struct Cli {
    #[arg(long, env = "MENTORLINK_API_BASE_URL", default_value = mentorlink_client::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and persist the returned credentials.
    Login {
        #[arg(long, default_value = "email")]
        method: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Raw JSON body for non-email login methods.
        #[arg(long)]
        data: Option<String>,
    },
    /// Ask the server who the stored credentials belong to.
    Whoami,
    /// Show the locally persisted login without contacting the server.
    Status,
    /// Authenticated GET of an arbitrary API path.
    Get { path: String },
    /// Navigate to a role-restricted view.
    Visit {
        #[arg(long, value_parser = parse_role)]
        role: Role,
        path: String,
    },
    Logout,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::parse(raw).ok_or_else(|| format!("unknown role `{raw}` (expected MENTOR or MENTEE)"))
}

/// Terminal stand-in for the browser shell: redirects and reloads are reported
/// on stderr. State survives a "reload" through the session file.
struct ConsoleShell;

impl AppShell for ConsoleShell {
    fn reload(&self) {
        eprintln!("session ended; please log in again");
    }

    fn redirect(&self, to: &str) {
        eprintln!("-> {to}");
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &CliError) -> i32 {
    match error {
        CliError::Api(e) if e.retryable() => 3,
        CliError::Api(e) if e.is_auth_failure() => 2,
        CliError::Redirected { .. } => 2,
        _ => 1,
    }
}

fn connect(base_url: &str) -> Result<ApiClient, CliError> {
    let config = ClientConfig::new(base_url)?;
    let store = Arc::new(FileStore::open(SESSION_FILE));
    let auth = AuthStore::new(CredentialStore::new(store));
    Ok(ApiClient::connect(&config, auth, Arc::new(ConsoleShell))?)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let api = connect(&cli.base_url)?;
    match cli.command {
        Command::Login { method, email, password, data } => {
            let body = login_body(&method, email, password, data.as_deref())?;
            let identity = api.login(&method, body).await?;
            println!("logged in as {} ({})", identity.display_name, identity.role);
            Ok(())
        }
        Command::Whoami => {
            match api.who_am_i().await? {
                MePayload::Identity(identity) => print_json(&json!({
                    "nickname": identity.display_name,
                    "role": identity.role.as_str(),
                    "email": identity.email,
                })),
                MePayload::NoSession | MePayload::Invalid => print_json(&json!({ "authenticated": false })),
            }
        }
        Command::Status => {
            let snapshot = api.auth().check_login();
            print_json(&json!({
                "isLoggedIn": snapshot.is_logged_in,
                "role": snapshot.role.map(Role::as_str),
                "nickname": snapshot.nickname,
            }))
        }
        Command::Get { path } => {
            let value = api.get_json::<Value>(&path).await?;
            print_json(&value)
        }
        Command::Visit { role, path } => run_visit(api, role, path).await,
        Command::Logout => {
            api.logout().await?;
            println!("logged out");
            Ok(())
        }
    }
}

async fn run_visit(api: ApiClient, role: Role, path: String) -> Result<(), CliError> {
    let guard = RouteGuard::new(role, SessionMachine::new(api), Arc::new(ConsoleShell));
    match guard.navigate(&path).await {
        GuardOutcome::Redirected(to) => Err(CliError::Redirected { path, to }),
        GuardOutcome::Allowed | GuardOutcome::Pending | GuardOutcome::Superseded => {
            if guard.render(|| println!("{path}: access granted ({role})")).is_none() {
                tracing::warn!(path = %path, "guard did not settle");
            }
            Ok(())
        }
    }
}

fn login_body(
    method: &str,
    email: Option<String>,
    password: Option<String>,
    data: Option<&str>,
) -> Result<Value, CliError> {
    if let Some(raw) = data {
        return Ok(serde_json::from_str(raw)?);
    }
    if method != "email" {
        return Err(CliError::MissingField("data"));
    }
    let email = email.ok_or(CliError::MissingField("email"))?;
    let password = password.ok_or(CliError::MissingField("password"))?;
    Ok(json!({ "email": email, "password": password }))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

//! sessionkit CLI - a thin driver for the session lifecycle.
//!
//! Commands: `login [username]`, `status`, `get <path>`, `logout`.
//! The issuer base URL comes from `SESSIONKIT_BASE_URL` or the config
//! file; the session persists across invocations in the cache directory
//! (or the OS keychain when `secure_storage` is set).

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sessionkit_core::auth::{FileBackend, KeyringBackend};
use sessionkit_core::{require_session, ApiClient, ApiError, Config, SessionStore};

/// Keychain service/account for the secure storage backend
const KEYRING_SERVICE: &str = "sessionkit";
const KEYRING_ACCOUNT: &str = "session";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() {
    eprintln!("Usage: sessionkit <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login [username]   Exchange credentials for a session");
    eprintln!("  status             Show whether a session is present");
    eprintln!("  get <path>         Fetch a protected resource");
    eprintln!("  logout             Discard the session");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::load()?;
    let store = Arc::new(open_store(&config)?);

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("login") => login(&config, &store, args.get(2).map(String::as_str)).await,
        Some("status") => status(&store),
        Some("get") => match args.get(2) {
            Some(path) => get(&config, &store, path).await,
            None => {
                usage();
                std::process::exit(2);
            }
        },
        Some("logout") => {
            store.clear()?;
            println!("Logged out.");
            Ok(())
        }
        _ => {
            usage();
            std::process::exit(2);
        }
    }
}

/// Open the session store on the configured backend and pick up any
/// persisted session.
fn open_store(config: &Config) -> Result<SessionStore> {
    let store = if config.secure_storage {
        SessionStore::new(Box::new(KeyringBackend::new(KEYRING_SERVICE, KEYRING_ACCOUNT)))
    } else {
        SessionStore::new(Box::new(FileBackend::new(Config::cache_dir()?)))
    };

    if let Err(err) = store.load() {
        warn!(error = %err, "Could not load saved session, starting logged out");
    }
    Ok(store)
}

fn api_client(config: &Config, store: &Arc<SessionStore>) -> Result<ApiClient> {
    let base_url = config.base_url().ok_or_else(|| {
        anyhow!("No issuer configured; set SESSIONKIT_BASE_URL or base_url in config.json")
    })?;
    ApiClient::new(base_url, Arc::clone(store))
}

async fn login(config: &Config, store: &Arc<SessionStore>, username: Option<&str>) -> Result<()> {
    let client = api_client(config, store)?;

    let username = match username {
        Some(name) => name.to_string(),
        None => prompt_username(config.last_username.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    match client.login(&username, &password).await {
        Ok(()) => {
            let mut config = config.clone();
            config.last_username = Some(username);
            config.save()?;
            println!("Logged in.");
            Ok(())
        }
        Err(err) if matches!(err.downcast_ref::<ApiError>(), Some(ApiError::InvalidCredentials)) => {
            eprintln!("Invalid username or password.");
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn status(store: &SessionStore) -> Result<()> {
    let outcome = require_session(store, || store.current());
    match outcome.into_inner().flatten() {
        Some(session) => {
            println!("Logged in ({}m since login)", session.age_minutes());
            if session.refreshed_at.is_some() {
                println!("Access credential has been refreshed this session.");
            }
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

async fn get(config: &Config, store: &Arc<SessionStore>, path: &str) -> Result<()> {
    let client = api_client(config, store)?;

    match client.get_text(path).await {
        Ok(body) => {
            println!("{}", body);
            Ok(())
        }
        Err(err) if matches!(err.downcast_ref::<ApiError>(), Some(ApiError::SessionExpired)) => {
            eprintln!("Session expired - please log in again.");
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(name) => print!("Username [{}]: ", name),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let entered = line.trim();

    if entered.is_empty() {
        default
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Username is required"))
    } else {
        Ok(entered.to_string())
    }
}

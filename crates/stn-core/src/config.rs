use std::{env, fs, net::SocketAddr, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Which record store backs the registry and the article archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

/// Typed configuration for the relay.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_api_url: Option<String>,

    // HTTP
    pub listen_addr: SocketAddr,
    pub public_url: String,
    pub max_upload_bytes: usize,

    // Storage
    pub store: StoreBackend,
    pub db_path: PathBuf,
    pub article_db_path: PathBuf,

    // Inline prompts
    pub prompt_ttl: Duration,
    pub max_pending_prompts: usize,

    // Logging
    pub verbose: bool,
    /// Extra plain-text copy of the log, appended to this file.
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        let telegram_api_url = lookup("TELEGRAM_API_URL").and_then(non_empty);

        let listen_raw = lookup("STN_LISTEN_ADDR").unwrap_or("0.0.0.0:8080".to_string());
        let listen_addr = listen_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid STN_LISTEN_ADDR {listen_raw:?}: {e}")))?;

        let public_url = lookup("STN_PUBLIC_URL")
            .and_then(non_empty)
            .unwrap_or("http://localhost:8080".to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let max_upload_bytes = parse_usize(lookup("STN_MAX_UPLOAD_BYTES")).unwrap_or(50 * 1024 * 1024);

        let store = match lookup("STN_STORE")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("") | Some("sqlite") => StoreBackend::Sqlite,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(Error::Config(format!(
                    "STN_STORE must be `sqlite` or `memory`, got {other:?}"
                )))
            }
        };
        let db_path = PathBuf::from(lookup("STN_DB_PATH").unwrap_or("subscriptions.db".to_string()));
        let article_db_path =
            PathBuf::from(lookup("STN_ARTICLE_DB_PATH").unwrap_or("articles.db".to_string()));

        let prompt_ttl = Duration::from_secs(parse_u64(lookup("STN_PROMPT_TTL_SECS")).unwrap_or(86_400));
        let max_pending_prompts = parse_usize(lookup("STN_MAX_PENDING_PROMPTS"))
            .unwrap_or(1024)
            .max(1);

        let verbose = parse_bool(lookup("STN_VERBOSE")).unwrap_or(false);
        let log_file = lookup("STN_LOG_FILE").and_then(non_empty).map(PathBuf::from);

        Ok(Self {
            telegram_bot_token,
            telegram_api_url,
            listen_addr,
            public_url,
            max_upload_bytes,
            store,
            db_path,
            article_db_path,
            prompt_ttl,
            max_pending_prompts,
            verbose,
            log_file,
        })
    }
}

/// Export `.env` entries that are not already set in the environment.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in dotenv_entries(&contents) {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` lines; blank lines and `#` comments are skipped, one layer of matching quotes is removed.
fn dotenv_entries(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_usize(v: Option<String>) -> Option<usize> {
    v.and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

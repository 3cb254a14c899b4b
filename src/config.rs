use std::env;

use crate::error::{Error, Result};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/**
 * Runtime settings, read from the environment (and `.env` via dotenv)
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub listen_addr: String,
    /**
     * When unset the in-memory storage is used
     */
    pub database_url: Option<String>,
    pub max_connections: u32,
    /**
     * Bearer token for the admin endpoints, with none set they all respond 403
     */
    pub admin_token: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::Config(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got `{}`",
                        raw
                    )))
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Settings {
            listen_addr: var("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            database_url: var("DATABASE_URL"),
            max_connections,
            admin_token: var("ADMIN_TOKEN"),
        })
    }
}

//! Environment-sourced configuration.
//!
//! All settings come from environment variables (a `.env` file is loaded at
//! startup by the binary). Absent or placeholder values switch the matching
//! component into its offline substitute: no database credentials means the
//! in-memory store, no language-model key means the simulated query service.
//! Both are documented operating modes for development, not error states.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `ASKDOCS_DB_HOST` | Postgres host (unset → in-memory store) | — |
//! | `ASKDOCS_DB_PORT` | Postgres port | `5432` |
//! | `ASKDOCS_DB_NAME` | database name | `askdocs` |
//! | `ASKDOCS_DB_USER` | database user | `askdocs` |
//! | `ASKDOCS_DB_PASSWORD` | database password | empty |
//! | `GROQ_API_KEY` | language-model key (unset → offline answers) | — |
//! | `ASKDOCS_LLM_MODEL` | chat model name | `llama3-8b-8192` |
//! | `ASKDOCS_LLM_TIMEOUT_SECS` | request timeout | `30` |
//! | `ASKDOCS_BIND` | HTTP server bind address | `127.0.0.1:8080` |

use std::env;

/// Host value that always selects the in-memory store, mirroring a mock
/// endpoint in a `.env` checked in for development.
pub const MOCK_DB_HOST: &str = "db.mockserver.local";

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: Option<String>,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Config {
    /// Read the full configuration from the process environment.
    pub fn from_env() -> Self {
        let db = DbConfig {
            host: env_opt("ASKDOCS_DB_HOST"),
            port: env_opt("ASKDOCS_DB_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            name: env_opt("ASKDOCS_DB_NAME").unwrap_or_else(|| "askdocs".to_string()),
            user: env_opt("ASKDOCS_DB_USER").unwrap_or_else(|| "askdocs".to_string()),
            password: env_opt("ASKDOCS_DB_PASSWORD").unwrap_or_default(),
        };
        let llm = LlmConfig {
            api_key: env_opt("GROQ_API_KEY"),
            model: env_opt("ASKDOCS_LLM_MODEL").unwrap_or_else(|| "llama3-8b-8192".to_string()),
            timeout_secs: env_opt("ASKDOCS_LLM_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(30),
        };
        let server = ServerConfig {
            bind: env_opt("ASKDOCS_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
        };
        Config { db, llm, server }
    }
}

impl DbConfig {
    /// True when real database credentials are present (not a placeholder
    /// and not the mock host).
    pub fn is_configured(&self) -> bool {
        match &self.host {
            Some(host) => !is_placeholder(host) && host != MOCK_DB_HOST,
            None => false,
        }
    }
}

impl LlmConfig {
    /// True when a real language-model key is present.
    pub fn is_configured(&self) -> bool {
        matches!(&self.api_key, Some(key) if !is_placeholder(key))
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A value copied straight out of an `.env.example` counts as absent.
fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.starts_with("your_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db(host: Option<&str>) -> DbConfig {
        DbConfig {
            host: host.map(str::to_string),
            port: 5432,
            name: "askdocs".to_string(),
            user: "askdocs".to_string(),
            password: String::new(),
        }
    }

    #[test]
    fn missing_host_is_not_configured() {
        assert!(!db(None).is_configured());
    }

    #[test]
    fn mock_host_is_not_configured() {
        assert!(!db(Some(MOCK_DB_HOST)).is_configured());
    }

    #[test]
    fn placeholder_values_are_not_configured() {
        assert!(!db(Some("your_db_host")).is_configured());
        let llm = LlmConfig {
            api_key: Some("your_groq_api_key".to_string()),
            model: "llama3-8b-8192".to_string(),
            timeout_secs: 30,
        };
        assert!(!llm.is_configured());
    }

    #[test]
    fn real_values_are_configured() {
        assert!(db(Some("db.example.com")).is_configured());
        let llm = LlmConfig {
            api_key: Some("gsk_abc123".to_string()),
            model: "llama3-8b-8192".to_string(),
            timeout_secs: 30,
        };
        assert!(llm.is_configured());
    }
}

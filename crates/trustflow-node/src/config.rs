//! Environment-based configuration (spec.md §6.8, SPEC_FULL.md §1.3).
//!
//! Grounded on `ledger/internal/config/config.go`'s `Load`/`mustEnv`:
//! required values fail fast at startup, optional values fall back to
//! documented defaults. No config-file DSL — `std::env::var` throughout,
//! matching the original's preference.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for environment variable {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Path to the `redb` database file backing `trustflow-storage`.
    pub storage_path: String,
    /// Bounded work-queue capacity (C6).
    pub queue_size: usize,
    /// Fixed worker pool size (C6).
    pub workers: usize,
    /// Anchor tick interval (C8).
    pub anchor_tick_interval: Duration,
    /// `X-Hub-Signature-256` HMAC secret (C7).
    pub webhook_secret: Vec<u8>,
    /// Provider auth token (C5). In production this would be minted
    /// per-scope from the collaborator's credentials (spec.md §6.2); for
    /// now a single static token is read from the environment.
    pub provider_token: String,
    /// Fail-open override for C7's existence check (SPEC_FULL.md §2.3).
    pub exists_fail_open: bool,
    pub webhook_listen_addr: String,
    pub telemetry_listen_addr: String,
}

fn env_opt(key: &'static str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn must_env(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(key))
}

fn env_parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: v }),
        _ => Ok(default),
    }
}

impl NodeConfig {
    /// Loads configuration from the process environment, failing fast on
    /// any missing required variable rather than panicking deep inside a
    /// component.
    pub fn load() -> Result<Self, ConfigError> {
        let queue_size = env_parsed("QUEUE_SIZE", trustflow_ingest::DEFAULT_QUEUE_SIZE)?;
        let workers = env_parsed("WORKERS", trustflow_ingest::DEFAULT_WORKERS)?;
        let anchor_tick_secs =
            env_parsed("ANCHOR_TICK_INTERVAL_SECS", trustflow_anchor::DEFAULT_TICK_INTERVAL.as_secs())?;

        Ok(Self {
            storage_path: env_opt("STORAGE_PATH", "trustflow.redb"),
            queue_size,
            workers,
            anchor_tick_interval: Duration::from_secs(anchor_tick_secs),
            webhook_secret: must_env("GITHUB_WEBHOOK_SECRET")?.into_bytes(),
            provider_token: env_opt("GITHUB_TOKEN", ""),
            exists_fail_open: env_parsed("EXISTS_FAIL_OPEN", false)?,
            webhook_listen_addr: env_opt("WEBHOOK_LISTEN_ADDR", "0.0.0.0:9091"),
            telemetry_listen_addr: env_opt("TELEMETRY_ADDR", "127.0.0.1:9616"),
        })
    }
}

//! Sweeper configuration.
//!
//! Every setting comes from an environment variable (see [`CONFIG_ENVS`]). Missing values use the defaults below;
//! invalid values are logged and also fall back to the default, so the sweeper always starts.
use std::env;

use chrono::Duration;
use log::*;
use poe_common::helpers::{parse_boolean_flag, parse_positive_int};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/payment_orders.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOCK_TTL_SECS: u64 = 30;
const DEFAULT_LOCK_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_EXPIRY_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_PENDING_ORDER_TIMEOUT_SECS: u64 = 30 * 60;
const DEFAULT_PROCESSING_ORDER_TIMEOUT_SECS: u64 = 2 * 60 * 60;

pub const CONFIG_ENVS: [&str; 8] = [
    "POE_DATABASE_URL",
    "POE_DB_MAX_CONNECTIONS",
    "POE_LOCK_TTL",
    "POE_LOCK_SWEEP_INTERVAL",
    "POE_EXPIRY_SWEEP_INTERVAL",
    "POE_PENDING_ORDER_TIMEOUT",
    "POE_PROCESSING_ORDER_TIMEOUT",
    "POE_RUN_MIGRATIONS",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweeperConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How long a lease taken by the expiry sweep is valid for.
    pub lock_ttl: Duration,
    pub lock_sweep_interval: std::time::Duration,
    pub expiry_sweep_interval: std::time::Duration,
    /// `PENDING` orders older than this are expired.
    pub pending_order_timeout: Duration,
    /// `PROCESSING` orders that started longer ago than this are timed out.
    pub processing_order_timeout: Duration,
    /// Whether to bring the schema up to date on startup.
    pub run_migrations: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            lock_ttl: seconds(DEFAULT_LOCK_TTL_SECS),
            lock_sweep_interval: std::time::Duration::from_secs(DEFAULT_LOCK_SWEEP_INTERVAL_SECS),
            expiry_sweep_interval: std::time::Duration::from_secs(DEFAULT_EXPIRY_SWEEP_INTERVAL_SECS),
            pending_order_timeout: seconds(DEFAULT_PENDING_ORDER_TIMEOUT_SECS),
            processing_order_timeout: seconds(DEFAULT_PROCESSING_ORDER_TIMEOUT_SECS),
            run_migrations: true,
        }
    }
}

impl SweeperConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any source of variables, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("POE_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ POE_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = positive_int(&lookup, "POE_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS as u64);
        let max_connections = u32::try_from(max_connections).unwrap_or_else(|_| {
            warn!("🪛️ POE_DB_MAX_CONNECTIONS is too large. Using the default, {DEFAULT_MAX_CONNECTIONS}.");
            DEFAULT_MAX_CONNECTIONS
        });
        let lock_ttl = seconds(positive_int(&lookup, "POE_LOCK_TTL", DEFAULT_LOCK_TTL_SECS));
        let lock_sweep_interval = std::time::Duration::from_secs(positive_int(
            &lookup,
            "POE_LOCK_SWEEP_INTERVAL",
            DEFAULT_LOCK_SWEEP_INTERVAL_SECS,
        ));
        let expiry_sweep_interval = std::time::Duration::from_secs(positive_int(
            &lookup,
            "POE_EXPIRY_SWEEP_INTERVAL",
            DEFAULT_EXPIRY_SWEEP_INTERVAL_SECS,
        ));
        let pending_order_timeout =
            seconds(positive_int(&lookup, "POE_PENDING_ORDER_TIMEOUT", DEFAULT_PENDING_ORDER_TIMEOUT_SECS));
        let processing_order_timeout =
            seconds(positive_int(&lookup, "POE_PROCESSING_ORDER_TIMEOUT", DEFAULT_PROCESSING_ORDER_TIMEOUT_SECS));
        let run_migrations = parse_boolean_flag(lookup("POE_RUN_MIGRATIONS"), true);
        Self {
            database_url,
            max_connections,
            lock_ttl,
            lock_sweep_interval,
            expiry_sweep_interval,
            pending_order_timeout,
            processing_order_timeout,
            run_migrations,
        }
    }
}

fn positive_int<F>(lookup: &F, name: &str, default: u64) -> u64
where F: Fn(&str) -> Option<String> {
    match parse_positive_int(lookup(name)) {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Err(e) => {
            error!("🪛️ Invalid configuration value for {name}. {e}. Using the default value of {default}.");
            default
        },
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1_000))
}

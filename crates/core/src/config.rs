use std::env;

use serde::{Deserialize, Serialize};

use crate::error::TallyError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a u64, treating zero the same as missing.
fn profiled_env_nonzero_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .filter(|v| *v != 0)
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub operations: OperationsConfig,
    pub scheduler: SchedulerEnvConfig,
    pub postgres: PostgresConfig,
    pub auth: AuthConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TALLY_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TALLY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            operations: OperationsConfig::from_env_profiled(p),
            scheduler: SchedulerEnvConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            auth: AuthConfig::from_env_profiled(p),
            agent: AgentConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings the server or agent cannot run with.
    pub fn validate(&self) -> Result<(), TallyError> {
        if self.server.port == 0 {
            return Err(TallyError::Config("PORT must be non-zero".into()));
        }
        if self.scheduler.task_lease_secs == 0 {
            return Err(TallyError::Config("TASK_LEASE_SECS must be non-zero".into()));
        }
        if self.agent.computing_power == 0 {
            return Err(TallyError::Config("COMPUTING_POWER must be at least 1".into()));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(TallyError::Config("JWT_SECRET must not be empty".into()));
        }
        if !(4..=31).contains(&self.auth.password_cost) {
            return Err(TallyError::Config("BCRYPT_COST must be between 4 and 31".into()));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  operations:  +{}ms -{}ms *{}ms /{}ms",
            self.operations.addition_ms,
            self.operations.subtraction_ms,
            self.operations.multiplication_ms,
            self.operations.division_ms
        );
        tracing::info!(
            "  scheduler:   lease={}s reap_every={}s",
            self.scheduler.task_lease_secs, self.scheduler.lease_reap_interval_secs
        );
        tracing::info!(
            "  postgres:    host={}, db={}, configured={}",
            self.postgres.host, self.postgres.database, self.postgres.is_configured()
        );
        tracing::info!(
            "  auth:        token_ttl={}h bcrypt_cost={}",
            self.auth.token_ttl_hours, self.auth.password_cost
        );
        if self.auth.is_default_secret() {
            tracing::warn!("  auth:        JWT_SECRET not set, using the development secret");
        }
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8080),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Operation timing hints ────────────────────────────────────

/// Advisory per-operator compute times handed to workers with each task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationsConfig {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl OperationsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            addition_ms: profiled_env_nonzero_u64(p, "TIME_ADDITION_MS", 10),
            subtraction_ms: profiled_env_nonzero_u64(p, "TIME_SUBTRACTION_MS", 10),
            multiplication_ms: profiled_env_nonzero_u64(p, "TIME_MULTIPLICATIONS_MS", 10),
            division_ms: profiled_env_nonzero_u64(p, "TIME_DIVISIONS_MS", 10),
        }
    }
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            addition_ms: 10,
            subtraction_ms: 10,
            multiplication_ms: 10,
            division_ms: 10,
        }
    }
}

// ── Scheduler (leases, housekeeping) ──────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerEnvConfig {
    /// How long a pulled task may stay unanswered before it is requeued.
    pub task_lease_secs: u64,
    pub lease_reap_interval_secs: u64,
    pub queue_log_interval_secs: u64,
}

impl SchedulerEnvConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            task_lease_secs: profiled_env_nonzero_u64(p, "TASK_LEASE_SECS", 30),
            lease_reap_interval_secs: profiled_env_nonzero_u64(p, "LEASE_REAP_INTERVAL_SECS", 5),
            queue_log_interval_secs: profiled_env_nonzero_u64(p, "QUEUE_LOG_INTERVAL_SECS", 2),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; overrides the individual fields when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "PG_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "tally"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.username.is_some()
    }
}

// ── Auth (identity port) ──────────────────────────────────────

const DEV_JWT_SECRET: &str = "tally-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub token_ttl_hours: u32,
    /// bcrypt work factor for stored passwords.
    pub password_cost: u32,
}

impl AuthConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            jwt_secret: profiled_env_or(p, "JWT_SECRET", DEV_JWT_SECRET),
            token_ttl_hours: profiled_env_u32(p, "TOKEN_TTL_HOURS", 24),
            password_cost: profiled_env_u32(p, "BCRYPT_COST", 12),
        }
    }

    pub fn is_default_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

// ── Agent (remote worker) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub orchestrator_url: String,
    /// Number of concurrent pollers.
    pub computing_power: u32,
    pub poll_interval_ms: u64,
}

impl AgentConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            orchestrator_url: profiled_env_or(p, "ORCHESTRATOR_URL", "http://localhost:8080"),
            computing_power: profiled_env_u32(p, "COMPUTING_POWER", 2),
            poll_interval_ms: profiled_env_nonzero_u64(p, "AGENT_POLL_INTERVAL_MS", 500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests never share keys.

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::for_profile("TALLYTESTDEFAULTS");
        assert_eq!(cfg.profile_label(), "TALLYTESTDEFAULTS");
        assert_eq!(cfg.scheduler.queue_log_interval_secs, 2);
        assert_eq!(cfg.agent.poll_interval_ms, 500);
        assert_eq!(cfg.auth.password_cost, 12);
        assert!(cfg.postgres.database_url().starts_with("postgres://"));
    }

    #[test]
    fn profiled_keys_override() {
        env::set_var("TALLYTESTA_TIME_ADDITION_MS", "20");
        env::set_var("TALLYTESTA_TIME_DIVISIONS_MS", "50");
        env::set_var("TALLYTESTA_PORT", "9090");
        let cfg = Config::for_profile("tallytesta");
        assert_eq!(cfg.profile, "TALLYTESTA");
        assert_eq!(cfg.operations.addition_ms, 20);
        assert_eq!(cfg.operations.division_ms, 50);
        assert_eq!(cfg.server.port, 9090);
    }

    #[test]
    fn zero_or_garbage_timing_falls_back() {
        env::set_var("TALLYTESTB_TIME_SUBTRACTION_MS", "0");
        env::set_var("TALLYTESTB_TIME_MULTIPLICATIONS_MS", "fast");
        let cfg = Config::for_profile("TALLYTESTB");
        assert_eq!(cfg.operations.subtraction_ms, 10);
        assert_eq!(cfg.operations.multiplication_ms, 10);
    }

    #[test]
    fn pg_url_overrides_fields() {
        env::set_var("TALLYTESTC_PG_URL", "postgres://u:p@db:5433/x");
        let cfg = Config::for_profile("TALLYTESTC");
        assert!(cfg.postgres.is_configured());
        assert_eq!(cfg.postgres.database_url(), "postgres://u:p@db:5433/x");
    }

    #[test]
    fn validate_rejects_zero_workers() {
        env::set_var("TALLYTESTD_COMPUTING_POWER", "0");
        let cfg = Config::for_profile("TALLYTESTD");
        assert_eq!(
            cfg.validate(),
            Err(TallyError::Config("COMPUTING_POWER must be at least 1".into()))
        );
    }

    #[test]
    fn validate_rejects_out_of_range_cost() {
        env::set_var("TALLYTESTF_BCRYPT_COST", "3");
        let cfg = Config::for_profile("TALLYTESTF");
        assert_eq!(
            cfg.validate(),
            Err(TallyError::Config("BCRYPT_COST must be between 4 and 31".into()))
        );
    }

    #[test]
    fn secret_not_serialized() {
        let cfg = Config::for_profile("TALLYTESTE");
        let json = serde_json::to_value(&cfg.auth).unwrap();
        assert!(json.get("jwt_secret").is_none());
    }
}

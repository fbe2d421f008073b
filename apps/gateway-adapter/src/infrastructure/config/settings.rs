//! Gateway Adapter Configuration Settings
//!
//! Configuration types for the adapter, loaded from environment variables.
//! Unset or unparsable values fall back to defaults; values that parse but
//! make no sense (empty host, zero quota) are rejected.

use std::time::Duration;

use crate::domain::session::Endpoint;
use crate::infrastructure::resilience::{RateLimitQuota, RequestCategory};

/// Trading environment (paper vs live).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Paper trading gateway.
    #[default]
    Paper,
    /// Live trading gateway.
    Live,
}

impl Environment {
    /// Parse environment from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LIVE" => Self::Live,
            _ => Self::Paper,
        }
    }

    /// Check if this is the live environment.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Live => "live",
        }
    }

    /// Conventional gateway port for the environment.
    #[must_use]
    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Paper => 7497,
            Self::Live => 7496,
        }
    }
}

/// Venue session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Client id presented to the gateway.
    pub client_id: i32,
    /// Time allowed for the first request id to arrive.
    pub connect_timeout: Duration,
    /// Start the backoff loop automatically on session loss.
    pub auto_reconnect: bool,
    /// Reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Fractional jitter applied to each delay (0 = none).
    pub reconnect_jitter_factor: f64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::for_environment(Environment::Paper)
    }
}

impl ConnectionSettings {
    /// Defaults for an environment.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: environment.default_port(),
            client_id: 1,
            connect_timeout: Duration::from_secs(10),
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            reconnect_delay_initial: Duration::from_secs(2),
            reconnect_delay_max: Duration::from_secs(60),
            reconnect_delay_multiplier: 2.0,
            reconnect_jitter_factor: 0.0,
        }
    }

    /// Gateway address.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Check the backoff parameters: delays must start positive and never
    /// shrink, and jitter is a fraction in `0.0..=1.0`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate_backoff(&self) -> Result<(), ConfigError> {
        if self.reconnect_delay_initial.is_zero() {
            return Err(ConfigError::invalid(
                "GATEWAY_RECONNECT_DELAY_INITIAL_MS",
                "initial delay must be positive",
            ));
        }
        let multiplier = self.reconnect_delay_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::invalid(
                "GATEWAY_RECONNECT_DELAY_MULTIPLIER",
                "multiplier must be a finite number of at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.reconnect_jitter_factor) {
            return Err(ConfigError::invalid(
                "GATEWAY_RECONNECT_JITTER_FACTOR",
                "jitter must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

/// Per-category request quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Market-data subscriptions.
    pub market_data: RateLimitQuota,
    /// Historical data queries.
    pub historical_data: RateLimitQuota,
    /// Order actions.
    pub orders: RateLimitQuota,
    /// Account queries.
    pub account: RateLimitQuota,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            market_data: RequestCategory::MarketData.default_quota(),
            historical_data: RequestCategory::HistoricalData.default_quota(),
            orders: RequestCategory::Orders.default_quota(),
            account: RequestCategory::Account.default_quota(),
        }
    }
}

impl RateLimitSettings {
    /// Quota for a category.
    #[must_use]
    pub const fn quota(&self, category: RequestCategory) -> RateLimitQuota {
        match category {
            RequestCategory::MarketData => self.market_data,
            RequestCategory::HistoricalData => self.historical_data,
            RequestCategory::Orders => self.orders,
            RequestCategory::Account => self.account,
        }
    }

    const fn quota_mut(&mut self, category: RequestCategory) -> &mut RateLimitQuota {
        match category {
            RequestCategory::MarketData => &mut self.market_data,
            RequestCategory::HistoricalData => &mut self.historical_data,
            RequestCategory::Orders => &mut self.orders,
            RequestCategory::Account => &mut self.account,
        }
    }
}

/// Venue transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// TCP bridge speaking newline-delimited JSON.
    #[default]
    Tcp,
    /// In-process simulated venue, for local runs without a gateway.
    Simulated,
}

impl TransportKind {
    /// Parse a transport name; anything but "simulated" selects TCP.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("simulated") {
            Self::Simulated
        } else {
            Self::Tcp
        }
    }

    /// Get the transport name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Simulated => "simulated",
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete adapter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Trading environment.
    pub environment: Environment,
    /// Venue session settings.
    pub connection: ConnectionSettings,
    /// Request quotas.
    pub rate_limits: RateLimitSettings,
    /// Server port settings.
    pub server: ServerSettings,
    /// Venue transport.
    pub transport: TransportKind,
    /// Subscribe to account updates for managed accounts after each connect.
    pub subscribe_account_updates: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Paper,
            connection: ConnectionSettings::default(),
            rate_limits: RateLimitSettings::default(),
            server: ServerSettings::default(),
            transport: TransportKind::default(),
            subscribe_account_updates: true,
        }
    }
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be used.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = EnvSource(&lookup);

        let environment = env
            .get("GATEWAY_ENV")
            .map(|s| Environment::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let defaults = ConnectionSettings::for_environment(environment);
        let connection = ConnectionSettings {
            host: env
                .get("GATEWAY_HOST")
                .map_or(defaults.host, |h| h.trim().to_string()),
            port: env.parse("GATEWAY_PORT", defaults.port),
            client_id: env.parse("GATEWAY_CLIENT_ID", defaults.client_id),
            connect_timeout: env.duration_secs(
                "GATEWAY_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            ),
            auto_reconnect: env.bool("GATEWAY_AUTO_RECONNECT", defaults.auto_reconnect),
            max_reconnect_attempts: env.parse(
                "GATEWAY_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            reconnect_delay_initial: env.duration_millis(
                "GATEWAY_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: env.duration_secs(
                "GATEWAY_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: env.parse(
                "GATEWAY_RECONNECT_DELAY_MULTIPLIER",
                defaults.reconnect_delay_multiplier,
            ),
            reconnect_jitter_factor: env.parse(
                "GATEWAY_RECONNECT_JITTER_FACTOR",
                defaults.reconnect_jitter_factor,
            ),
        };

        let mut rate_limits = RateLimitSettings::default();
        for category in RequestCategory::ALL {
            let prefix = format!("GATEWAY_RATE_LIMIT_{}", category.as_str().to_uppercase());
            let quota = rate_limits.quota_mut(category);
            quota.max_requests = env.parse(&format!("{prefix}_MAX"), quota.max_requests);
            quota.window = env.duration_secs(&format!("{prefix}_WINDOW_SECS"), quota.window);
        }

        let server = ServerSettings {
            health_port: env.parse("GATEWAY_HEALTH_PORT", ServerSettings::default().health_port),
        };

        let transport = env
            .get("GATEWAY_TRANSPORT")
            .map(|s| TransportKind::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let config = Self {
            environment,
            connection,
            rate_limits,
            server,
            transport,
            subscribe_account_updates: env.bool("GATEWAY_SUBSCRIBE_ACCOUNT_UPDATES", true),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.host.is_empty() {
            return Err(ConfigError::invalid("GATEWAY_HOST", "host cannot be empty"));
        }
        if self.connection.connect_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "GATEWAY_CONNECT_TIMEOUT_SECS",
                "timeout must be positive",
            ));
        }
        self.connection.validate_backoff()?;
        for category in RequestCategory::ALL {
            let quota = self.rate_limits.quota(category);
            let prefix = format!("GATEWAY_RATE_LIMIT_{}", category.as_str().to_uppercase());
            if quota.max_requests == 0 {
                return Err(ConfigError::invalid(
                    format!("{prefix}_MAX"),
                    "quota must be positive",
                ));
            }
            if quota.window.is_zero() {
                return Err(ConfigError::invalid(
                    format!("{prefix}_WINDOW_SECS"),
                    "window must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

struct EnvSource<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> EnvSource<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}

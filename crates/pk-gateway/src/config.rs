//! Gateway connection settings.

use std::time::Duration;

/// Default gateway endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Intents: guilds, guild messages, guild message reactions, direct messages,
/// direct message reactions, message content.
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 10) | (1 << 12) | (1 << 13) | (1 << 15);

/// Configuration for the gateway client.
#[derive(Clone)]
pub struct GatewayConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Bot token sent in `IDENTIFY`.
    pub token: String,
    /// Gateway intents bitfield.
    pub intents: u64,
    /// Whether to reconnect after the connection is lost.
    pub auto_reconnect: bool,
    /// Maximum number of consecutive reconnection attempts (None = infinite).
    pub max_retries: Option<u32>,
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the reconnection delay.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            token: String::new(),
            intents: DEFAULT_INTENTS,
            auto_reconnect: true,
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl GatewayConfig {
    /// Creates a config for the default endpoint with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Sets the endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the intents bitfield.
    pub fn with_intents(mut self, intents: u64) -> Self {
        self.intents = intents;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    /// Disables reconnection.
    pub fn no_reconnect(mut self) -> Self {
        self.auto_reconnect = false;
        self
    }

    /// Returns the delay that follows `current` after a failed attempt.
    ///
    /// Products that do not fit a `Duration` (overflow, NaN) saturate at
    /// `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map_or(self.max_delay, |next| next.min(self.max_delay))
    }
}

// The token never reaches the logs.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_capped() {
        let config = GatewayConfig::default();
        assert_eq!(config.next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(config.next_delay(Duration::from_secs(45)), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_saturates_on_unrepresentable_delay() {
        for multiplier in [f64::INFINITY, f64::NAN, 1e300] {
            let config = GatewayConfig {
                backoff_multiplier: multiplier,
                ..Default::default()
            };
            assert_eq!(config.next_delay(config.initial_delay), config.max_delay);
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GatewayConfig::new("secret-token");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}

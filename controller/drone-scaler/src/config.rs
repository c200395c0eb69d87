//! Configuration for the drone scaler service

use crate::accumulator::IncrementPolicy;
use crate::decision::Thresholds;
use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_METRIC_NAME: &str = "drone_pending_jobs";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SCALE_UP_THRESHOLD: u64 = 10;

/// URL scheme used to reach the metrics endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("http"),
            Protocol::Https => f.write_str("https"),
        }
    }
}

/// Configuration for drone scaler
///
/// The endpoint settings keep the short lowercase environment names
/// (`host`, `port`, `protocol`, `token`, `timeout`) used by existing deployments.
#[derive(Debug, Clone, Parser)]
#[command(name = "drone-scaler")]
#[command(about = "Polls a Drone metrics endpoint and recommends scaling actions")]
pub struct Config {
    /// Metrics server host
    #[arg(long, env = "host", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Metrics server port
    #[arg(long, env = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Scheme used to reach the metrics server
    #[arg(long, env = "protocol", value_enum, ignore_case = true, default_value = "http")]
    pub protocol: Protocol,

    /// Bearer token sent with every metrics request
    #[arg(long, env = "token", hide_env_values = true)]
    pub token: Option<String>,

    /// Poll interval in seconds
    #[arg(long = "timeout", env = "timeout", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// Path of the metrics endpoint
    #[arg(long, env = "METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: String,

    /// Gauge holding the number of pending jobs
    #[arg(long, env = "METRIC_NAME", default_value = DEFAULT_METRIC_NAME)]
    pub metric_name: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Pending estimate above which scaling up is recommended
    #[arg(long, env = "SCALE_UP_THRESHOLD", default_value_t = DEFAULT_SCALE_UP_THRESHOLD)]
    pub scale_up_threshold: u64,

    /// How non-zero readings grow the pending estimate
    #[arg(long, env = "INCREMENT_POLICY", value_enum, default_value = "by-value")]
    pub increment_policy: IncrementPolicy,

    /// Output logs in JSON format
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol: Protocol::Http,
            token: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            metric_name: DEFAULT_METRIC_NAME.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            scale_up_threshold: DEFAULT_SCALE_UP_THRESHOLD,
            increment_policy: IncrementPolicy::ByValue,
            log_json: false,
        }
    }
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }

    /// Reject settings the poll loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        if !self.metrics_path.starts_with('/') {
            bail!("metrics path must start with '/': {}", self.metrics_path);
        }
        if self.metric_name.trim().is_empty() {
            bail!("metric name must not be empty");
        }
        if self.poll_interval_secs == 0 {
            bail!("poll interval must be at least one second");
        }
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }
        Ok(())
    }

    /// Full URL of the metrics endpoint
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol, self.host, self.port, self.metrics_path
        )
    }

    /// Token to send, if one is configured and non-empty
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            scale_up_above: self.scale_up_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_url() {
        let config = Config::default();
        assert_eq!(config.endpoint_url(), "http://localhost:80/metrics");
    }

    #[test]
    fn test_endpoint_url_with_https_and_custom_path() {
        let config = Config {
            host: "drone.internal".to_string(),
            port: 8443,
            protocol: Protocol::Https,
            metrics_path: "/api/metrics".to_string(),
            ..Default::default()
        };

        assert_eq!(config.endpoint_url(), "https://drone.internal:8443/api/metrics");
    }

    #[test]
    fn test_bearer_token_ignores_empty_value() {
        let mut config = Config {
            token: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.bearer_token(), None);

        config.token = Some("secret".to_string());
        assert_eq!(config.bearer_token(), Some("secret"));

        config.token = None;
        assert_eq!(config.bearer_token(), None);
    }

    #[test]
    fn test_parse_from_flags() {
        let config = Config::try_parse_from([
            "drone-scaler",
            "--host",
            "ci.example.com",
            "--port",
            "9000",
            "--protocol",
            "https",
            "--timeout",
            "15",
            "--scale-up-threshold",
            "20",
            "--increment-policy",
            "by-one",
        ])
        .unwrap();

        assert_eq!(config.host, "ci.example.com");
        assert_eq!(config.port, 9000);
        assert_eq!(config.protocol, Protocol::Https);
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.thresholds().scale_up_above, 20);
        assert_eq!(config.increment_policy, IncrementPolicy::ByOne);
    }

    #[test]
    fn test_protocol_is_case_insensitive() {
        let config = Config::try_parse_from(["drone-scaler", "--protocol", "HTTPS"]).unwrap();
        assert_eq!(config.protocol, Protocol::Https);
        assert_eq!(config.endpoint_url(), "https://localhost:80/metrics");
    }

    #[test]
    fn test_parse_rejects_unknown_protocol() {
        let result = Config::try_parse_from(["drone-scaler", "--protocol", "gopher"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let zero_interval = Config {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(zero_interval.validate().is_err());

        let zero_timeout = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let relative_path = Config {
            metrics_path: "metrics".to_string(),
            ..Default::default()
        };
        assert!(relative_path.validate().is_err());

        let empty_host = Config {
            host: " ".to_string(),
            ..Default::default()
        };
        assert!(empty_host.validate().is_err());
    }
}

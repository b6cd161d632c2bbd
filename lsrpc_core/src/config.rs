/*! Client configuration.
*/

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config as Loader, ConfigError, File as CfgFile};
use serde::Deserialize;
use serde_yaml::Value;

/// Seed JSON-RPC endpoints queried when no `seed-nodes` override is
/// given, tried in order.
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://storage.seed1.loki.network/json_rpc",
    "https://storage.seed3.loki.network/json_rpc",
    "https://public.loki.foundation/json_rpc",
    "https://seed1.getsession.org/json_rpc",
    "https://seed2.getsession.org/json_rpc",
];

/// Diagnostics mode.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Verbose diagnostics for development peers.
    Dev,
    /// Warnings only; also forces TLS verification towards public hosts.
    Prod,
}

/// Config for the onion request client.
#[derive(Clone, Debug, Deserialize)]
pub struct ClientConfig {
    /// Hops per request.
    #[serde(rename = "path-length", default = "default_path_length")]
    pub path_length: usize,
    /// Per-HTTP-request timeout in milliseconds.
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Whether to verify entry-hop TLS certificates. Off by default since
    /// development service nodes run on self-signed certificates.
    #[serde(rename = "tls-verify", default)]
    pub tls_verify: bool,
    /// Diagnostics mode.
    #[serde(rename = "log-level", default = "default_log_mode")]
    pub log_level: LogMode,
    /// Seed JSON-RPC endpoints, tried in order.
    #[serde(rename = "seed-nodes", default = "default_seeds")]
    pub seed_nodes: Vec<String>,
    /// Unused fields from the config file.
    #[serde(flatten)]
    pub unused: HashMap<String, Value>,
}

fn default_path_length() -> usize {
    3
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_log_mode() -> LogMode {
    LogMode::Dev
}

fn default_seeds() -> Vec<String> {
    DEFAULT_SEEDS.iter().map(|seed| (*seed).to_owned()).collect()
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            path_length: default_path_length(),
            timeout_ms: default_timeout_ms(),
            tls_verify: false,
            log_level: default_log_mode(),
            seed_nodes: default_seeds(),
            unused: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
        let loaded = Loader::builder()
            .add_source(CfgFile::from(path.as_ref()))
            .build()?;
        loaded.try_deserialize()
    }

    /// Per-HTTP-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Level filter for the diagnostics gate.
    pub fn log_filter(&self) -> log::LevelFilter {
        match self.log_level {
            LogMode::Dev => log::LevelFilter::Debug,
            LogMode::Prod => log::LevelFilter::Warn,
        }
    }

    /// Effective TLS policy towards the given host. Lax verification is
    /// honored for lab addresses only: in prod mode a public-internet
    /// host always gets a verified connection.
    pub fn tls_verify_for(&self, host: &str) -> bool {
        self.tls_verify || (self.log_level == LogMode::Prod && is_public_fqdn(host))
    }
}

/// Whether a host looks like a name on the public internet rather than an
/// IP literal or a lab name.
pub fn is_public_fqdn(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return false;
    }
    if !host.contains('.') {
        return false;
    }
    const LAB_SUFFIXES: &[&str] = &[".local", ".internal", ".lan", ".home", ".test"];
    !LAB_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.path_length, 3);
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
        assert!(!config.tls_verify);
        assert_eq!(config.log_level, LogMode::Dev);
        assert_eq!(config.seed_nodes.len(), DEFAULT_SEEDS.len());
    }

    #[test]
    fn config_deserialize_overrides() {
        let yaml = "
path-length: 5
timeout-ms: 2500
tls-verify: true
log-level: prod
seed-nodes:
  - https://seed.example.test/json_rpc
leftover: 1
";
        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.path_length, 5);
        assert_eq!(config.timeout_ms, 2500);
        assert!(config.tls_verify);
        assert_eq!(config.log_level, LogMode::Prod);
        assert_eq!(config.seed_nodes, vec!["https://seed.example.test/json_rpc".to_owned()]);
        assert!(config.unused.contains_key("leftover"));
    }

    #[test]
    fn config_deserialize_empty_uses_defaults() {
        let config: ClientConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.path_length, 3);
        assert_eq!(config.timeout_ms, 10_000);
    }

    #[test]
    fn log_filter_matches_mode() {
        let mut config = ClientConfig::default();
        assert_eq!(config.log_filter(), log::LevelFilter::Debug);
        config.log_level = LogMode::Prod;
        assert_eq!(config.log_filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn public_fqdn_detection() {
        assert!(is_public_fqdn("storage.seed1.loki.network"));
        assert!(is_public_fqdn("example.com"));
        assert!(!is_public_fqdn("144.76.164.202"));
        assert!(!is_public_fqdn("::1"));
        assert!(!is_public_fqdn("localhost"));
        assert!(!is_public_fqdn("node.lan"));
        assert!(!is_public_fqdn("rig.local"));
    }

    #[test]
    fn prod_mode_forces_verification_for_public_hosts() {
        let mut config = ClientConfig::default();
        assert!(!config.tls_verify_for("example.com"));
        config.log_level = LogMode::Prod;
        assert!(config.tls_verify_for("example.com"));
        assert!(!config.tls_verify_for("127.0.0.1"));
        config.tls_verify = true;
        assert!(config.tls_verify_for("127.0.0.1"));
    }
}

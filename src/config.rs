//! Session configuration.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::session::BindType;

/// Tunables fixed at session construction. Timer names follow the SMPP
/// specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Socket read timeout and keepalive cadence.
    #[serde(default = "default_enquire_link_timer", with = "humantime_serde")]
    pub enquire_link_timer: Duration,

    /// Per-request response deadline.
    #[serde(default = "default_transaction_timer", with = "humantime_serde")]
    pub transaction_timer: Duration,

    /// Deadline for the bind response during session establishment.
    #[serde(default = "default_bind_timer", with = "humantime_serde")]
    pub bind_timer: Duration,

    /// Processing workers once bound; the pool runs serially until then.
    #[serde(default = "default_pdu_processor_degree")]
    pub pdu_processor_degree: usize,

    /// Bounded length of the processing queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_enquire_link_timer() -> Duration {
    Duration::from_secs(60)
}

fn default_transaction_timer() -> Duration {
    Duration::from_secs(2)
}

fn default_bind_timer() -> Duration {
    Duration::from_secs(60)
}

fn default_pdu_processor_degree() -> usize {
    3
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enquire_link_timer: default_enquire_link_timer(),
            transaction_timer: default_transaction_timer(),
            bind_timer: default_bind_timer(),
            pdu_processor_degree: default_pdu_processor_degree(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl SessionConfig {
    /// Parse from YAML and validate.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: SessionConfig =
            serde_yaml::from_str(yaml).context("failed to parse session configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pdu_processor_degree == 0 {
            anyhow::bail!("pdu_processor_degree must be at least 1");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be at least 1");
        }
        if self.transaction_timer.is_zero() {
            anyhow::bail!("transaction_timer must be non-zero");
        }
        Ok(())
    }
}

/// Everything needed for the bind handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindParameter {
    pub bind_type: BindType,
    pub system_id: String,
    pub password: String,
    #[serde(default)]
    pub system_type: String,
    #[serde(default = "default_interface_version")]
    pub interface_version: u8,
    #[serde(default)]
    pub addr_ton: u8,
    #[serde(default)]
    pub addr_npi: u8,
    #[serde(default)]
    pub address_range: String,
}

fn default_interface_version() -> u8 {
    0x34
}

impl BindParameter {
    pub fn new(bind_type: BindType, system_id: &str, password: &str) -> Self {
        Self {
            bind_type,
            system_id: system_id.to_owned(),
            password: password.to_owned(),
            system_type: String::new(),
            interface_version: default_interface_version(),
            addr_ton: 0,
            addr_npi: 0,
            address_range: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_conventions() {
        let config = SessionConfig::default();
        assert_eq!(config.enquire_link_timer, Duration::from_secs(60));
        assert_eq!(config.transaction_timer, Duration::from_secs(2));
        assert_eq!(config.pdu_processor_degree, 3);
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn parses_yaml_with_humantime_durations() {
        let config = SessionConfig::from_yaml(
            r#"
enquire_link_timer: 30s
transaction_timer: 500ms
pdu_processor_degree: 2
"#,
        )
        .unwrap();
        assert_eq!(config.enquire_link_timer, Duration::from_secs(30));
        assert_eq!(config.transaction_timer, Duration::from_millis(500));
        assert_eq!(config.pdu_processor_degree, 2);
        assert_eq!(config.queue_capacity, 100);
    }

    #[test]
    fn rejects_zero_degree() {
        let result = SessionConfig::from_yaml("pdu_processor_degree: 0");
        assert!(result.is_err());
    }

    #[test]
    fn bind_parameter_yaml() {
        let bind: BindParameter = serde_yaml::from_str(
            r#"
bind_type: transceiver
system_id: ESME
password: secret
"#,
        )
        .unwrap();
        assert_eq!(bind.bind_type, BindType::Transceiver);
        assert_eq!(bind.interface_version, 0x34);
    }
}

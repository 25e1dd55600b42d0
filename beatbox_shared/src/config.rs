use serde::{Deserialize, Serialize};

/// What the receive loop does with a frame pair it can't decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Report the error, drop the message and keep listening
    #[default]
    Skip,
    /// Report the error and close the channel
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// `host:port` of the relay
    pub address: String,
    /// Connect when the session starts
    pub auto_connect: bool,
    pub decode_policy: DecodePolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:4242".to_string(),
            auto_connect: true,
            decode_policy: DecodePolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub base_bpm: f64,
    /// Multiplier applied by one "tempo up"
    pub step_up: f64,
    /// Multiplier applied by one "tempo down"
    pub step_down: f64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            base_bpm: 120.0,
            step_up: 1.03,
            step_down: 0.97,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name used in outgoing labels. Empty means "ask the environment".
    pub user_name: String,
    pub relay: RelayConfig,
    pub tempo: TempoConfig,
}

impl SessionConfig {
    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }
}

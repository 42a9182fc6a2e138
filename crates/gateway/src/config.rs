// SPDX-License-Identifier: BUSL-1.1

//! Gateway configuration: every recognized key, split
//! between fields that can be hot-reloaded in place and fields that
//! require a process restart to take effect.

use std::time::Duration;

use edge_gateway_core::ConversationScope;
use serde::{Deserialize, Serialize};

/// Full gateway configuration, parsed from CLI args / env vars and also
/// reloadable from a config file by [`crate::config_watch::ConfigWatcher`].
#[derive(Debug, Clone, PartialEq, clap::Args, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Port to listen on. Restart-required.
    #[arg(long, default_value_t = 7900, env = "EDGE_GATEWAY_PORT")]
    pub port: u16,

    /// URL of the upstream control-plane nexus. Restart-required.
    #[arg(long, env = "EDGE_GATEWAY_NEXUS_URL")]
    pub nexus_url: Option<String>,

    /// API key used to authenticate to the nexus. Restart-required.
    #[arg(long, env = "EDGE_GATEWAY_NEXUS_API_KEY")]
    pub nexus_api_key: Option<String>,

    /// Process-wide maximum concurrent connections. Restart-required.
    #[arg(long, default_value_t = 10_000, env = "EDGE_GATEWAY_MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Idle timeout for a connected session, in milliseconds. Hot-reloadable.
    #[arg(long, default_value_t = 60_000, env = "EDGE_GATEWAY_SESSION_TIMEOUT_MS")]
    pub session_timeout_ms: u64,

    /// Timeout for a suspended session before it is dropped, in
    /// milliseconds. Hot-reloadable.
    #[arg(long, default_value_t = 300_000, env = "EDGE_GATEWAY_SUSPEND_TIMEOUT_MS")]
    pub suspend_timeout_ms: u64,

    /// Heartbeat interval, in milliseconds. Hot-reloadable.
    #[arg(long, default_value_t = 15_000, env = "EDGE_GATEWAY_HEALTH_CHECK_INTERVAL_MS")]
    pub health_check_interval_ms: u64,

    /// Per-connection priority lane buffer capacity. Hot-reloadable.
    #[arg(long, default_value_t = 256, env = "EDGE_GATEWAY_LANE_CAPACITY")]
    pub lane_capacity: usize,

    /// Per-connection inbound frame rate limit. Hot-reloadable.
    #[arg(long, default_value_t = 100, env = "EDGE_GATEWAY_MAX_FRAMES_PER_SECOND")]
    pub max_frames_per_second: u32,

    /// Maximum tracked conversation bindings. Hot-reloadable.
    #[arg(long, default_value_t = 100_000, env = "EDGE_GATEWAY_MAX_CONVERSATIONS")]
    pub max_conversations: usize,

    /// Conversation binding TTL, in milliseconds. Hot-reloadable.
    #[arg(long, default_value_t = 86_400_000, env = "EDGE_GATEWAY_CONVERSATION_TTL_MS")]
    pub conversation_ttl_ms: u64,

    /// Default conversation scope used when an adapter omits one.
    /// Hot-reloadable.
    #[arg(long, value_enum, default_value = "per-channel-peer", env = "EDGE_GATEWAY_DEFAULT_CONVERSATION_SCOPE")]
    pub default_conversation_scope: ConfigScope,
}

/// `clap::ValueEnum` mirror of `edge_gateway_core::ConversationScope`
/// (the core type intentionally has no CLI dependency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigScope {
    Main,
    PerPeer,
    PerChannelPeer,
    PerAccountChannelPeer,
}

impl From<ConfigScope> for ConversationScope {
    fn from(value: ConfigScope) -> Self {
        match value {
            ConfigScope::Main => ConversationScope::Main,
            ConfigScope::PerPeer => ConversationScope::PerPeer,
            ConfigScope::PerChannelPeer => ConversationScope::PerChannelPeer,
            ConfigScope::PerAccountChannelPeer => ConversationScope::PerAccountChannelPeer,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 7900,
            nexus_url: None,
            nexus_api_key: None,
            max_connections: 10_000,
            session_timeout_ms: 60_000,
            suspend_timeout_ms: 300_000,
            health_check_interval_ms: 15_000,
            lane_capacity: 256,
            max_frames_per_second: 100,
            max_conversations: 100_000,
            conversation_ttl_ms: 86_400_000,
            default_conversation_scope: ConfigScope::PerChannelPeer,
        }
    }
}

impl GatewayConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn suspend_timeout(&self) -> Duration {
        Duration::from_millis(self.suspend_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// Fields that `ConfigWatcher` may apply in place without a restart.
    pub fn hot_fields() -> &'static [&'static str] {
        &[
            "session_timeout_ms",
            "suspend_timeout_ms",
            "health_check_interval_ms",
            "lane_capacity",
            "max_frames_per_second",
            "max_conversations",
            "conversation_ttl_ms",
            "default_conversation_scope",
        ]
    }

    /// Fields that require a process restart to take effect.
    pub fn restart_required_fields() -> &'static [&'static str] {
        &["port", "nexus_url", "nexus_api_key", "max_connections"]
    }

    /// Names of the fields that changed between `self` and `other`.
    pub fn changed_fields(&self, other: &GatewayConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.port != other.port {
            changed.push("port");
        }
        if self.nexus_url != other.nexus_url {
            changed.push("nexus_url");
        }
        if self.nexus_api_key != other.nexus_api_key {
            changed.push("nexus_api_key");
        }
        if self.max_connections != other.max_connections {
            changed.push("max_connections");
        }
        if self.session_timeout_ms != other.session_timeout_ms {
            changed.push("session_timeout_ms");
        }
        if self.suspend_timeout_ms != other.suspend_timeout_ms {
            changed.push("suspend_timeout_ms");
        }
        if self.health_check_interval_ms != other.health_check_interval_ms {
            changed.push("health_check_interval_ms");
        }
        if self.lane_capacity != other.lane_capacity {
            changed.push("lane_capacity");
        }
        if self.max_frames_per_second != other.max_frames_per_second {
            changed.push("max_frames_per_second");
        }
        if self.max_conversations != other.max_conversations {
            changed.push("max_conversations");
        }
        if self.conversation_ttl_ms != other.conversation_ttl_ms {
            changed.push("conversation_ttl_ms");
        }
        if self.default_conversation_scope != other.default_conversation_scope {
            changed.push("default_conversation_scope");
        }
        changed
    }

    /// Split `changed_fields` into (hot, restart-required) buckets.
    pub fn partition_changes(&self, other: &GatewayConfig) -> (Vec<&'static str>, Vec<&'static str>) {
        let changed = self.changed_fields(other);
        let hot: Vec<&'static str> =
            changed.iter().copied().filter(|f| Self::hot_fields().contains(f)).collect();
        let restart: Vec<&'static str> =
            changed.iter().copied().filter(|f| Self::restart_required_fields().contains(f)).collect();
        (hot, restart)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

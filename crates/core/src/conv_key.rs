// SPDX-License-Identifier: BUSL-1.1

//! Deterministic conversation key resolution.

use crate::error::GatewayError;
use crate::message::{ConversationScope, MessageType};

/// A branded conversation key string. Construction is only possible via
/// [`resolve`], so every live `ConversationKey` is known-well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConversationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Input to [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolveInput<'a> {
    pub scope: ConversationScope,
    pub agent_id: &'a str,
    pub channel_id: &'a str,
    pub peer_id: Option<&'a str>,
    pub account_id: Option<&'a str>,
    pub group_id: Option<&'a str>,
    pub message_type: Option<MessageType>,
}

/// Effective scope a key actually ended up resolving to, which may differ
/// from the requested scope (degradation, or group dominance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveScope {
    Main,
    PerPeer,
    PerChannelPeer,
    PerAccountChannelPeer,
    Group,
}

/// Result of [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    pub key: ConversationKey,
    pub requested_scope: ConversationScope,
    pub effective_scope: EffectiveScope,
    pub degraded: bool,
    pub warnings: Vec<String>,
}

fn validate_no_colon(parts: &[(&str, &str)]) -> Result<(), GatewayError> {
    for (_name, value) in parts {
        if value.contains(':') {
            return Err(GatewayError::InvalidArgument);
        }
    }
    Ok(())
}

/// Resolve routing input into a `ConversationKey`. Pure function; see
/// the exact rule ordering reproduced here.
pub fn resolve(input: ResolveInput<'_>) -> Result<Resolution, GatewayError> {
    let mut id_parts = vec![("agentId", input.agent_id), ("channelId", input.channel_id)];
    if let Some(p) = input.peer_id {
        id_parts.push(("peerId", p));
    }
    if let Some(a) = input.account_id {
        id_parts.push(("accountId", a));
    }
    if let Some(g) = input.group_id {
        id_parts.push(("groupId", g));
    }
    validate_no_colon(&id_parts)?;

    if input.message_type == Some(MessageType::Group) {
        let group_id = input.group_id.ok_or(GatewayError::InvalidArgument)?;
        let key = format!("agent:{}:{}:group:{}", input.agent_id, input.channel_id, group_id);
        return Ok(Resolution {
            key: ConversationKey(key),
            requested_scope: input.scope,
            effective_scope: EffectiveScope::Group,
            degraded: false,
            warnings: vec![],
        });
    }

    match input.scope {
        ConversationScope::Main => Ok(Resolution {
            key: ConversationKey(format!("agent:{}:main", input.agent_id)),
            requested_scope: input.scope,
            effective_scope: EffectiveScope::Main,
            degraded: false,
            warnings: vec![],
        }),
        ConversationScope::PerPeer => {
            let peer_id = input.peer_id.ok_or(GatewayError::InvalidArgument)?;
            Ok(Resolution {
                key: ConversationKey(format!("agent:{}:dm:{}", input.agent_id, peer_id)),
                requested_scope: input.scope,
                effective_scope: EffectiveScope::PerPeer,
                degraded: false,
                warnings: vec![],
            })
        }
        ConversationScope::PerChannelPeer => {
            let peer_id = input.peer_id.ok_or(GatewayError::InvalidArgument)?;
            Ok(Resolution {
                key: ConversationKey(format!(
                    "agent:{}:{}:dm:{}",
                    input.agent_id, input.channel_id, peer_id
                )),
                requested_scope: input.scope,
                effective_scope: EffectiveScope::PerChannelPeer,
                degraded: false,
                warnings: vec![],
            })
        }
        ConversationScope::PerAccountChannelPeer => {
            let peer_id = input.peer_id.ok_or(GatewayError::InvalidArgument)?;
            match input.account_id {
                Some(account_id) => Ok(Resolution {
                    key: ConversationKey(format!(
                        "agent:{}:{}:{}:dm:{}",
                        input.agent_id, input.channel_id, account_id, peer_id
                    )),
                    requested_scope: input.scope,
                    effective_scope: EffectiveScope::PerAccountChannelPeer,
                    degraded: false,
                    warnings: vec![],
                }),
                None => Ok(Resolution {
                    key: ConversationKey(format!(
                        "agent:{}:{}:dm:{}",
                        input.agent_id, input.channel_id, peer_id
                    )),
                    requested_scope: input.scope,
                    effective_scope: EffectiveScope::PerChannelPeer,
                    degraded: true,
                    warnings: vec![format!(
                        "degraded from per-account-channel-peer to per-channel-peer: \
                         accountId missing"
                    )],
                }),
            }
        }
    }
}

/// Parsed components of a conversation key, for debugging/observability.
/// Not on any hot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub agent_id: String,
    pub channel_id: Option<String>,
    pub account_id: Option<String>,
    pub peer_id: Option<String>,
    pub group_id: Option<String>,
    pub scope: EffectiveScope,
}

/// Parse a conversation key string back into its components, for
/// debugging. Returns `None` for anything that doesn't match one of the
/// five known formats.
pub fn parse(key: &str) -> Option<ParsedKey> {
    let parts: Vec<&str> = key.split(':').collect();
    match parts.as_slice() {
        ["agent", agent_id, "main"] => Some(ParsedKey {
            agent_id: (*agent_id).to_string(),
            channel_id: None,
            account_id: None,
            peer_id: None,
            group_id: None,
            scope: EffectiveScope::Main,
        }),
        ["agent", agent_id, "dm", peer_id] => Some(ParsedKey {
            agent_id: (*agent_id).to_string(),
            channel_id: None,
            account_id: None,
            peer_id: Some((*peer_id).to_string()),
            group_id: None,
            scope: EffectiveScope::PerPeer,
        }),
        ["agent", agent_id, channel_id, "dm", peer_id] => Some(ParsedKey {
            agent_id: (*agent_id).to_string(),
            channel_id: Some((*channel_id).to_string()),
            account_id: None,
            peer_id: Some((*peer_id).to_string()),
            group_id: None,
            scope: EffectiveScope::PerChannelPeer,
        }),
        ["agent", agent_id, channel_id, account_id, "dm", peer_id] => Some(ParsedKey {
            agent_id: (*agent_id).to_string(),
            channel_id: Some((*channel_id).to_string()),
            account_id: Some((*account_id).to_string()),
            peer_id: Some((*peer_id).to_string()),
            group_id: None,
            scope: EffectiveScope::PerAccountChannelPeer,
        }),
        ["agent", agent_id, channel_id, "group", group_id] => Some(ParsedKey {
            agent_id: (*agent_id).to_string(),
            channel_id: Some((*channel_id).to_string()),
            account_id: None,
            peer_id: None,
            group_id: Some((*group_id).to_string()),
            scope: EffectiveScope::Group,
        }),
        _ => None,
    }
}

#[cfg(test)]
#[path = "conv_key_tests.rs"]
mod tests;

//! Remote-authority protocol: wire messages and the outgoing transport.
//!
//! Module fetches cross a process boundary. The runtime sends a
//! [`ModuleRequest`] and, at some later tick, receives a [`ModulePayload`]
//! carrying the module's capability definition. In environments with
//! several concurrent UI clients every message carries a [`SessionToken`];
//! payloads for another session are dropped on delivery.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Correlation token identifying one UI client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionToken {
    /// The token used when only one client talks to the authority.
    fn default() -> Self {
        Self("local".to_owned())
    }
}

/// Outgoing request: "send me the definition of this module".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRequest {
    pub module: String,
    pub token: SessionToken,
}

/// Inbound response: the module's capability definition is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePayload {
    pub module: String,
    pub token: SessionToken,
    /// The capability definition, decoded into a table on delivery.
    pub definition: serde_json::Value,
}

/// Outgoing side of the remote protocol.
pub trait RemoteAuthority {
    /// Issue an asynchronous fetch. Must not block; the reply arrives later
    /// as a [`ModulePayload`].
    fn request_module(&self, request: ModuleRequest);
}

/// A [`RemoteAuthority`] that writes requests onto an in-process channel.
///
/// The receiving half belongs to whatever drives the session's message
/// traffic (a network bridge in production, the test itself in tests).
pub struct ChannelAuthority {
    sender: UnboundedSender<ModuleRequest>,
}

impl ChannelAuthority {
    pub fn new(sender: UnboundedSender<ModuleRequest>) -> Self {
        Self { sender }
    }
}

impl RemoteAuthority for ChannelAuthority {
    fn request_module(&self, request: ModuleRequest) {
        if let Err(err) = self.sender.send(request) {
            warn!(module = err.0.module.as_str(), "authority channel closed; request dropped");
        }
    }
}

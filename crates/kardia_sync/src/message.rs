//! Wire shapes for the push channel.
//!
//! The backend defines exact framing; these are the conceptual shapes with an
//! internally-tagged `type` field. Unparseable frames are ignored upstream.

use kardia_core::state::{LimbicDelta, LimbicState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Incoming push-channel message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full-state replacement; the server is authoritative.
    StateReplace { state: LimbicState },
    /// Partial delta, applied like a local update. When `token` matches a
    /// client-assigned idempotency token, the message is an echo of our own
    /// outbound send and must not be applied twice.
    StateDelta {
        delta: LimbicDelta,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<Uuid>,
    },
}

/// Outbound push-channel message, tagged with a client-assigned idempotency
/// token so the backend's echo can be recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Interaction { kind: String, token: Uuid },
}

impl ClientMessage {
    pub fn interaction(kind: impl Into<String>) -> Self {
        ClientMessage::Interaction {
            kind: kind.into(),
            token: Uuid::new_v4(),
        }
    }

    pub fn token(&self) -> Uuid {
        match self {
            ClientMessage::Interaction { token, .. } => *token,
        }
    }
}

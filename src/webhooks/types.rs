// src/webhooks/types.rs
//! Payload types pushed by the agents' webhook notification channel.
//!
//! Every field the runner reads is optional at the serde layer: the channel
//! documents no delivery guarantees, so a missing field downgrades to a
//! logged skip instead of a decode failure.

use serde::{Deserialize, Serialize};

/// `connections` topic payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionsPayload {
    pub connection_id: Option<String>,
    pub state: Option<String>,
}

/// `issue_credential_v2_0` topic payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialExchangePayload {
    pub cred_ex_id: Option<String>,
    pub state: Option<String>,
    pub role: Option<String>,
}

/// `present_proof_v2_0` topic payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresentationExchangePayload {
    pub pres_ex_id: Option<String>,
    pub state: Option<String>,
    pub role: Option<String>,
    pub verified: Option<String>,
}

/// `ping` topic payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PingPayload {
    pub thread_id: Option<String>,
    pub state: Option<String>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_deserialize_to_none() {
        let payload: CredentialExchangePayload =
            serde_json::from_value(json!({ "state": "done" })).unwrap();
        assert!(payload.cred_ex_id.is_none());
        assert_eq!(payload.state.as_deref(), Some("done"));
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let payload: PingPayload = serde_json::from_value(json!({
            "thread_id": "t-1",
            "state": "received",
            "comment": "test-ping 4",
            "responded": true,
        }))
        .unwrap();
        assert_eq!(payload.thread_id.as_deref(), Some("t-1"));
    }
}

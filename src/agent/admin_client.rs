// src/agent/admin_client.rs
//! Thin reqwest wrapper over a cloud agent's HTTP admin API (the command
//! channel). Initiation calls return once the agent acknowledges the
//! command; exchange progress arrives separately over the webhook channel.

use crate::error::PerfError;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

pub const CRED_PREVIEW_TYPE: &str =
    "https://didcomm.org/issue-credential/2.0/credential-preview";

pub struct AdminClient {
    http: Client,
    base: Url,
    label: String,
}

impl AdminClient {
    pub fn new(base_url: &str, label: &str) -> Result<Self, PerfError> {
        let base = Url::parse(base_url).map_err(|e| {
            PerfError::ConfigError(format!("invalid admin url {}: {}", base_url, e))
        })?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PerfError::AdminRequest(e.to_string()))?;
        Ok(Self {
            http,
            base,
            label: label.to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn endpoint(&self, path: &str) -> Result<Url, PerfError> {
        self.base.join(path).map_err(|e| {
            PerfError::AdminRequest(format!("{}: bad path {}: {}", self.label, path, e))
        })
    }

    async fn admin_post(&self, path: &str, body: &Value) -> Result<Value, PerfError> {
        let url = self.endpoint(path)?;
        debug!("{} POST {}", self.label, path);
        let response = self.http.post(url).json(body).send().await?;
        self.decode(path, response).await
    }

    async fn admin_get(&self, path: &str) -> Result<Value, PerfError> {
        let url = self.endpoint(path)?;
        debug!("{} GET {}", self.label, path);
        let response = self.http.get(url).send().await?;
        self.decode(path, response).await
    }

    async fn decode(&self, path: &str, response: reqwest::Response) -> Result<Value, PerfError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PerfError::AdminRequest(format!(
                "{} {} returned {}: {}",
                self.label, path, status, body
            )));
        }
        response.json::<Value>().await.map_err(|e| {
            PerfError::InvalidResponse(format!("{} {}: {}", self.label, path, e))
        })
    }

    fn str_field(value: &Value, field: &str, context: &str) -> Result<String, PerfError> {
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PerfError::InvalidResponse(format!("{} missing `{}`", context, field))
            })
    }

    // --- connections ---

    /// Create a connection invitation; returns the invitation body to hand
    /// to the other agent plus this side's connection id.
    pub async fn create_invitation(&self) -> Result<(String, Value), PerfError> {
        let response = self
            .admin_post("/connections/create-invitation", &json!({}))
            .await?;
        let connection_id = Self::str_field(&response, "connection_id", "create-invitation")?;
        let invitation = response
            .get("invitation")
            .cloned()
            .ok_or_else(|| {
                PerfError::InvalidResponse("create-invitation missing `invitation`".to_string())
            })?;
        Ok((connection_id, invitation))
    }

    pub async fn receive_invitation(&self, invitation: &Value) -> Result<String, PerfError> {
        let response = self
            .admin_post("/connections/receive-invitation", invitation)
            .await?;
        Self::str_field(&response, "connection_id", "receive-invitation")
    }

    /// Send a trust ping over an active connection; returns the ping's
    /// thread id, which keys its webhook notifications.
    pub async fn send_ping(
        &self,
        connection_id: &str,
        comment: &str,
    ) -> Result<String, PerfError> {
        let response = self
            .admin_post(
                &format!("/connections/{}/send-ping", connection_id),
                &json!({ "comment": comment }),
            )
            .await?;
        Self::str_field(&response, "thread_id", "send-ping")
    }

    // --- schema / credential definition ---

    pub async fn publish_schema(
        &self,
        name: &str,
        version: &str,
        attributes: &[&str],
    ) -> Result<String, PerfError> {
        let body = json!({
            "schema_name": name,
            "schema_version": version,
            "attributes": attributes,
        });
        let response = self.admin_post("/schemas", &body).await?;
        Self::str_field(&response, "schema_id", "schemas")
    }

    pub async fn publish_credential_definition(
        &self,
        schema_id: &str,
    ) -> Result<String, PerfError> {
        let body = json!({ "schema_id": schema_id, "support_revocation": false });
        let response = self.admin_post("/credential-definitions", &body).await?;
        Self::str_field(
            &response,
            "credential_definition_id",
            "credential-definitions",
        )
    }

    /// Fetch a credential definition, warming the agent's local cache.
    pub async fn fetch_credential_definition(
        &self,
        credential_definition_id: &str,
    ) -> Result<Value, PerfError> {
        self.admin_get(&format!(
            "/credential-definitions/{}",
            credential_definition_id
        ))
        .await
    }

    // --- exchange initiation ---

    /// Fire one credential issuance exchange. The returned ack does not
    /// carry completion; that arrives over the webhook channel.
    pub async fn send_credential(
        &self,
        connection_id: &str,
        credential_definition_id: &str,
        attributes: &[(String, String)],
        comment: &str,
    ) -> Result<(), PerfError> {
        let preview_attrs: Vec<Value> = attributes
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect();
        let body = json!({
            "connection_id": connection_id,
            "filter": { "indy": { "cred_def_id": credential_definition_id } },
            "credential_preview": {
                "@type": CRED_PREVIEW_TYPE,
                "attributes": preview_attrs,
            },
            "comment": comment,
            "auto_remove": true,
        });
        self.admin_post("/issue-credential-2.0/send", &body)
            .await
            .map(|_| ())
    }

    /// Fire one proof/presentation request exchange.
    pub async fn send_presentation_request(
        &self,
        connection_id: &str,
        request: Value,
    ) -> Result<(), PerfError> {
        let body = json!({
            "connection_id": connection_id,
            "presentation_request": { "indy": request },
        });
        self.admin_post("/present-proof-2.0/send-request", &body)
            .await
            .map(|_| ())
    }
}

/// Indy-style proof request asking for every listed attribute, restricted to
/// the given schema.
pub fn proof_request(name: &str, schema_name: &str, attributes: &[&str]) -> Value {
    let requested: serde_json::Map<String, Value> = attributes
        .iter()
        .map(|attr| {
            (
                format!("0_{}_uuid", attr),
                json!({
                    "name": attr,
                    "restrictions": [{ "schema_name": schema_name }],
                }),
            )
        })
        .collect();
    json!({
        "name": name,
        "version": "1.0",
        "nonce": uuid::Uuid::new_v4().as_u128().to_string(),
        "requested_attributes": requested,
        "requested_predicates": {},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_invalid_base_url() {
        assert!(AdminClient::new("not a url", "issuer").is_err());
    }

    #[test]
    fn endpoint_joins_against_the_base() {
        let client = AdminClient::new("http://127.0.0.1:8021", "issuer").unwrap();
        let url = client.endpoint("/connections/create-invitation").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8021/connections/create-invitation"
        );
    }

    #[test]
    fn str_field_reports_the_missing_key() {
        let err =
            AdminClient::str_field(&json!({ "other": 1 }), "connection_id", "receive-invitation")
                .unwrap_err();
        assert!(err.to_string().contains("connection_id"));
    }

    #[test]
    fn proof_request_covers_every_attribute() {
        let request = proof_request("Proof of Performance", "perf schema", &["name", "score"]);
        let requested = request["requested_attributes"].as_object().unwrap();
        assert_eq!(requested.len(), 2);
        assert!(requested.contains_key("0_name_uuid"));
        assert_eq!(
            requested["0_score_uuid"]["restrictions"][0]["schema_name"],
            "perf schema"
        );
        assert!(!request["nonce"].as_str().unwrap().is_empty());
    }
}

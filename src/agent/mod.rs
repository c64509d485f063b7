// src/agent/mod.rs
//! Peer agent integration: the HTTP admin command channel and connection
//! tracking fed by the `connections` webhook topic.

pub mod admin_client;
pub mod connection;

pub use admin_client::{proof_request, AdminClient, CRED_PREVIEW_TYPE};
pub use connection::ConnectionTracker;

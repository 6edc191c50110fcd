//! Signed JSON-RPC client for the iWAN WebSocket API.
//!
//! Implements [`IwanRpc`](super::IwanRpc) over `tokio-tungstenite`: one
//! connection per call, HMAC-SHA256 signed envelopes, bounded connect and
//! response waits, and optional request rate limiting.

mod client;
mod connection;
mod protocol;

pub use client::{ClientOptions, WsRpcClient, DEFAULT_BASE_URI};

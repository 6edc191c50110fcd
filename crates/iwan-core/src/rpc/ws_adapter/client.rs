use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{CoreError, RpcError, TimeoutStage};
use crate::signer::Signer;
use crate::types::{ChainType, Envelope, Params, REQUEST_ID};

use super::super::IwanRpc;
use super::connection::resolve_endpoint;
use super::protocol::decode_response;

/// Production iWAN endpoint used when no base URI is configured.
pub const DEFAULT_BASE_URI: &str = "wss://api.wanchain.org:8443/ws/v3/";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Tunables for [`WsRpcClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Bound on TCP connect plus TLS and WebSocket handshakes.
    pub connect_timeout: Duration,
    /// Bound on sending the request frame and receiving the response.
    pub response_timeout: Duration,
    /// If set, outbound calls are throttled to this many per second.
    pub requests_per_second: Option<u32>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            requests_per_second: None,
        }
    }
}

/// Signed JSON-RPC client for the iWAN WebSocket API.
///
/// Every call opens its own connection, sends exactly one signed request,
/// waits for exactly one response, and closes the connection. Nothing is
/// pooled and nothing is retried; concurrent calls on one client share only
/// the read-only credentials and endpoint (plus the optional rate limiter).
pub struct WsRpcClient {
    endpoint: String,
    signer: Signer,
    limiter: Option<DirectRateLimiter>,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl std::fmt::Debug for WsRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsRpcClient")
            .field("endpoint", &self.endpoint)
            .field("rate_limited", &self.limiter.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl WsRpcClient {
    /// Create a client with default timeouts and no rate limit.
    pub fn new(base_uri: &str, api_key: &str, secret_key: &str) -> Result<Self, CoreError> {
        Self::with_options(base_uri, api_key, secret_key, ClientOptions::default())
    }

    /// Create a client.
    ///
    /// The endpoint is `base_uri` (with a `/` appended if missing) followed
    /// by `api_key`. The secret key stays in memory only; it is never sent
    /// or logged.
    pub fn with_options(
        base_uri: &str,
        api_key: &str,
        secret_key: &str,
        options: ClientOptions,
    ) -> Result<Self, CoreError> {
        let endpoint = resolve_endpoint(base_uri, api_key)?;
        let signer = Signer::new(secret_key)?;

        if options.connect_timeout.is_zero() || options.response_timeout.is_zero() {
            return Err(CoreError::Config("timeouts must be non-zero".to_owned()));
        }

        let limiter = match options.requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::Config("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            endpoint,
            signer,
            limiter,
            connect_timeout: options.connect_timeout,
            response_timeout: options.response_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build, timestamp and sign a request, returning the exact frame text
    /// that [`Self::round_trip`] would transmit.
    pub fn prepare(
        &self,
        method: &str,
        chain_type: Option<ChainType>,
        params: Params,
    ) -> Result<String, CoreError> {
        let mut envelope = Envelope::new(method, chain_type, params)?;
        let material = self.signer.sign(&mut envelope)?;
        material.attach(&mut envelope);
        envelope.to_canonical_string()
    }

    /// Send one pre-built frame and return the raw response frame text.
    ///
    /// The connection is closed before returning, on success and on failure.
    pub async fn round_trip(&self, frame: &str) -> Result<String, CoreError> {
        self.wait_for_rate_limit().await;

        let connect = connect_async(self.endpoint.as_str());
        let (mut socket, _handshake) = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| RpcError::Timeout {
                stage: TimeoutStage::Connect,
                after: self.connect_timeout,
            })?
            .map_err(RpcError::Transport)?;

        let outcome = exchange(&mut socket, frame, self.response_timeout).await;

        // A peer that stopped reading can stall the close handshake too.
        match timeout(self.connect_timeout, socket.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(error = %err, "websocket close after rpc exchange failed"),
            Err(_) => debug!(after = ?self.connect_timeout, "websocket close timed out"),
        }
        outcome
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[async_trait]
impl IwanRpc for WsRpcClient {
    async fn call(
        &self,
        method: &str,
        chain_type: Option<ChainType>,
        params: Params,
    ) -> Result<Value, CoreError> {
        let frame = self.prepare(method, chain_type, params)?;
        debug!(
            rpc.id = REQUEST_ID,
            rpc.method = method,
            rpc.chain = chain_type.map(ChainType::as_str),
            frame_len = frame.len(),
            "rpc call"
        );
        trace!(rpc.method = method, body = %frame, "rpc request body");

        let body = self.round_trip(&frame).await?;
        debug!(rpc.id = REQUEST_ID, rpc.method = method, body_len = body.len(), "rpc response");
        trace!(rpc.method = method, body = %body, "rpc response body");

        decode_response(&body)
    }
}

async fn exchange<S>(
    socket: &mut WebSocketStream<S>,
    frame: &str,
    response_timeout: Duration,
) -> Result<String, CoreError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let send_and_receive = async {
        socket
            .send(Message::text(frame.to_owned()))
            .await
            .map_err(RpcError::Transport)?;
        next_response(socket).await
    };

    timeout(response_timeout, send_and_receive)
        .await
        .map_err(|_| RpcError::Timeout {
            stage: TimeoutStage::Response,
            after: response_timeout,
        })?
}

// Control frames are skipped; the first data frame is the response.
async fn next_response<S>(socket: &mut WebSocketStream<S>) -> Result<String, CoreError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(message) = socket.next().await {
        match message.map_err(RpcError::Transport)? {
            Message::Text(text) => return Ok(text.as_str().to_owned()),
            Message::Binary(bytes) => {
                return String::from_utf8(bytes.to_vec()).map_err(|e| {
                    RpcError::InvalidResponse(format!("binary response frame is not UTF-8: {e}"))
                        .into()
                });
            }
            Message::Close(close) => {
                debug!(?close, "server closed the connection before responding");
                return Err(RpcError::ConnectionClosed.into());
            }
            _ => continue,
        }
    }
    Err(RpcError::ConnectionClosed.into())
}

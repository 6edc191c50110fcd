//! Request-side domain types for the iWAN protocol.
//!
//! Contains the JSON-RPC request [`Envelope`], the [`ChainType`]
//! discriminator, the parameter map alias, [`BlockRef`] for calls that
//! accept either a block number or a block hash, [`BlockTag`] for range
//! bounds, and the ASCII-only canonical JSON encoding requests are signed in.

use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// JSON-RPC protocol tag carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation id of every request. One request per connection, so the id
/// never needs to vary.
pub const REQUEST_ID: u64 = 1;

/// Parameter key carrying the chain discriminator.
pub const CHAIN_TYPE_KEY: &str = "chainType";
/// Parameter key carrying the signing timestamp (milliseconds since epoch).
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Parameter key carrying the base64 HMAC-SHA256 signature.
pub const SIGNATURE_KEY: &str = "signature";

const RESERVED_KEYS: [&str; 3] = [CHAIN_TYPE_KEY, TIMESTAMP_KEY, SIGNATURE_KEY];

/// Call parameters. Keys keep their insertion order, which is what both the
/// signature and the transmitted frame are computed over.
pub type Params = serde_json::Map<String, Value>;

// ==============================================================================
// Chain Type
// ==============================================================================

/// The ledger a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainType {
    Wan,
    Eth,
    Btc,
    Eos,
}

impl ChainType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wan => "WAN",
            Self::Eth => "ETH",
            Self::Btc => "BTC",
            Self::Eos => "EOS",
        }
    }
}

impl std::fmt::Display for ChainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WAN" => Ok(Self::Wan),
            "ETH" => Ok(Self::Eth),
            "BTC" => Ok(Self::Btc),
            "EOS" => Ok(Self::Eos),
            _ => Err(CoreError::InvalidRequest(format!(
                "unknown chain type `{s}`; expected one of WAN, ETH, BTC, EOS"
            ))),
        }
    }
}

impl From<ChainType> for Value {
    fn from(chain: ChainType) -> Self {
        Value::String(chain.as_str().to_owned())
    }
}

// ==============================================================================
// Block Reference
// ==============================================================================

/// Selects a block either by height or by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    Number(u64),
    Hash(String),
}

impl BlockRef {
    pub(crate) fn add_to(&self, params: ParamsBuilder) -> ParamsBuilder {
        match self {
            Self::Number(n) => params.with("blockNumber", *n),
            Self::Hash(h) => params.with("blockHash", h.as_str()),
        }
    }
}

/// Bound of a block range: a height or the `latest` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Number(u64),
    Latest,
}

impl From<u64> for BlockTag {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl From<BlockTag> for Value {
    fn from(tag: BlockTag) -> Self {
        match tag {
            BlockTag::Number(n) => Value::from(n),
            BlockTag::Latest => Value::String("latest".to_owned()),
        }
    }
}

// ==============================================================================
// Params Builder
// ==============================================================================

/// Small builder for insertion-ordered call parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamsBuilder(Params);

impl ParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    /// Insert `key` only when `value` is present; absent optionals are
    /// omitted rather than sent as `null`.
    pub fn with_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn build(self) -> Params {
        self.0
    }
}

// ==============================================================================
// Request Envelope
// ==============================================================================

/// A JSON-RPC request as signed and transmitted.
///
/// Field order here is the wire order: `jsonrpc`, `method`, `params`, `id`.
/// The serializer emits compact JSON, so the canonical form is simply the
/// serialized struct.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    jsonrpc: &'static str,
    method: String,
    params: Params,
    id: u64,
}

impl Envelope {
    /// Build an unsigned envelope.
    ///
    /// When `chain_type` is given it becomes the first parameter key. Call
    /// parameters may not use any reserved key (`chainType`, `timestamp`,
    /// `signature`).
    pub fn new(
        method: &str,
        chain_type: Option<ChainType>,
        params: Params,
    ) -> Result<Self, CoreError> {
        if method.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "method name must not be empty".to_owned(),
            ));
        }
        if let Some(key) = RESERVED_KEYS.iter().find(|key| params.contains_key(**key)) {
            return Err(CoreError::InvalidRequest(format!(
                "parameter `{key}` is reserved and set by the client"
            )));
        }

        let mut ordered = Params::with_capacity(params.len() + 3);
        if let Some(chain) = chain_type {
            ordered.insert(CHAIN_TYPE_KEY.to_owned(), chain.into());
        }
        ordered.extend(params);

        Ok(Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.to_owned(),
            params: ordered,
            id: REQUEST_ID,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_signed(&self) -> bool {
        self.params.contains_key(SIGNATURE_KEY)
    }

    /// Compact JSON with keys in insertion order and non-ASCII escaped.
    pub fn to_canonical_string(&self) -> Result<String, CoreError> {
        canonical_json(self)
            .map_err(|e| CoreError::InvalidRequest(format!("serialize request envelope: {e}")))
    }

    // Only the signer and the transport append parameters after construction.
    pub(crate) fn insert_param(&mut self, key: &str, value: Value) {
        self.params.insert(key.to_owned(), value);
    }
}

// ==============================================================================
// Canonical Encoding
// ==============================================================================

/// Compact formatter that writes every character outside printable ASCII as
/// a lowercase `\uXXXX` escape, using surrogate pairs above the BMP. Both
/// ends of the connection then hash the same ASCII bytes.
struct AsciiEscaped;

impl serde_json::ser::Formatter for AsciiEscaped {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Serialize `value` in the form requests are signed and sent in.
pub(crate) fn canonical_json<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, AsciiEscaped);
    value.serialize(&mut serializer)?;
    // The formatter emits ASCII only.
    Ok(buf.into_iter().map(char::from).collect())
}

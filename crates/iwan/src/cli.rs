use clap::{Parser, Subcommand};
use serde_json::Value;

use iwan_core::{ChainType, DEFAULT_BASE_URI};

/// Signed JSON-RPC client for the iWAN WebSocket API.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Base WebSocket URI; the API key is appended as the final path segment.
    #[arg(long, default_value = DEFAULT_BASE_URI, env = "IWAN_BASE_URI")]
    pub base_uri: String,

    /// iWAN API key (public identifier).
    #[arg(long, env = "IWAN_API_KEY")]
    pub api_key: String,

    /// iWAN secret key used to sign requests. Never transmitted.
    #[arg(long, env = "IWAN_SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// Seconds allowed for connecting (TCP, TLS and WebSocket handshake).
    #[arg(long, default_value = "10")]
    pub connect_timeout_secs: u64,

    /// Seconds allowed for the response after the request is sent.
    #[arg(long, default_value = "30")]
    pub response_timeout_secs: u64,

    /// Throttle outbound calls to this many per second.
    #[arg(long)]
    pub requests_per_second: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send an arbitrary signed call and print its result.
    Call {
        /// Remote method name, e.g. `getBlockNumber`.
        method: String,

        /// Chain type sent as `chainType`; omit for methods without one.
        #[arg(long, value_parser = parse_chain)]
        chain: Option<ChainType>,

        /// Call parameter as `key=value` (repeatable). The value is parsed
        /// as JSON and falls back to a plain string.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },

    /// Latest block number.
    BlockNumber {
        #[arg(long, default_value = "WAN", value_parser = parse_chain)]
        chain: ChainType,
    },

    /// Balance of one address.
    Balance {
        address: String,
        #[arg(long, default_value = "WAN", value_parser = parse_chain)]
        chain: ChainType,
    },

    /// Current gas price in wei.
    GasPrice {
        #[arg(long, default_value = "WAN", value_parser = parse_chain)]
        chain: ChainType,
    },

    /// Receipt of a transaction.
    TxReceipt {
        tx_hash: String,
        #[arg(long, default_value = "WAN", value_parser = parse_chain)]
        chain: ChainType,
    },

    /// Token metadata (symbol, decimals).
    TokenInfo {
        token_sc_addr: String,
        #[arg(long, default_value = "WAN", value_parser = parse_chain)]
        chain: ChainType,
    },

    /// Current PoS epoch id.
    EpochId,
}

fn parse_chain(raw: &str) -> Result<ChainType, String> {
    raw.parse().map_err(|e: iwan_core::CoreError| e.to_string())
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `key=value`, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter key must not be empty in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

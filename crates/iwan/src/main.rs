mod cli;

use std::time::Duration;

use clap::Parser;
use eyre::{eyre, WrapErr};
use serde_json::Value;

use iwan_core::{ChainType, ClientOptions, CoreError, IwanRpc, Params, WsRpcClient};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let options = ClientOptions {
        connect_timeout: Duration::from_secs(args.connect_timeout_secs),
        response_timeout: Duration::from_secs(args.response_timeout_secs),
        requests_per_second: args.requests_per_second,
    };
    let client = WsRpcClient::with_options(&args.base_uri, &args.api_key, &args.secret_key, options)
        .context("build iWAN client")?;
    tracing::debug!(endpoint = client.endpoint(), "iWAN client ready");

    let result = run(&client, args.command).await.map_err(|err| {
        if err.is_retryable() {
            let message = format_rpc_connect_error(&args.base_uri, &err.to_string());
            eyre!(message).wrap_err("while calling the iWAN endpoint")
        } else {
            eyre!(err).wrap_err("iWAN call failed")
        }
    })?;

    let rendered = serde_json::to_string_pretty(&result).context("render result as JSON")?;
    println!("{rendered}");
    Ok(())
}

async fn run(rpc: &dyn IwanRpc, command: cli::Command) -> Result<Value, CoreError> {
    use cli::Command;

    match command {
        Command::Call {
            method,
            chain,
            params,
        } => {
            let params: Params = params.into_iter().collect();
            rpc.call(&method, chain, params).await
        }
        Command::BlockNumber { chain } => rpc.get_block_number(chain).await,
        Command::Balance { address, chain } => rpc.get_balance(&address, chain).await,
        Command::GasPrice { chain } => rpc.get_gas_price(chain).await,
        Command::TxReceipt { tx_hash, chain } => rpc.get_transaction_receipt(&tx_hash, chain).await,
        Command::TokenInfo {
            token_sc_addr,
            chain,
        } => rpc.get_token_info(&token_sc_addr, chain).await,
        Command::EpochId => rpc.get_epoch_id(ChainType::Wan).await,
    }
}

fn format_rpc_connect_error(base_uri: &str, source_error: &str) -> String {
    let mut lines = vec![
        format!("could not complete a round trip with `{base_uri}`"),
        format!("RPC error: {source_error}"),
    ];

    if source_error.contains("failed to lookup address") || source_error.contains("dns error") {
        lines.push(
            "hint: hostname resolution failed; verify the base URI hostname and your DNS/network"
                .into(),
        );
    } else if source_error.contains("tls")
        || source_error.contains("TLS")
        || source_error.contains("certificate")
    {
        lines.push(
            "hint: TLS handshake failed; verify certificate trust and that the endpoint uses wss"
                .into(),
        );
    } else if source_error.contains("401") || source_error.contains("403") {
        lines.push("hint: the server refused the handshake; verify --api-key".into());
    } else if source_error.contains("timed out") {
        lines.push(
            "hint: the endpoint did not answer in time; raise --connect-timeout-secs or --response-timeout-secs"
                .into(),
        );
    } else if source_error.contains("Connection refused") {
        lines.push("hint: nothing is listening at that address; verify host and port".into());
    }

    lines.join("\n")
}

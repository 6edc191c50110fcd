//! iWAN RPC abstraction layer.
//!
//! Defines the [`IwanRpc`] trait and provides a WebSocket implementation
//! ([`WsRpcClient`]) plus a test mock (`mock::MockRpc`).

#[cfg(test)]
pub mod mock;
mod ws_adapter;

pub use ws_adapter::{ClientOptions, WsRpcClient, DEFAULT_BASE_URI};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{BlockRef, BlockTag, ChainType, Params, ParamsBuilder};

/// The iWAN API surface.
///
/// Implementations only provide [`call`](IwanRpc::call): one signed request,
/// one decoded `result`. Every other method shapes its parameters and
/// delegates to it. Results are returned as raw JSON; this crate does not
/// interpret balances, blocks or staking data.
#[async_trait]
pub trait IwanRpc: Send + Sync {
    /// Send `method` with `params` and return the response's `result`.
    ///
    /// `chain_type`, when given, is sent as the leading `chainType`
    /// parameter. Some methods (the cross-chain ratio queries, for example)
    /// never carry one.
    async fn call(
        &self,
        method: &str,
        chain_type: Option<ChainType>,
        params: Params,
    ) -> Result<Value, CoreError>;

    // ==========================================================================
    // Accounts
    // ==========================================================================

    /// Balance of a single address.
    async fn get_balance(&self, address: &str, chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getBalance", Some(chain), params).await
    }

    /// Balances of several addresses in one call.
    async fn get_multi_balances(
        &self,
        addresses: &[String],
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", addresses).build();
        self.call("getMultiBalances", Some(chain), params).await
    }

    async fn get_nonce(&self, address: &str, chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getNonce", Some(chain), params).await
    }

    /// Nonce counting pending transactions.
    async fn get_nonce_include_pending(
        &self,
        address: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getNonceIncludePending", Some(chain), params).await
    }

    /// UTXOs of `addresses` with confirmations in `minconf..=maxconf`.
    async fn get_utxo(
        &self,
        addresses: &[String],
        minconf: u64,
        maxconf: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", addresses)
            .with("minconf", minconf)
            .with("maxconf", maxconf)
            .build();
        self.call("getUTXO", Some(chain), params).await
    }

    /// Ask the node to watch `address` for transactions.
    async fn import_address(&self, address: &str, chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("importAddress", Some(chain), params).await
    }

    // ==========================================================================
    // Blocks
    // ==========================================================================

    async fn get_block_by_hash(
        &self,
        block_hash: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("blockHash", block_hash).build();
        self.call("getBlockByHash", Some(chain), params).await
    }

    async fn get_block_by_number(
        &self,
        block_number: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("blockNumber", block_number).build();
        self.call("getBlockByNumber", Some(chain), params).await
    }

    /// Latest block number.
    async fn get_block_number(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getBlockNumber", Some(chain), Params::new()).await
    }

    async fn get_block_transaction_count(
        &self,
        block: &BlockRef,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = block.add_to(ParamsBuilder::new()).build();
        self.call("getBlockTransactionCount", Some(chain), params)
            .await
    }

    // ==========================================================================
    // Contracts
    // ==========================================================================

    /// Call a public (constant) function of a contract.
    async fn call_sc_func(
        &self,
        sc_addr: &str,
        name: &str,
        args: &[Value],
        abi: &Value,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("scAddr", sc_addr)
            .with("name", name)
            .with("args", args)
            .with("abi", abi.clone())
            .build();
        self.call("callScFunc", Some(chain), params).await
    }

    /// Read one entry of a public contract map.
    async fn get_sc_map(
        &self,
        sc_addr: &str,
        name: &str,
        key: &str,
        abi: &Value,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("scAddr", sc_addr)
            .with("name", name)
            .with("key", key)
            .with("abi", abi.clone())
            .build();
        self.call("getScMap", Some(chain), params).await
    }

    /// Read a public contract variable.
    async fn get_sc_var(
        &self,
        sc_addr: &str,
        name: &str,
        abi: &Value,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("scAddr", sc_addr)
            .with("name", name)
            .with("abi", abi.clone())
            .build();
        self.call("getScVar", Some(chain), params).await
    }

    // ==========================================================================
    // Cross-chain
    // ==========================================================================
    //
    // These name the foreign chain via `crossChain` and never send `chainType`.

    /// Native coin to WAN exchange ratio (precision 10000).
    async fn get_coin_2_wan_ratio(&self, cross_chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("crossChain", cross_chain).build();
        self.call("getCoin2WanRatio", None, params).await
    }

    /// Tokens registered for cross-chain transfer.
    async fn get_reg_tokens(&self, cross_chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("crossChain", cross_chain).build();
        self.call("getRegTokens", None, params).await
    }

    async fn get_storeman_groups(&self, cross_chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("crossChain", cross_chain).build();
        self.call("getStoremanGroups", None, params).await
    }

    /// Token to WAN exchange ratio (precision 10000).
    async fn get_token_2_wan_ratio(
        &self,
        token_sc_addr: &str,
        cross_chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("crossChain", cross_chain)
            .with("tokenScAddr", token_sc_addr)
            .build();
        self.call("getToken2WanRatio", None, params).await
    }

    async fn get_token_storeman_groups(
        &self,
        token_sc_addr: &str,
        cross_chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("crossChain", cross_chain)
            .with("tokenScAddr", token_sc_addr)
            .build();
        self.call("getTokenStoremanGroups", None, params).await
    }

    // ==========================================================================
    // Events
    // ==========================================================================

    /// Contract event logs matching `topics`, optionally bounded by block
    /// height or the `latest` tag.
    async fn get_sc_event(
        &self,
        address: &str,
        topics: &[Value],
        from_block: Option<BlockTag>,
        to_block: Option<BlockTag>,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with("topics", topics)
            .with_opt("fromBlock", from_block)
            .with_opt("toBlock", to_block)
            .build();
        self.call("getScEvent", Some(chain), params).await
    }

    /// Register an event monitor. Only the acknowledgement is returned;
    /// pushed events arrive on connections this client does not keep open.
    async fn monitor_event(
        &self,
        address: &str,
        topics: &[Value],
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with("topics", topics)
            .build();
        self.call("monitorEvent", Some(chain), params).await
    }

    // ==========================================================================
    // Proof of Stake
    // ==========================================================================

    async fn get_activity(&self, epoch_id: u64, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getActivity", Some(chain), epoch_params(epoch_id))
            .await
    }

    async fn get_current_epoch_info(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getCurrentEpochInfo", Some(chain), Params::new())
            .await
    }

    /// Information on each current validator.
    async fn get_current_staker_info(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getCurrentStakerInfo", Some(chain), Params::new())
            .await
    }

    async fn get_delegator_incentive(
        &self,
        address: &str,
        from_epoch: u64,
        to_epoch: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with("from", from_epoch)
            .with("to", to_epoch)
            .build();
        self.call("getDelegatorIncentive", Some(chain), params).await
    }

    async fn get_delegator_stake_info(
        &self,
        address: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getDelegatorStakeInfo", Some(chain), params).await
    }

    async fn get_delegator_sup_stake_info(
        &self,
        address: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getDelegatorSupStakeInfo", Some(chain), params)
            .await
    }

    async fn get_delegator_total_incentive(
        &self,
        address: &str,
        validator_address: Option<&str>,
        from_epoch: Option<u64>,
        to_epoch: Option<u64>,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with_opt("validatorAddress", validator_address)
            .with_opt("from", from_epoch)
            .with_opt("to", to_epoch)
            .build();
        self.call("getDelegatorTotalIncentive", Some(chain), params)
            .await
    }

    async fn get_epoch_id(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getEpochID", Some(chain), Params::new()).await
    }

    /// Epoch containing `time` (UTC seconds).
    async fn get_epoch_id_by_time(&self, time: u64, chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("time", time).build();
        self.call("getEpochIDByTime", Some(chain), params).await
    }

    async fn get_epoch_incentive_block_number(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call(
            "getEpochIncentiveBlockNumber",
            Some(chain),
            epoch_params(epoch_id),
        )
        .await
    }

    async fn get_epoch_incentive_pay_detail(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call(
            "getEpochIncentivePayDetail",
            Some(chain),
            epoch_params(epoch_id),
        )
        .await
    }

    async fn get_epoch_leaders_by_epoch_id(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getEpochLeadersByEpochID", Some(chain), epoch_params(epoch_id))
            .await
    }

    async fn get_epoch_stake_out(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getEpochStakeOut", Some(chain), epoch_params(epoch_id))
            .await
    }

    async fn get_leader_group_by_epoch_id(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getLeaderGroupByEpochID", Some(chain), epoch_params(epoch_id))
            .await
    }

    /// Highest block number of the given epoch.
    async fn get_max_block_number(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getMaxBlockNumber", Some(chain), epoch_params(epoch_id))
            .await
    }

    /// Highest block that can no longer be rolled back.
    async fn get_max_stable_blk_number(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getMaxStableBlkNumber", Some(chain), Params::new())
            .await
    }

    /// Epoch and block at which the chain switched from PoW to PoS.
    async fn get_pos_info(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getPosInfo", Some(chain), Params::new()).await
    }

    async fn get_random(
        &self,
        epoch_id: u64,
        block_number: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("epochID", epoch_id)
            .with("blockNumber", block_number)
            .build();
        self.call("getRandom", Some(chain), params).await
    }

    async fn get_random_proposers_by_epoch_id(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call(
            "getRandomProposersByEpochID",
            Some(chain),
            epoch_params(epoch_id),
        )
        .await
    }

    async fn get_slot_activity(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getSlotActivity", Some(chain), epoch_params(epoch_id))
            .await
    }

    async fn get_slot_count(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getSlotCount", Some(chain), Params::new()).await
    }

    async fn get_slot_id(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getSlotID", Some(chain), Params::new()).await
    }

    /// Slot length in seconds.
    async fn get_slot_time(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getSlotTime", Some(chain), Params::new()).await
    }

    async fn get_staker_info(
        &self,
        block_number: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("blockNumber", block_number).build();
        self.call("getStakerInfo", Some(chain), params).await
    }

    /// Start time of an epoch in UTC seconds.
    async fn get_time_by_epoch_id(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getTimeByEpochID", Some(chain), epoch_params(epoch_id))
            .await
    }

    async fn get_validator_activity(
        &self,
        epoch_id: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        self.call("getValidatorActivity", Some(chain), epoch_params(epoch_id))
            .await
    }

    async fn get_validator_info(&self, address: &str, chain: ChainType) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getValidatorInfo", Some(chain), params).await
    }

    async fn get_validator_stake_info(
        &self,
        address: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getValidatorStakeInfo", Some(chain), params).await
    }

    async fn get_validator_sup_stake_info(
        &self,
        address: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getValidatorSupStakeInfo", Some(chain), params)
            .await
    }

    async fn get_validator_total_incentive(
        &self,
        address: &str,
        from_epoch: Option<u64>,
        to_epoch: Option<u64>,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with_opt("from", from_epoch)
            .with_opt("to", to_epoch)
            .build();
        self.call("getValidatorTotalIncentive", Some(chain), params)
            .await
    }

    // ==========================================================================
    // Status
    // ==========================================================================

    /// Current gas price in wei.
    async fn get_gas_price(&self, chain: ChainType) -> Result<Value, CoreError> {
        self.call("getGasPrice", Some(chain), Params::new()).await
    }

    // ==========================================================================
    // Tokens
    // ==========================================================================

    async fn get_multi_token_balance(
        &self,
        addresses: &[String],
        token_sc_addr: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", addresses)
            .with("tokenScAddr", token_sc_addr)
            .build();
        self.call("getMultiTokenBalance", Some(chain), params).await
    }

    async fn get_multi_token_info(
        &self,
        token_sc_addrs: &[String],
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("tokenScAddrArray", token_sc_addrs)
            .build();
        self.call("getMultiTokenInfo", Some(chain), params).await
    }

    /// Amount `spender` may still transfer on behalf of `owner`.
    async fn get_token_allowance(
        &self,
        token_sc_addr: &str,
        owner: &str,
        spender: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("tokenScAddr", token_sc_addr)
            .with("ownerAddr", owner)
            .with("spenderAddr", spender)
            .build();
        self.call("getTokenAllowance", Some(chain), params).await
    }

    async fn get_token_balance(
        &self,
        address: &str,
        token_sc_addr: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with("tokenScAddr", token_sc_addr)
            .build();
        self.call("getTokenBalance", Some(chain), params).await
    }

    /// Token metadata such as symbol and decimals.
    async fn get_token_info(
        &self,
        token_sc_addr: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("tokenScAddr", token_sc_addr).build();
        self.call("getTokenInfo", Some(chain), params).await
    }

    async fn get_token_supply(
        &self,
        token_sc_addr: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("tokenScAddr", token_sc_addr).build();
        self.call("getTokenSupply", Some(chain), params).await
    }

    // ==========================================================================
    // Transactions
    // ==========================================================================

    async fn get_trans_by_address(
        &self,
        address: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("address", address).build();
        self.call("getTransByAddress", Some(chain), params).await
    }

    async fn get_trans_by_address_between_blocks(
        &self,
        address: &str,
        start_block: u64,
        end_block: u64,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("address", address)
            .with("startBlockNo", start_block)
            .with("endBlockNo", end_block)
            .build();
        self.call("getTransByAddressBetweenBlocks", Some(chain), params)
            .await
    }

    async fn get_trans_by_block(
        &self,
        block: &BlockRef,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = block.add_to(ParamsBuilder::new()).build();
        self.call("getTransByBlock", Some(chain), params).await
    }

    /// Receipt of `tx_hash` once it has `wait_blocks` confirmations.
    async fn get_transaction_confirm(
        &self,
        wait_blocks: u64,
        tx_hash: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("waitBlocks", wait_blocks)
            .with("txHash", tx_hash)
            .build();
        self.call("getTransactionConfirm", Some(chain), params).await
    }

    async fn get_transaction_receipt(
        &self,
        tx_hash: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("txHash", tx_hash).build();
        self.call("getTransactionReceipt", Some(chain), params).await
    }

    /// Transaction details. On BTC, `format: Some(true)` asks for the decoded
    /// transaction and `Some(false)` for the serialized hex.
    async fn get_tx_info(
        &self,
        tx_hash: &str,
        format: Option<bool>,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new()
            .with("txHash", tx_hash)
            .with_opt("format", format)
            .build();
        self.call("getTxInfo", Some(chain), params).await
    }

    /// Broadcast a pre-signed raw transaction.
    async fn send_raw_transaction(
        &self,
        signed_tx: &str,
        chain: ChainType,
    ) -> Result<Value, CoreError> {
        let params = ParamsBuilder::new().with("signedTx", signed_tx).build();
        self.call("sendRawTransaction", Some(chain), params).await
    }
}

fn epoch_params(epoch_id: u64) -> Params {
    ParamsBuilder::new().with("epochID", epoch_id).build()
}

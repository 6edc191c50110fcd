use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CoreError, RpcError};
use crate::types::{ChainType, Params};

use super::IwanRpc;

/// One call as seen by [`MockRpc`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub chain_type: Option<ChainType>,
    pub params: Params,
}

impl RecordedCall {
    pub fn param_keys(&self) -> Vec<&str> {
        self.params.keys().map(String::as_str).collect()
    }
}

/// A mock iWAN backend for testing. Records every call and answers with
/// canned results keyed by method name, populated via the builder pattern.
/// Unknown methods answer `null`.
pub struct MockRpc {
    results: HashMap<String, Value>,
    errors: HashMap<String, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRpc {
    pub fn builder() -> MockRpcBuilder {
        MockRpcBuilder {
            results: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls()
            .pop()
            .expect("mock must have recorded at least one call")
    }
}

pub struct MockRpcBuilder {
    results: HashMap<String, Value>,
    errors: HashMap<String, String>,
}

impl MockRpcBuilder {
    pub fn with_result(mut self, method: &str, result: Value) -> Self {
        self.results.insert(method.to_owned(), result);
        self
    }

    /// Answer `method` with a server error carrying `message`.
    pub fn with_server_error(mut self, method: &str, message: &str) -> Self {
        self.errors.insert(method.to_owned(), message.to_owned());
        self
    }

    pub fn build(self) -> MockRpc {
        MockRpc {
            results: self.results,
            errors: self.errors,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IwanRpc for MockRpc {
    async fn call(
        &self,
        method: &str,
        chain_type: Option<ChainType>,
        params: Params,
    ) -> Result<Value, CoreError> {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(RecordedCall {
                method: method.to_owned(),
                chain_type,
                params,
            });

        if let Some(message) = self.errors.get(method) {
            return Err(CoreError::Rpc(RpcError::ServerError {
                code: None,
                message: message.clone(),
            }));
        }
        Ok(self.results.get(method).cloned().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{BlockRef, BlockTag};

    #[tokio::test]
    async fn block_number_sends_chain_type_only() {
        let rpc = MockRpc::builder()
            .with_result("getBlockNumber", json!(42))
            .build();
        let result = rpc.get_block_number(ChainType::Wan).await.unwrap();
        assert_eq!(result, 42);

        let call = rpc.last_call();
        assert_eq!(call.method, "getBlockNumber");
        assert_eq!(call.chain_type, Some(ChainType::Wan));
        assert!(call.params.is_empty());
    }

    #[tokio::test]
    async fn server_errors_propagate_from_wrappers() {
        let rpc = MockRpc::builder()
            .with_server_error("getBalance", "bad signature")
            .build();
        let err = rpc.get_balance("0xabc", ChainType::Wan).await.unwrap_err();
        assert_eq!(err.to_string(), "server error: bad signature");
    }

    #[tokio::test]
    async fn cross_chain_queries_never_send_chain_type() {
        let rpc = MockRpc::builder().build();
        rpc.get_coin_2_wan_ratio(ChainType::Eth).await.unwrap();
        rpc.get_reg_tokens(ChainType::Eth).await.unwrap();
        rpc.get_storeman_groups(ChainType::Btc).await.unwrap();
        rpc.get_token_2_wan_ratio("0xtoken", ChainType::Eth)
            .await
            .unwrap();
        rpc.get_token_storeman_groups("0xtoken", ChainType::Eth)
            .await
            .unwrap();

        for call in rpc.calls() {
            assert_eq!(call.chain_type, None, "{} must not carry chainType", call.method);
            assert!(call.params.contains_key("crossChain"));
        }
        let ratio = &rpc.calls()[3];
        assert_eq!(ratio.param_keys(), ["crossChain", "tokenScAddr"]);
        assert_eq!(ratio.params["crossChain"], "ETH");
    }

    #[tokio::test]
    async fn method_names_match_the_remote_api() {
        let rpc = MockRpc::builder().build();
        let addrs = vec!["0x1".to_owned(), "0x2".to_owned()];
        let abi = json!([]);

        rpc.get_multi_balances(&addrs, ChainType::Wan).await.unwrap();
        rpc.get_nonce("0x1", ChainType::Wan).await.unwrap();
        rpc.get_nonce_include_pending("0x1", ChainType::Wan).await.unwrap();
        rpc.get_utxo(&addrs, 0, 6, ChainType::Btc).await.unwrap();
        rpc.import_address("mx1", ChainType::Btc).await.unwrap();
        rpc.get_block_by_number(10, ChainType::Eth).await.unwrap();
        rpc.call_sc_func("0xsc", "f", &[json!(1)], &abi, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_sc_map("0xsc", "m", "k", &abi, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_sc_var("0xsc", "v", &abi, ChainType::Wan).await.unwrap();
        rpc.monitor_event("0xsc", &[json!("0xtopic")], ChainType::Wan)
            .await
            .unwrap();
        rpc.get_activity(18000, ChainType::Wan).await.unwrap();
        rpc.get_current_epoch_info(ChainType::Wan).await.unwrap();
        rpc.get_current_staker_info(ChainType::Wan).await.unwrap();
        rpc.get_delegator_incentive("0x1", 1, 2, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_delegator_stake_info("0x1", ChainType::Wan).await.unwrap();
        rpc.get_delegator_sup_stake_info("0x1", ChainType::Wan)
            .await
            .unwrap();
        rpc.get_epoch_id(ChainType::Wan).await.unwrap();
        rpc.get_epoch_id_by_time(1_555_555_555, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_epoch_incentive_block_number(1, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_epoch_incentive_pay_detail(1, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_epoch_leaders_by_epoch_id(1, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_epoch_stake_out(1, ChainType::Wan).await.unwrap();
        rpc.get_leader_group_by_epoch_id(1, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_max_block_number(1, ChainType::Wan).await.unwrap();
        rpc.get_max_stable_blk_number(ChainType::Wan).await.unwrap();
        rpc.get_pos_info(ChainType::Wan).await.unwrap();
        rpc.get_random(1, 100, ChainType::Wan).await.unwrap();
        rpc.get_random_proposers_by_epoch_id(1, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_slot_activity(1, ChainType::Wan).await.unwrap();
        rpc.get_slot_count(ChainType::Wan).await.unwrap();
        rpc.get_slot_id(ChainType::Wan).await.unwrap();
        rpc.get_slot_time(ChainType::Wan).await.unwrap();
        rpc.get_staker_info(100, ChainType::Wan).await.unwrap();
        rpc.get_time_by_epoch_id(1, ChainType::Wan).await.unwrap();
        rpc.get_validator_activity(1, ChainType::Wan).await.unwrap();
        rpc.get_validator_info("0x1", ChainType::Wan).await.unwrap();
        rpc.get_validator_stake_info("0x1", ChainType::Wan).await.unwrap();
        rpc.get_validator_sup_stake_info("0x1", ChainType::Wan)
            .await
            .unwrap();
        rpc.get_gas_price(ChainType::Eth).await.unwrap();
        rpc.get_multi_token_balance(&addrs, "0xtoken", ChainType::Wan)
            .await
            .unwrap();
        rpc.get_multi_token_info(&addrs, ChainType::Wan).await.unwrap();
        rpc.get_token_allowance("0xtoken", "0xowner", "0xspender", ChainType::Eth)
            .await
            .unwrap();
        rpc.get_token_balance("0x1", "0xtoken", ChainType::Wan)
            .await
            .unwrap();
        rpc.get_token_info("0xtoken", ChainType::Wan).await.unwrap();
        rpc.get_token_supply("0xtoken", ChainType::Wan).await.unwrap();
        rpc.get_trans_by_address("0x1", ChainType::Wan).await.unwrap();
        rpc.get_trans_by_address_between_blocks("0x1", 1, 9, ChainType::Wan)
            .await
            .unwrap();
        rpc.get_transaction_confirm(6, "0xhash", ChainType::Wan)
            .await
            .unwrap();
        rpc.get_transaction_receipt("0xhash", ChainType::Wan)
            .await
            .unwrap();
        rpc.send_raw_transaction("0xsigned", ChainType::Wan)
            .await
            .unwrap();

        let methods: Vec<String> = rpc.calls().into_iter().map(|c| c.method).collect();
        assert_eq!(
            methods,
            [
                "getMultiBalances",
                "getNonce",
                "getNonceIncludePending",
                "getUTXO",
                "importAddress",
                "getBlockByNumber",
                "callScFunc",
                "getScMap",
                "getScVar",
                "monitorEvent",
                "getActivity",
                "getCurrentEpochInfo",
                "getCurrentStakerInfo",
                "getDelegatorIncentive",
                "getDelegatorStakeInfo",
                "getDelegatorSupStakeInfo",
                "getEpochID",
                "getEpochIDByTime",
                "getEpochIncentiveBlockNumber",
                "getEpochIncentivePayDetail",
                "getEpochLeadersByEpochID",
                "getEpochStakeOut",
                "getLeaderGroupByEpochID",
                "getMaxBlockNumber",
                "getMaxStableBlkNumber",
                "getPosInfo",
                "getRandom",
                "getRandomProposersByEpochID",
                "getSlotActivity",
                "getSlotCount",
                "getSlotID",
                "getSlotTime",
                "getStakerInfo",
                "getTimeByEpochID",
                "getValidatorActivity",
                "getValidatorInfo",
                "getValidatorStakeInfo",
                "getValidatorSupStakeInfo",
                "getGasPrice",
                "getMultiTokenBalance",
                "getMultiTokenInfo",
                "getTokenAllowance",
                "getTokenBalance",
                "getTokenInfo",
                "getTokenSupply",
                "getTransByAddress",
                "getTransByAddressBetweenBlocks",
                "getTransactionConfirm",
                "getTransactionReceipt",
                "sendRawTransaction",
            ]
        );
    }

    #[tokio::test]
    async fn parameter_keys_are_exact() {
        let rpc = MockRpc::builder().build();

        rpc.get_block_by_hash("0xblock", ChainType::Wan).await.unwrap();
        assert_eq!(rpc.last_call().param_keys(), ["blockHash"]);

        rpc.get_block_transaction_count(&BlockRef::Hash("0xblock".into()), ChainType::Wan)
            .await
            .unwrap();
        assert_eq!(rpc.last_call().method, "getBlockTransactionCount");
        assert_eq!(rpc.last_call().param_keys(), ["blockHash"]);

        rpc.get_trans_by_block(&BlockRef::Number(5), ChainType::Eth)
            .await
            .unwrap();
        assert_eq!(rpc.last_call().method, "getTransByBlock");
        assert_eq!(rpc.last_call().param_keys(), ["blockNumber"]);

        rpc.get_utxo(&["mx1".to_owned()], 0, 6, ChainType::Btc)
            .await
            .unwrap();
        let utxo = rpc.last_call();
        assert_eq!(utxo.param_keys(), ["address", "minconf", "maxconf"]);
        assert_eq!(utxo.params["address"], json!(["mx1"]));

        rpc.get_token_allowance("0xt", "0xo", "0xs", ChainType::Wan)
            .await
            .unwrap();
        assert_eq!(
            rpc.last_call().param_keys(),
            ["tokenScAddr", "ownerAddr", "spenderAddr"]
        );

        rpc.get_multi_token_info(&["0xt".to_owned()], ChainType::Wan)
            .await
            .unwrap();
        assert_eq!(rpc.last_call().param_keys(), ["tokenScAddrArray"]);
    }

    #[tokio::test]
    async fn optional_parameters_are_omitted_when_absent() {
        let rpc = MockRpc::builder().build();

        rpc.get_delegator_total_incentive("0x1", None, None, None, ChainType::Wan)
            .await
            .unwrap();
        assert_eq!(rpc.last_call().param_keys(), ["address"]);

        rpc.get_delegator_total_incentive("0x1", Some("0xv"), Some(1), Some(2), ChainType::Wan)
            .await
            .unwrap();
        assert_eq!(
            rpc.last_call().param_keys(),
            ["address", "validatorAddress", "from", "to"]
        );

        rpc.get_validator_total_incentive("0x1", None, Some(4), ChainType::Wan)
            .await
            .unwrap();
        assert_eq!(rpc.last_call().param_keys(), ["address", "to"]);

        rpc.get_tx_info("0xhash", None, ChainType::Wan).await.unwrap();
        assert_eq!(rpc.last_call().param_keys(), ["txHash"]);
        rpc.get_tx_info("0xhash", Some(true), ChainType::Btc)
            .await
            .unwrap();
        let call = rpc.last_call();
        assert_eq!(call.param_keys(), ["txHash", "format"]);
        assert_eq!(call.params["format"], json!(true));

        rpc.get_sc_event("0xsc", &[json!("0xtopic")], None, Some(BlockTag::Number(9)), ChainType::Wan)
            .await
            .unwrap();
        let call = rpc.last_call();
        assert_eq!(call.param_keys(), ["address", "topics", "toBlock"]);
        assert_eq!(call.params["toBlock"], json!(9));
    }

    #[tokio::test]
    async fn sc_event_accepts_latest_tag() {
        let rpc = MockRpc::builder().build();
        rpc.get_sc_event(
            "0xsc",
            &[],
            Some(BlockTag::Number(100)),
            Some(BlockTag::Latest),
            ChainType::Eth,
        )
        .await
        .unwrap();
        let call = rpc.last_call();
        assert_eq!(call.params["fromBlock"], json!(100));
        assert_eq!(call.params["toBlock"], json!("latest"));
    }
}

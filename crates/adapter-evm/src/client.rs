//! JSON-RPC access to an EVM chain.

use alloy::{
    eips::BlockNumberOrTag,
    network::EthereumWallet,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use eyre::{OptionExt, Result};
use mcms_core::{Error, metrics::AdapterMetrics, retry::with_retry};
use tracing::{debug, info};

/// Submission and query collaborator the EVM adapters run against.
#[async_trait]
pub trait EvmClient: Send + Sync {
    /// Read-only `eth_call` against the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes>;

    /// Sends a transaction and waits for a successful receipt.
    async fn send(&self, to: Address, input: Bytes, value: U256) -> Result<B256>;

    /// Timestamp of the latest block, in unix seconds.
    async fn latest_block_timestamp(&self) -> Result<u64>;
}

/// [`EvmClient`] backed by an alloy wallet provider.
#[derive(Clone)]
pub struct AlloyClient {
    provider: DynProvider,
}

impl AlloyClient {
    /// Connects to `rpc_url`, signing transactions with `signer`.
    pub async fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet).connect(rpc_url).await?.erased();
        Ok(Self { provider })
    }
}

#[async_trait]
impl EvmClient for AlloyClient {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default().to(to).input(input.into());
        with_retry("eth_call", || async { Ok(self.provider.call(tx.clone()).await?) }).await
    }

    async fn send(&self, to: Address, input: Bytes, value: U256) -> Result<B256> {
        let tx = TransactionRequest::default().to(to).input(input.into()).value(value);

        let pending = self.provider.send_transaction(tx).await?;
        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            eyre::bail!("transaction {} reverted", receipt.transaction_hash);
        }

        info!(tx_hash = %receipt.transaction_hash, %to, "Transaction confirmed");
        Ok(receipt.transaction_hash)
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        let block = with_retry("get_latest_block", || async {
            self.provider.get_block_by_number(BlockNumberOrTag::Latest).await?.ok_or_eyre("latest block not found")
        })
        .await?;
        debug!(number = block.header.number, timestamp = block.header.timestamp, "Fetched latest block");
        Ok(block.header.timestamp)
    }
}

/// Runs a view call and decodes its return value.
pub(crate) async fn view<C: SolCall>(
    client: &dyn EvmClient,
    to: Address,
    call: C,
    query: &'static str,
) -> mcms_core::Result<C::Return> {
    let output = client.call(to, call.abi_encode().into()).await.map_err(|err| Error::query(query, err))?;
    C::abi_decode_returns(&output).map_err(|err| Error::decode(query, err))
}

/// Sends `call` as a single-step submission named `step`.
pub(crate) async fn submit<C: SolCall>(
    client: &dyn EvmClient,
    metrics: &AdapterMetrics,
    to: Address,
    call: C,
    step: &'static str,
) -> mcms_core::Result<B256> {
    match client.send(to, call.abi_encode().into(), U256::ZERO).await {
        Ok(hash) => {
            metrics.record_submission(step);
            Ok(hash)
        }
        Err(err) => {
            metrics.record_failure(step);
            Err(Error::submission(step, err))
        }
    }
}

pub(crate) fn parse_address(address: &str) -> mcms_core::Result<Address> {
    address.parse().map_err(|err| Error::invalid_address(address, err))
}

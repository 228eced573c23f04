//! Account reads and instruction submission for the Solana adapters.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use eyre::{Result, bail, eyre};
use mcms_core::{Error, metrics::AdapterMetrics, retry::with_retry};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// The clock sysvar, whose data starts with slot, epoch start timestamp,
/// epoch and leader schedule epoch before the unix timestamp.
pub use solana_sdk_ids::sysvar::clock::ID as CLOCK_SYSVAR;

use crate::{
    instruction::{AnchorAccount, Instruction},
    pubkey::Pubkey,
};

const CLOCK_TIMESTAMP_OFFSET: usize = 32;

/// Read access to account state.
#[async_trait]
pub trait SolanaReader: Send + Sync {
    /// Raw data of `key`, or `None` if the account does not exist.
    async fn account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// The cluster's current unix time from the clock sysvar.
    async fn clock_unix_timestamp(&self) -> Result<i64>;
}

/// Signs, sends and confirms transactions.
///
/// Key management stays with the caller; the adapters only build the
/// instructions and pick the order they are sent in.
#[async_trait]
pub trait SolanaSubmitter: Send + Sync {
    /// The fee payer and signer of every submitted transaction.
    fn authority(&self) -> Pubkey;

    /// Sends `instructions` as one transaction and returns its signature.
    async fn send(&self, instructions: Vec<Instruction>) -> Result<String>;
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct AccountInfo {
    data: (String, String),
}

/// [`SolanaReader`] over the JSON-RPC HTTP API.
#[derive(Clone, Debug)]
pub struct RpcReader {
    http: reqwest::Client,
    url: String,
    commitment: String,
}

impl RpcReader {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), commitment: "confirmed".into() }
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    async fn request(&self, method: &'static str, params: Value) -> Result<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        with_retry(method, || async {
            let response = self.http.post(&self.url).json(&body).send().await?.error_for_status()?;
            let response: RpcResponse = response.json().await?;
            if let Some(err) = response.error {
                bail!("{method} failed with code {}: {}", err.code, err.message);
            }
            Ok(response.result)
        })
        .await
    }
}

#[async_trait]
impl SolanaReader for RpcReader {
    async fn account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>> {
        let params = json!([key.to_string(), { "encoding": "base64", "commitment": self.commitment }]);
        let result = self.request("getAccountInfo", params).await?;
        let value = result.get("value").cloned().unwrap_or(Value::Null);
        if value.is_null() {
            debug!(%key, "Account not found");
            return Ok(None);
        }
        let info: AccountInfo = serde_json::from_value(value)?;
        let (data, encoding) = info.data;
        if encoding != "base64" {
            bail!("unexpected account encoding {encoding}");
        }
        Ok(Some(STANDARD.decode(data)?))
    }

    async fn clock_unix_timestamp(&self) -> Result<i64> {
        let data = self.account_data(&CLOCK_SYSVAR).await?.ok_or_else(|| eyre!("clock sysvar not found"))?;
        clock_timestamp(&data)
    }
}

pub(crate) fn clock_timestamp(data: &[u8]) -> Result<i64> {
    let bytes = data
        .get(CLOCK_TIMESTAMP_OFFSET..CLOCK_TIMESTAMP_OFFSET + 8)
        .ok_or_else(|| eyre!("clock sysvar data is {} bytes", data.len()))?;
    let mut word = [0; 8];
    word.copy_from_slice(bytes);
    Ok(i64::from_le_bytes(word))
}

/// Reads and decodes an account, `None` if it does not exist.
pub(crate) async fn read_account<T: AnchorAccount>(
    reader: &dyn SolanaReader,
    key: &Pubkey,
    query: &'static str,
) -> mcms_core::Result<Option<T>> {
    let data = reader.account_data(key).await.map_err(|err| Error::query(query, err))?;
    data.map(|data| T::from_account_data(&data)).transpose()
}

/// Reads and decodes an account that must exist.
pub(crate) async fn require_account<T: AnchorAccount>(
    reader: &dyn SolanaReader,
    key: &Pubkey,
    query: &'static str,
) -> mcms_core::Result<T> {
    read_account(reader, key, query).await?.ok_or_else(|| Error::query(query, eyre!("account {key} not found")))
}

pub(crate) async fn clock(reader: &dyn SolanaReader) -> mcms_core::Result<i64> {
    reader.clock_unix_timestamp().await.map_err(|err| Error::query("clock", err))
}

/// Sends `sequence` one transaction per instruction, stopping at the first
/// failure. Returns the signature of the last transaction.
pub(crate) async fn submit_sequence(
    submitter: &dyn SolanaSubmitter,
    metrics: &AdapterMetrics,
    sequence: Vec<(&'static str, Instruction)>,
) -> mcms_core::Result<String> {
    let mut signature = String::new();
    for (step, (name, instruction)) in sequence.into_iter().enumerate() {
        signature = match submitter.send(vec![instruction]).await {
            Ok(signature) => signature,
            Err(err) => {
                metrics.record_failure(name);
                return Err(Error::submission_step(step, name, err));
            }
        };
        metrics.record_submission(name);
        debug!(step, name, %signature, "Submitted instruction");
    }
    Ok(signature)
}

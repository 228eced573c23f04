//! TOML settings describing the chains a deployment talks to.

use std::{fs, path::Path, sync::Arc};

use alloy_signer_local::PrivateKeySigner;
use eyre::{OptionExt, Result, WrapErr, bail, ensure};
use mcms_canton::{CantonChain, JsonLedgerClient};
use mcms_core::{ChainFamily, ChainInfo, ChainRegistry, ChainSelector};
use mcms_evm::{AlloyClient, EvmChain};
use mcms_solana::RpcReader;
use serde::{Deserialize, Serialize};

/// Every configured chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub chains: Vec<ChainSettings>,
}

/// Connection details of one chain. Which fields are required depends on `family`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainSettings {
    pub selector: ChainSelector,
    pub family: ChainFamily,
    /// JSON-RPC endpoint of an EVM or Solana node.
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Overrides the chain id the registry knows for an EVM selector.
    #[serde(default)]
    pub evm_chain_id: Option<u64>,
    /// JSON Ledger API endpoint of a Canton participant.
    #[serde(default)]
    pub ledger_url: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl ChainSettings {
    fn validate(&self, known: &ChainRegistry) -> Result<()> {
        let selector = self.selector;
        match self.family {
            ChainFamily::Evm => {
                ensure!(self.rpc_url.is_some(), "evm chain {selector} needs rpc_url");
                ensure!(
                    self.evm_chain_id.is_some() || known.evm_chain_id(selector).is_ok(),
                    "evm chain {selector} is not a known chain and needs evm_chain_id"
                );
            }
            ChainFamily::Solana => ensure!(self.rpc_url.is_some(), "solana chain {selector} needs rpc_url"),
            ChainFamily::Canton => {
                for (name, value) in
                    [("ledger_url", &self.ledger_url), ("party", &self.party), ("user_id", &self.user_id)]
                {
                    ensure!(value.is_some(), "canton chain {selector} needs {name}");
                }
            }
        }
        if self.family != ChainFamily::Evm && self.evm_chain_id.is_some() {
            bail!("{} chain {selector} cannot set evm_chain_id", self.family);
        }
        Ok(())
    }

    fn required<'a>(&self, value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value.as_deref().ok_or_eyre(format!("chain {} has no {name}", self.selector))
    }
}

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self> {
        let settings: Self = toml::from_str(input).wrap_err("invalid settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&input).wrap_err_with(|| format!("failed to load {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let known = ChainRegistry::with_known_chains();
        for (index, chain) in self.chains.iter().enumerate() {
            chain.validate(&known)?;
            ensure!(
                !self.chains[..index].iter().any(|other| other.selector == chain.selector),
                "chain {} is configured twice",
                chain.selector
            );
        }
        Ok(())
    }

    pub fn chain(&self, selector: ChainSelector) -> Result<&ChainSettings> {
        self.chains
            .iter()
            .find(|chain| chain.selector == selector)
            .ok_or_eyre(format!("chain {selector} is not configured"))
    }

    /// The well-known chains plus every configured one.
    pub fn registry(&self) -> Result<ChainRegistry> {
        let mut registry = ChainRegistry::with_known_chains();
        for chain in &self.chains {
            let evm_chain_id = match chain.family {
                ChainFamily::Evm => Some(match chain.evm_chain_id {
                    Some(id) => id,
                    None => registry.evm_chain_id(chain.selector)?,
                }),
                _ => None,
            };
            registry.register(chain.selector, ChainInfo { family: chain.family, evm_chain_id });
        }
        Ok(registry)
    }

    /// Connects to the EVM chain `selector`, signing with `signer`.
    pub async fn evm_chain(&self, selector: ChainSelector, signer: PrivateKeySigner) -> Result<EvmChain> {
        let chain = self.family_chain(selector, ChainFamily::Evm)?;
        let chain_id = self.registry()?.evm_chain_id(selector)?;
        let client = AlloyClient::connect(chain.required(&chain.rpc_url, "rpc_url")?, signer).await?;
        Ok(EvmChain::new(selector, chain_id, Arc::new(client)))
    }

    /// A read-only client for the Solana chain `selector`.
    ///
    /// Submission needs a wallet, so building the `SolanaChain` is left to the caller.
    pub fn solana_reader(&self, selector: ChainSelector) -> Result<RpcReader> {
        let chain = self.family_chain(selector, ChainFamily::Solana)?;
        Ok(RpcReader::new(chain.required(&chain.rpc_url, "rpc_url")?))
    }

    pub fn canton_chain(&self, selector: ChainSelector) -> Result<CantonChain> {
        let chain = self.family_chain(selector, ChainFamily::Canton)?;
        let mut client = JsonLedgerClient::new(
            chain.required(&chain.ledger_url, "ledger_url")?,
            chain.required(&chain.user_id, "user_id")?,
            chain.required(&chain.party, "party")?,
        )?;
        if let Some(token) = &chain.token {
            client = client.with_token(token);
        }
        Ok(CantonChain::new(selector, Arc::new(client)))
    }

    fn family_chain(&self, selector: ChainSelector, family: ChainFamily) -> Result<&ChainSettings> {
        let chain = self.chain(selector)?;
        ensure!(chain.family == family, "chain {selector} is a {} chain, not {family}", chain.family);
        Ok(chain)
    }
}

//! Chain selectors, chain families, and the selector registry.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Globally unique identifier of a chain, independent of its family.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
#[serde(transparent)]
pub struct ChainSelector(pub u64);

impl FromStr for ChainSelector {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// Selectors appear both as JSON numbers and as stringified map keys.
impl<'de> Deserialize<'de> for ChainSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = ChainSelector;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a chain selector as an integer or decimal string")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(ChainSelector(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                u64::try_from(v).map(ChainSelector).map_err(E::custom)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

/// Runtime family of a chain. Each family has its own adapter set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    #[display("evm")]
    Evm,
    #[display("solana")]
    Solana,
    #[display("canton")]
    Canton,
}

impl ChainFamily {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Solana => "solana",
            Self::Canton => "canton",
        }
    }

    /// Whether every mutation replaces the multisig contract with a new identity.
    pub const fn recreates_contracts(self) -> bool {
        matches!(self, Self::Canton)
    }
}

/// What the registry knows about one selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainInfo {
    pub family: ChainFamily,
    /// Native chain id, EVM only.
    pub evm_chain_id: Option<u64>,
}

/// Selectors that are always known to the registry.
const KNOWN_CHAINS: &[(u64, ChainInfo)] = &[
    // ethereum-mainnet
    (5009297550715157269, ChainInfo { family: ChainFamily::Evm, evm_chain_id: Some(1) }),
    // ethereum-testnet-sepolia
    (16015286601757825753, ChainInfo { family: ChainFamily::Evm, evm_chain_id: Some(11155111) }),
    // solana-mainnet
    (124615329519749607, ChainInfo { family: ChainFamily::Solana, evm_chain_id: None }),
    // solana-testnet
    (6302590918974934319, ChainInfo { family: ChainFamily::Solana, evm_chain_id: None }),
    // solana-devnet
    (16423721717087811551, ChainInfo { family: ChainFamily::Solana, evm_chain_id: None }),
];

/// Maps chain selectors to their family and native identifiers.
#[derive(Clone, Debug)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainSelector, ChainInfo>,
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::with_known_chains()
    }
}

impl ChainRegistry {
    /// An empty registry.
    pub const fn empty() -> Self {
        Self { chains: BTreeMap::new() }
    }

    /// A registry seeded with the well-known public chains.
    pub fn with_known_chains() -> Self {
        let chains = KNOWN_CHAINS.iter().map(|(selector, info)| (ChainSelector(*selector), *info)).collect();
        Self { chains }
    }

    /// Registers or overrides a selector.
    pub fn register(&mut self, selector: ChainSelector, info: ChainInfo) -> &mut Self {
        self.chains.insert(selector, info);
        self
    }

    pub fn get(&self, selector: ChainSelector) -> Result<ChainInfo> {
        self.chains.get(&selector).copied().ok_or(Error::UnknownChainSelector(selector))
    }

    pub fn family(&self, selector: ChainSelector) -> Result<ChainFamily> {
        self.get(selector).map(|info| info.family)
    }

    /// The EVM chain id for `selector`, failing for unknown or non-EVM selectors.
    pub fn evm_chain_id(&self, selector: ChainSelector) -> Result<u64> {
        self.get(selector)?.evm_chain_id.ok_or(Error::UnknownChainSelector(selector))
    }
}

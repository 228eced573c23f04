//! Account keys, program-derived addresses and their base58 JSON form.

use mcms_core::{Error, Result};
pub use solana_pubkey::{MAX_SEED_LEN, Pubkey};
pub use solana_sdk_ids::system_program::ID as SYSTEM_PROGRAM_ID;

/// Parses a base58 account key.
pub fn parse_pubkey(s: &str) -> Result<Pubkey> {
    s.parse().map_err(|err| Error::invalid_address(s, err))
}

/// Finds the canonical bump address of `seeds` under `program_id`.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    if let Some(seed) = seeds.iter().find(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(Error::invalid_address(
            program_id.to_string(),
            format!("seed of {} bytes exceeds {MAX_SEED_LEN}", seed.len()),
        ));
    }
    Pubkey::try_find_program_address(seeds, program_id)
        .ok_or_else(|| Error::invalid_address(program_id.to_string(), "no viable bump seed"))
}

/// Serde adapter writing a [`Pubkey`] as its base58 string.
///
/// `Pubkey`'s own serde form is a byte array; proposal files carry base58.
pub mod base58 {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The compressed ed25519 base point: an on-curve key usable as a wallet.
#[cfg(test)]
pub(crate) fn test_wallet() -> Pubkey {
    let mut bytes = [0x66; 32];
    bytes[0] = 0x58;
    Pubkey::new_from_array(bytes)
}

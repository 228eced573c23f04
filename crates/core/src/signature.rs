//! secp256k1 signatures over proposal roots.

use alloy_primitives::{Address, B256, U256, keccak256};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// A recoverable ECDSA signature with Ethereum-style `v` (27 or 28).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl Signature {
    /// Parses a 65-byte `r ‖ s ‖ v` signature. A `v` of 0 or 1 is shifted to 27 or 28.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 65 {
            return Err(Error::InvalidSignature(format!("expected 65 bytes, got {}", bytes.len())));
        }
        let mut v = bytes[64];
        if v < 2 {
            v += 27;
        }
        Ok(Self { r: B256::from_slice(&bytes[..32]), s: B256::from_slice(&bytes[32..64]), v })
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }

    fn to_primitive(self) -> Result<alloy_primitives::Signature> {
        let parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            v => return Err(Error::InvalidSignature(format!("invalid recovery id {v}"))),
        };
        Ok(alloy_primitives::Signature::new(U256::from_be_bytes(self.r.0), U256::from_be_bytes(self.s.0), parity))
    }

    /// Recovers the signing address for a prehashed message.
    pub fn recover_signer(&self, hash: B256) -> Result<Address> {
        self.to_primitive()?
            .recover_address_from_prehash(&hash)
            .map_err(|err| Error::InvalidSignature(err.to_string()))
    }

    /// Recovers the signer's uncompressed SEC1 public key (`0x04 ‖ x ‖ y`).
    pub fn recover_public_key(&self, hash: B256) -> Result<[u8; 65]> {
        let key = self
            .to_primitive()?
            .recover_from_prehash(&hash)
            .map_err(|err| Error::InvalidSignature(err.to_string()))?;
        let point = key.as_affine().to_encoded_point(false);
        point
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidSignature("unexpected public key length".into()))
    }
}

/// `keccak256("\x19Ethereum Signed Message:\n32" ‖ inner)`.
pub fn eth_signed_message_hash(inner: B256) -> B256 {
    keccak256([ETH_SIGNED_MESSAGE_PREFIX, inner.as_slice()].concat())
}

/// The hash signers sign for `(root, valid_until)`.
///
/// The inner hash is `keccak256(root ‖ valid_until)` with `valid_until`
/// left-padded to a 32-byte word, matching `abi.encode(bytes32, uint32)`.
pub fn root_signing_hash(root: B256, valid_until: u32) -> B256 {
    let mut word = [0u8; 32];
    word[28..].copy_from_slice(&valid_until.to_be_bytes());
    eth_signed_message_hash(keccak256([root.as_slice(), &word].concat()))
}

/// Recovers every signer and requires them in strictly ascending order.
pub fn recover_sorted_signers(signatures: &[Signature], hash: B256) -> Result<Vec<Address>> {
    let signers = signatures.iter().map(|sig| sig.recover_signer(hash)).collect::<Result<Vec<_>>>()?;
    if signers.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(Error::UnsortedSignatures);
    }
    Ok(signers)
}

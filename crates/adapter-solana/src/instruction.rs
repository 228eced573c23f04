//! Anchor framing of instruction data and account bodies, and the JSON form
//! of account metas carried in proposals.

use borsh::{BorshDeserialize, BorshSerialize};
use mcms_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
pub use solana_instruction::{AccountMeta, Instruction};
use solana_sha256_hasher::hashv;

use crate::pubkey::{Pubkey, base58};

/// Anchor's sighash: the first eight bytes of `sha256("<namespace>:<name>")`.
fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let hash = hashv(&[namespace.as_bytes(), b":".as_slice(), name.as_bytes()]).to_bytes();
    let mut out = [0; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// Prefixed to every Anchor instruction.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// Prefixed to every Anchor account.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

/// Anchor's method selector of `instruction`, if its data has one.
pub fn discriminator(instruction: &Instruction) -> Option<[u8; 8]> {
    instruction.data.get(..8).and_then(|bytes| bytes.try_into().ok())
}

/// Drops the signer flag from program-derived accounts, which only a program
/// can sign for.
pub fn without_pda_signer(mut meta: AccountMeta) -> AccountMeta {
    meta.is_signer &= meta.pubkey.is_on_curve();
    meta
}

/// Borsh arguments of an Anchor instruction.
pub trait InstructionArgs: BorshSerialize + BorshDeserialize {
    /// The snake_case method name.
    const NAME: &'static str;

    fn build(&self, program_id: Pubkey, accounts: Vec<AccountMeta>) -> Result<Instruction> {
        let mut data = instruction_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data).map_err(|err| Error::decode(Self::NAME, err))?;
        Ok(Instruction { program_id, accounts, data })
    }

    /// Decodes the arguments of `instruction` if it calls this method.
    fn decode(instruction: &Instruction) -> Option<Self> {
        if discriminator(instruction)? != instruction_discriminator(Self::NAME) {
            return None;
        }
        Self::try_from_slice(&instruction.data[8..]).ok()
    }
}

/// An Anchor account body.
pub trait AnchorAccount: BorshSerialize + BorshDeserialize {
    /// The CamelCase account type name.
    const NAME: &'static str;

    /// Checks the discriminator and decodes the body, ignoring trailing bytes.
    fn from_account_data(data: &[u8]) -> Result<Self> {
        let Some((discriminator, mut body)) = data.split_first_chunk::<8>() else {
            return Err(Error::decode(Self::NAME, "account data is shorter than its discriminator"));
        };
        if *discriminator != account_discriminator(Self::NAME) {
            return Err(Error::decode(Self::NAME, "account discriminator mismatch"));
        }
        Self::deserialize(&mut body).map_err(|err| Error::decode(Self::NAME, err))
    }

    fn to_account_data(&self) -> Result<Vec<u8>> {
        let mut data = account_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data).map_err(|err| Error::decode(Self::NAME, err))?;
        Ok(data)
    }
}

/// An account meta as written in additional fields.
///
/// Keys are camelCase on output; the PascalCase keys Go tooling emits are
/// accepted on input.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountMetaJson {
    #[serde(with = "base58", alias = "PublicKey")]
    public_key: Pubkey,
    #[serde(default, alias = "IsSigner")]
    is_signer: bool,
    #[serde(default, alias = "IsWritable")]
    is_writable: bool,
}

/// Serde adapter for `Vec<AccountMeta>` in its JSON form.
pub mod account_metas {
    use super::*;

    pub fn serialize<S: Serializer>(metas: &[AccountMeta], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(metas.iter().map(|meta| AccountMetaJson {
            public_key: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<AccountMeta>, D::Error> {
        let metas = Vec::<AccountMetaJson>::deserialize(deserializer)?;
        Ok(metas
            .into_iter()
            .map(|meta| AccountMeta { pubkey: meta.public_key, is_signer: meta.is_signer, is_writable: meta.is_writable })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubkey::{SYSTEM_PROGRAM_ID, find_program_address, test_wallet};
    use serde_json::json;

    #[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
    struct Ping {
        id: [u8; 32],
        count: u32,
    }

    impl InstructionArgs for Ping {
        const NAME: &'static str = "ping";
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Accounts {
        #[serde(with = "account_metas")]
        accounts: Vec<AccountMeta>,
    }

    #[test]
    fn test_instruction_layout() {
        let ix = Ping { id: [1; 32], count: 2 }.build(SYSTEM_PROGRAM_ID, vec![]).unwrap();
        assert_eq!(discriminator(&ix), Some(instruction_discriminator("ping")));
        assert_eq!(&ix.data[8..40], &[1; 32]);
        assert_eq!(&ix.data[40..], &2u32.to_le_bytes());
        assert_eq!(Ping::decode(&ix), Some(Ping { id: [1; 32], count: 2 }));
    }

    #[test]
    fn test_known_discriminators() {
        // Anchor's `initialize` selector.
        assert_eq!(instruction_discriminator("initialize"), [175, 175, 109, 31, 13, 152, 155, 237]);
        assert_ne!(account_discriminator("Operation"), instruction_discriminator("Operation"));
    }

    #[test]
    fn test_pda_signer_flag_is_cleared() {
        let program = Pubkey::new_from_array(instruction_discriminator("x").repeat(4).try_into().unwrap());
        let (pda, _) = find_program_address(&[b"signer"], &program).unwrap();
        assert!(!without_pda_signer(AccountMeta::new(pda, true)).is_signer);
        assert!(without_pda_signer(AccountMeta::new(pda, true)).is_writable);
        assert!(without_pda_signer(AccountMeta::new(test_wallet(), true)).is_signer);
    }

    #[test]
    fn test_account_metas_json() {
        let key = test_wallet();
        let parsed: Accounts =
            serde_json::from_value(json!({ "accounts": [{ "publicKey": key.to_string(), "isWritable": true }] })).unwrap();
        assert_eq!(parsed.accounts, vec![AccountMeta::new(key, false)]);
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({ "accounts": [{ "publicKey": key.to_string(), "isSigner": false, "isWritable": true }] })
        );
    }

    #[test]
    fn test_account_metas_accept_go_keys() {
        let key = test_wallet();
        let parsed: Accounts = serde_json::from_value(json!({
            "accounts": [
                { "PublicKey": key.to_string(), "IsWritable": true, "IsSigner": true },
                { "PublicKey": SYSTEM_PROGRAM_ID.to_string() },
            ]
        }))
        .unwrap();
        assert_eq!(parsed.accounts, vec![AccountMeta::new(key, true), AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false)]);
    }
}

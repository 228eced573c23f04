//! Merkle leaves for the Canton MCMS template.
//!
//! The template builds its hash input as a hex string: integers are
//! left-padded to 64 hex digits, text is the hex of its ASCII bytes, and the
//! concatenation is hex-decoded before hashing. There is no domain separator.

use alloy_primitives::{B256, hex, keccak256};
use mcms_core::{ChainFamily, ChainMetadata, ChainSelector, Encoder, Error, Operation, Result, metrics::AdapterMetrics};
use tracing::debug;

use crate::fields::{CantonMetadataFields, CantonTransactionFields};

/// Left-pads to 64 hex digits, keeping only the first 64 of a longer input.
pub fn pad_left64(hex_digits: &str) -> String {
    if hex_digits.len() >= 64 {
        return hex_digits[..64].to_owned();
    }
    format!("{hex_digits:0>64}")
}

/// Lowercase hex without leading zeros; zero renders as `"0"`.
pub fn int_to_hex(n: u64) -> String {
    format!("{n:x}")
}

pub fn ascii_hex(text: &str) -> String {
    hex::encode(text.as_bytes())
}

/// Whether `s` decodes as hex bytes. The empty string does.
pub fn is_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Operation data as it enters a hash: raw hex passes through, any other
/// text is hex-encoded first.
pub fn operation_data_hex(data: &str) -> String {
    if is_hex(data) { data.to_owned() } else { ascii_hex(data) }
}

fn chain_id_hex(fields: &CantonMetadataFields) -> String {
    // `validate` rejects non-positive chain ids.
    pad_left64(&int_to_hex(fields.chain_id.unsigned_abs()))
}

fn keccak_hex(what: &'static str, encoded: &str) -> Result<B256> {
    let bytes = hex::decode(encoded).map_err(|err| Error::decode(what, err))?;
    Ok(keccak256(bytes))
}

/// Computes leaves for one Canton chain of a proposal.
///
/// Op counts and the override flag come from the metadata's additional
/// fields, which is where the template reads them from.
#[derive(Clone, Debug)]
pub struct CantonEncoder {
    pub chain_selector: ChainSelector,
    pub tx_count: u64,
    pub override_previous_root: bool,
    metrics: AdapterMetrics,
}

impl CantonEncoder {
    pub const fn new(chain_selector: ChainSelector, tx_count: u64, override_previous_root: bool) -> Self {
        Self { chain_selector, tx_count, override_previous_root, metrics: AdapterMetrics::new(ChainFamily::Canton) }
    }
}

impl Encoder for CantonEncoder {
    fn hash_operation(&self, op_count: u32, metadata: &ChainMetadata, op: &Operation) -> Result<B256> {
        let meta = CantonMetadataFields::parse(metadata)?;
        let fields = CantonTransactionFields::parse(&op.transaction)?;

        let encoded = [
            chain_id_hex(&meta),
            ascii_hex(&meta.multisig_id),
            pad_left64(&int_to_hex(u64::from(op_count))),
            ascii_hex(&fields.target_instance_id),
            ascii_hex(&fields.function_name),
            operation_data_hex(&fields.operation_data),
        ]
        .concat();
        let hash = keccak_hex("operation leaf", &encoded)?;

        self.metrics.record_hash("operation");
        debug!(chain_selector = %self.chain_selector, op_count, function = %fields.function_name, %hash, "Hashed operation");
        Ok(hash)
    }

    fn hash_metadata(&self, metadata: &ChainMetadata) -> Result<B256> {
        let meta = CantonMetadataFields::parse(metadata)?;
        let encoded = [
            chain_id_hex(&meta),
            ascii_hex(&meta.multisig_id),
            pad_left64(&int_to_hex(meta.pre_op_count)),
            pad_left64(&int_to_hex(meta.post_op_count)),
            (if meta.override_previous_root { "01" } else { "00" }).to_owned(),
        ]
        .concat();
        let hash = keccak_hex("metadata leaf", &encoded)?;

        self.metrics.record_hash("metadata");
        debug!(chain_selector = %self.chain_selector, pre = meta.pre_op_count, post = meta.post_op_count, %hash, "Hashed metadata");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;
    use mcms_core::Transaction;
    use serde_json::json;
    use test_case::test_case;

    fn encoder() -> CantonEncoder {
        CantonEncoder::new(ChainSelector(1), 5, false)
    }

    fn metadata(chain_id: i64, multisig_id: &str, pre: u64, post: u64, override_root: bool) -> ChainMetadata {
        ChainMetadata::new(pre, "00f8a3c8ed6c7e34bb3f3f16ed5d8a5fc9b7a6c1d2e3f4a5b6c7d8e9f0a1b2c3").with_additional_fields(
            json!({
                "chainId": chain_id,
                "multisigId": multisig_id,
                "preOpCount": pre,
                "postOpCount": post,
                "overridePreviousRoot": override_root,
            }),
        )
    }

    fn op(target: &str, function: &str, data: &str) -> Operation {
        Operation {
            chain_selector: ChainSelector(1),
            transaction: Transaction::new(
                "target-contract",
                vec![0x11, 0x22],
                json!({
                    "targetInstanceId": target,
                    "functionName": function,
                    "operationData": data,
                    "targetCid": "cid-123",
                }),
            ),
        }
    }

    #[test]
    fn test_hash_operation_known_answers() {
        let hash = encoder()
            .hash_operation(3, &metadata(1, "test-multisig", 0, 5, false), &op("instance-123", "executeAction", "1122334455"))
            .unwrap();
        assert_eq!(hash, b256!("e4f7155153e90245c12d484e518341394978318905a6710b230b54977170138a"));

        let hash = encoder()
            .hash_operation(5, &metadata(123, "prod-multisig", 5, 15, true), &op("prod-instance", "transfer", "aabbccdd"))
            .unwrap();
        assert_eq!(hash, b256!("e391f3bfd945f06842d5dd286ecdabd1a148a94fe982e840b82db16daf6848ba"));
    }

    #[test_case(1, "test-multisig", 0, 5, false, b256!("b88e2ae0ecfa263c7a6fa6322e9aac55a06e722a1d2cf470cca361dd1325f9a2") ; "basic")]
    #[test_case(123, "prod-multisig", 5, 15, true, b256!("8d9da63765997aa703892ca624faaecf58c83d0201642ae313d98588a9705f08") ; "override")]
    #[test_case(999, "another-multisig", 100, 200, false, b256!("92794b1a017c4f55705839076c13ceb257e75fad47cb9420420e58cd38854351") ; "large counts")]
    fn test_hash_metadata_known_answers(chain_id: i64, multisig_id: &str, pre: u64, post: u64, override_root: bool, expected: B256) {
        let hash = encoder().hash_metadata(&metadata(chain_id, multisig_id, pre, post, override_root)).unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_non_hex_operation_data_is_ascii_encoded() {
        let metadata = metadata(1, "test-multisig", 0, 1, false);
        let text = encoder().hash_operation(0, &metadata, &op("t", "f", "hello")).unwrap();
        let as_hex = encoder().hash_operation(0, &metadata, &op("t", "f", "68656c6c6f")).unwrap();
        assert_eq!(text, as_hex);
    }

    #[test]
    fn test_invalid_metadata_is_rejected() {
        let err = encoder().hash_metadata(&metadata(0, "test-multisig", 0, 1, false)).unwrap_err();
        assert!(matches!(err, Error::InvalidAdditionalFields(_)));
        let err = encoder().hash_operation(0, &metadata(1, "", 0, 1, false), &op("t", "f", "")).unwrap_err();
        assert!(matches!(err, Error::InvalidAdditionalFields(_)));
    }

    #[test_case("", "0000000000000000000000000000000000000000000000000000000000000000" ; "empty")]
    #[test_case("ff", "00000000000000000000000000000000000000000000000000000000000000ff" ; "short")]
    fn test_pad_left64(input: &str, expected: &str) {
        assert_eq!(pad_left64(input), expected);
    }

    #[test]
    fn test_pad_left64_truncates() {
        let long = "a".repeat(70);
        assert_eq!(pad_left64(&long), "a".repeat(64));
        assert_eq!(int_to_hex(0), "0");
        assert_eq!(int_to_hex(255), "ff");
    }

    #[test_case("abcd1234", true ; "lowercase")]
    #[test_case("ABCD1234", true ; "uppercase")]
    #[test_case("", true ; "empty")]
    #[test_case("abc", false ; "odd length")]
    #[test_case("ghij", false ; "non hex")]
    #[test_case("ab cd", false ; "spaces")]
    fn test_is_hex(input: &str, expected: bool) {
        assert_eq!(is_hex(input), expected);
    }

    #[test]
    fn test_operation_data_hex() {
        assert_eq!(operation_data_hex("abcd1234"), "abcd1234");
        assert_eq!(operation_data_hex("hello"), "68656c6c6f");
        assert_eq!(operation_data_hex("abc"), "616263");
    }
}

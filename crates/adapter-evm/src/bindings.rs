//! Solidity surface of the multisig and timelock contracts.

use alloy::sol;

sol! {
    #![sol(all_derives)]

    /// Many-chain multisig contract.
    interface ManyChainMultiSig {
        struct Signer {
            address addr;
            uint8 index;
            uint8 group;
        }

        struct Config {
            Signer[] signers;
            uint8[32] groupQuorums;
            uint8[32] groupParents;
        }

        struct RootMetadata {
            uint256 chainId;
            address multiSig;
            uint40 preOpCount;
            uint40 postOpCount;
            bool overridePreviousRoot;
        }

        struct Op {
            uint256 chainId;
            address multiSig;
            uint40 nonce;
            address to;
            uint256 value;
            bytes data;
        }

        struct Signature {
            uint8 v;
            bytes32 r;
            bytes32 s;
        }

        function setConfig(
            address[] calldata signerAddresses,
            uint8[] calldata signerGroups,
            uint8[32] calldata groupQuorums,
            uint8[32] calldata groupParents,
            bool clearRoot
        ) external;

        function setRoot(
            bytes32 root,
            uint32 validUntil,
            RootMetadata calldata metadata,
            bytes32[] calldata metadataProof,
            Signature[] calldata signatures
        ) external;

        function execute(Op calldata op, bytes32[] calldata proof) external payable;

        function getConfig() external view returns (Config memory);
        function getOpCount() external view returns (uint40);
        function getRoot() external view returns (bytes32 root, uint32 validUntil);
        function getRootMetadata() external view returns (RootMetadata memory);
    }

    /// Role-based timelock that executes batches scheduled by the multisig.
    interface RBACTimelock {
        struct Call {
            address target;
            uint256 value;
            bytes data;
        }

        function scheduleBatch(Call[] calldata calls, bytes32 predecessor, bytes32 salt, uint256 delay) external;
        function cancel(bytes32 id) external;
        function executeBatch(Call[] calldata calls, bytes32 predecessor, bytes32 salt) external payable;
        function bypasserExecuteBatch(Call[] calldata calls) external payable;

        function isOperation(bytes32 id) external view returns (bool);
        function isOperationPending(bytes32 id) external view returns (bool);
        function isOperationReady(bytes32 id) external view returns (bool);
        function isOperationDone(bytes32 id) external view returns (bool);
        function getMinDelay() external view returns (uint256);

        function getRoleMember(bytes32 role, uint256 index) external view returns (address);
        function getRoleMemberCount(bytes32 role) external view returns (uint256);
    }
}

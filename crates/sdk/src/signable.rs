use std::collections::BTreeMap;

use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use futures::future::try_join_all;
use mcms_core::{ChainSelector, Encoders, Error, Inspector, Proposal, Result, Signature};
use tracing::{debug, info};

use crate::adapters::Chains;

/// A proposal being collected signatures for.
pub struct Signable {
    proposal: Proposal,
    encoders: Encoders,
}

impl Signable {
    pub fn new(proposal: Proposal, encoders: Encoders) -> Self {
        Self { proposal, encoders }
    }

    /// Builds the encoders of every chain of `proposal` from `chains`.
    pub fn from_chains(proposal: Proposal, chains: &Chains) -> Result<Self> {
        let encoders = chains.encoders(&proposal.encoder_params())?;
        Ok(Self::new(proposal, encoders))
    }

    pub fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    pub fn into_proposal(self) -> Proposal {
        self.proposal
    }

    pub fn signing_hash(&self) -> Result<B256> {
        self.proposal.signing_hash(&self.encoders)
    }

    /// Signs the proposal's signing hash and appends the signature.
    pub fn sign<S: SignerSync + ?Sized>(&mut self, signer: &S) -> Result<Signature> {
        let hash = self.signing_hash()?;
        let signature = signer.sign_hash_sync(&hash).map_err(|err| Error::InvalidSignature(err.to_string()))?;
        let signature = Signature::from_bytes(&signature.as_bytes())?;
        self.proposal.append_signature(signature);
        debug!(%hash, signatures = self.proposal.base.signatures.len(), "Signed proposal");
        Ok(signature)
    }

    /// The address behind every collected signature, in signature order.
    pub fn signers(&self) -> Result<Vec<Address>> {
        let hash = self.signing_hash()?;
        self.proposal.base.signatures.iter().map(|signature| signature.recover_signer(hash)).collect()
    }

    /// Checks that the collected signers can set the root on every chain,
    /// against the config each multisig currently holds.
    pub async fn validate_signatures(&self, inspectors: &BTreeMap<ChainSelector, &dyn Inspector>) -> Result<()> {
        let signers = self.signers()?;
        let checks = self.proposal.chain_selectors().into_iter().map(|selector| {
            let signers = &signers;
            async move {
                let inspector = inspectors.get(&selector).ok_or(Error::UnknownChainSelector(selector))?;
                let metadata = self.proposal.base.metadata_for(selector)?;
                let config = inspector.get_config(&metadata.mcm_address).await?;
                if !config.can_set_root(signers) {
                    return Err(Error::QuorumNotReached(selector));
                }
                Ok(())
            }
        });
        try_join_all(checks).await?;

        info!(signers = signers.len(), chains = self.proposal.base.chain_metadata.len(), "Signatures reach quorum");
        Ok(())
    }
}

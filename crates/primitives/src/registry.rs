//! The registry of known rollup profiles.
//!
//! Only the OP stack batchers are builtin: they are the `batcher_address` values of the
//! superchain registry for each chain. Batch posters of the other rollups are not published in a
//! registry and rotate over time, sessions on those networks must provide them.

use crate::{
    known_networks::*, BlockCommit, BlocksVerification, CommitBatch, ConfirmationThresholds,
    DataFinalizedV3, DataSubmittedV3, FinalizeBatch, NetworkId, RollupFamily, RollupProfile,
    SequenceBatches, VerifyBatchesTrustedAggregator,
};

use alloy_primitives::{address, Address, B256};
use alloy_sol_types::SolEvent;
use std::{collections::HashMap, sync::Arc};

/// The challenge period of optimistic rollups, in hours.
pub const OPTIMISTIC_CHALLENGE_PERIOD_HOURS: u64 = 7 * 24;

/// The symbol of the native token of Ethereum L1s.
const ETH: &str = "ETH";

/// An immutable map of [`RollupProfile`]s keyed by L2 network.
#[derive(Debug, Clone, Default)]
pub struct RollupRegistry {
    profiles: HashMap<NetworkId, Arc<RollupProfile>>,
}

impl RollupRegistry {
    /// Returns a new [`RollupRegistry`] from the provided profiles. Later profiles replace earlier
    /// ones for the same network.
    pub fn new(profiles: impl IntoIterator<Item = RollupProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.network_id.clone(), Arc::new(profile)))
                .collect(),
        }
    }

    /// Returns the registry of the networks known to the tracker.
    pub fn builtin() -> Self {
        Self::new([
            optimistic(ARBITRUM_ONE, MAINNET, RollupFamily::Arbitrum, &[]),
            optimistic(ARBITRUM_SEPOLIA, SEPOLIA, RollupFamily::Arbitrum, &[]),
            optimistic(
                OPTIMISM,
                MAINNET,
                RollupFamily::OpStack,
                &[address!("0x6887246668a3b87F54DeB3b94Ba47a6f63F32985")],
            ),
            optimistic(
                OPTIMISM_SEPOLIA,
                SEPOLIA,
                RollupFamily::OpStack,
                &[address!("0x8F23BB38F531600e5d8FDDaAEC41F13FaB46E98c")],
            ),
            optimistic(
                BASE,
                MAINNET,
                RollupFamily::OpStack,
                &[address!("0x5050F69a9786F081509234F1a7F4684b5E5b76C9")],
            ),
            optimistic(
                BASE_SEPOLIA,
                SEPOLIA,
                RollupFamily::OpStack,
                &[address!("0x6CDEbe940BC0F26850285cacA097C11c33103E47")],
            ),
            zk(ZKSYNC, MAINNET, RollupFamily::ZkSync, &[]),
            zk(ZKSYNC_SEPOLIA, SEPOLIA, RollupFamily::ZkSync, &[]),
            zk(POLYGON_ZKEVM, MAINNET, RollupFamily::PolygonZkEvm, &[]),
            zk(POLYGON_ZKEVM_CARDONA, SEPOLIA, RollupFamily::PolygonZkEvm, &[]),
            zk(SCROLL, MAINNET, RollupFamily::Scroll, &[]),
            zk(SCROLL_SEPOLIA, SEPOLIA, RollupFamily::Scroll, &[]),
            zk(LINEA, MAINNET, RollupFamily::Linea, &[]),
            zk(LINEA_SEPOLIA, SEPOLIA, RollupFamily::Linea, &[]),
        ])
    }

    /// Returns the profile of the provided network, if known.
    pub fn get(&self, network_id: &NetworkId) -> Option<Arc<RollupProfile>> {
        self.profiles.get(network_id).cloned()
    }

    /// Returns true if the registry holds a profile for the network.
    pub fn contains(&self, network_id: &NetworkId) -> bool {
        self.profiles.contains_key(network_id)
    }

    /// Returns true if the network is the settlement layer of at least one profile.
    pub fn is_known_l1(&self, network_id: &NetworkId) -> bool {
        self.profiles.values().any(|profile| &profile.l1_network_id == network_id)
    }

    /// Returns an iterator over the registered L2 networks.
    pub fn networks(&self) -> impl Iterator<Item = &NetworkId> {
        self.profiles.keys()
    }

    /// Returns the number of registered profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn optimistic(
    network: &str,
    l1: &str,
    family: RollupFamily,
    posters: &[Address],
) -> RollupProfile {
    RollupProfile {
        network_id: network.into(),
        l1_network_id: l1.into(),
        family,
        security_model: family.security_model(),
        batch_poster_addresses: posters.iter().copied().collect(),
        challenge_period_hours: OPTIMISTIC_CHALLENGE_PERIOD_HOURS,
        confirmation_thresholds: ConfirmationThresholds::default(),
        proof_verification_topics: Vec::new(),
        proof_submission_topics: Vec::new(),
        native_token_symbol: ETH.to_string(),
    }
}

fn zk(network: &str, l1: &str, family: RollupFamily, posters: &[Address]) -> RollupProfile {
    let (proof_submission_topics, proof_verification_topics) = proof_topics(family);
    RollupProfile {
        network_id: network.into(),
        l1_network_id: l1.into(),
        family,
        security_model: family.security_model(),
        batch_poster_addresses: posters.iter().copied().collect(),
        challenge_period_hours: 0,
        confirmation_thresholds: ConfirmationThresholds::default(),
        proof_verification_topics,
        proof_submission_topics,
        native_token_symbol: ETH.to_string(),
    }
}

/// Returns the (submission, verification) event signatures of a zk family.
fn proof_topics(family: RollupFamily) -> (Vec<B256>, Vec<B256>) {
    match family {
        RollupFamily::ZkSync => {
            (vec![BlockCommit::SIGNATURE_HASH], vec![BlocksVerification::SIGNATURE_HASH])
        }
        RollupFamily::PolygonZkEvm => (
            vec![SequenceBatches::SIGNATURE_HASH],
            vec![VerifyBatchesTrustedAggregator::SIGNATURE_HASH],
        ),
        RollupFamily::Scroll => {
            (vec![CommitBatch::SIGNATURE_HASH], vec![FinalizeBatch::SIGNATURE_HASH])
        }
        RollupFamily::Linea => {
            (vec![DataSubmittedV3::SIGNATURE_HASH], vec![DataFinalizedV3::SIGNATURE_HASH])
        }
        RollupFamily::Arbitrum | RollupFamily::OpStack => (Vec::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecurityModel;

    #[test]
    fn test_builtin_registry_profiles() {
        let registry = RollupRegistry::builtin();

        let arbitrum = registry.get(&ARBITRUM_SEPOLIA.into()).expect("arbitrum sepolia profile");
        assert_eq!(arbitrum.security_model, SecurityModel::Optimistic);
        assert_eq!(arbitrum.challenge_period_hours, 168);
        assert_eq!(arbitrum.l1_network_id, NetworkId::from(SEPOLIA));
        assert!(arbitrum.proof_verification_topics.is_empty());

        let scroll = registry.get(&SCROLL.into()).expect("scroll profile");
        assert_eq!(scroll.security_model, SecurityModel::Zk);
        assert_eq!(scroll.proof_verification_topics, vec![FinalizeBatch::SIGNATURE_HASH]);
        assert_eq!(scroll.proof_submission_topics, vec![CommitBatch::SIGNATURE_HASH]);

        let base_sepolia = registry.get(&BASE_SEPOLIA.into()).expect("base sepolia profile");
        assert!(base_sepolia
            .is_batch_poster(&address!("0x6CDEbe940BC0F26850285cacA097C11c33103E47")));
        assert!(arbitrum.batch_poster_addresses.is_empty());

        assert!(registry.is_known_l1(&SEPOLIA.into()));
        assert!(!registry.contains(&SEPOLIA.into()));
        assert!(registry.get(&"unknown-rollup".into()).is_none());
    }

    #[test]
    fn test_poster_override_does_not_mutate_registry() {
        let registry = RollupRegistry::builtin();
        let profile = registry.get(&BASE.into()).unwrap();
        let poster = Address::repeat_byte(0x42);

        let overridden = profile.with_batch_posters([poster]);
        assert!(overridden.is_batch_poster(&poster));
        assert!(!registry.get(&BASE.into()).unwrap().is_batch_poster(&poster));
    }
}

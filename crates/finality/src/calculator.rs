//! Finality estimation of settled batches.
//!
//! Optimistic rollups finalize once their challenge period elapsed; until then confidence is
//! capped at 60 no matter how many L1 confirmations the batch gathered. Zk rollups finalize
//! once a validity proof was verified on L1, which is detected from the event signatures of the
//! batch receipt.

use crate::{Clock, FinalityError};

use alloy_primitives::TxHash;
use settlement_primitives::{
    ChainReceipt, ConfirmationThresholds, FinalityMetrics, FinalityStatus, NetworkId,
    RollupProfile, RollupRegistry, SecurityLevel, SecurityModel, SECONDS_PER_HOUR,
};
use settlement_providers::{with_timeout, ChainClient};
use std::{sync::Arc, time::Duration};

/// The maximum confidence of an optimistic batch within its challenge period.
const CHALLENGE_PERIOD_MAX_CONFIDENCE: f64 = 60.0;

/// The weight of the challenge progress in the confidence of an optimistic batch.
const CHALLENGE_PROGRESS_WEIGHT: f64 = 0.7;

/// The weight of the L1 confirmations in the confidence of an optimistic batch.
const CONFIRMATION_WEIGHT: f64 = 0.3;

/// The base confidence of a zk batch whose proof was submitted but not verified.
const SUBMITTED_PROOF_CONFIDENCE: u8 = 40;

/// The base confidence of a zk batch without proof evidence.
const NO_PROOF_CONFIDENCE: u8 = 10;

/// The largest confirmation bonus.
const MAX_CONFIRMATION_BONUS: u8 = 30;

/// The proof evidence found in the receipt of a zk batch.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ProofEvidence {
    /// No proof event was found.
    #[default]
    None,
    /// The batch was committed and awaits its proof.
    Submitted,
    /// A validity proof was verified.
    Verified,
}

impl ProofEvidence {
    /// Returns the evidence carried by the receipt. A missing verification event means the proof
    /// is not verified yet, not that it failed.
    pub fn from_receipt(profile: &RollupProfile, receipt: &ChainReceipt) -> Self {
        let mut evidence = Self::None;
        for signature in receipt.event_signatures() {
            if profile.proof_verification_topics.contains(signature) {
                return Self::Verified
            }
            if profile.proof_submission_topics.contains(signature) {
                evidence = Self::Submitted;
            }
        }
        evidence
    }
}

/// The observations finality is derived from.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FinalityInputs {
    /// The number of L1 blocks built on top of the batch block.
    pub l1_confirmations: u64,
    /// The timestamp of the batch block, in seconds.
    pub l1_timestamp: u64,
    /// The current unix time, in seconds.
    pub now: u64,
    /// Whether the batch transaction reverted.
    pub batch_reverted: bool,
    /// The proof evidence of the batch.
    pub proof_evidence: ProofEvidence,
}

impl FinalityInputs {
    /// Returns the inputs observed at `now` for a batch in `l1_block_number`, given the current
    /// L1 head and the batch receipt.
    pub fn observe(
        profile: &RollupProfile,
        l1_head: u64,
        l1_block_number: u64,
        l1_timestamp: u64,
        now: u64,
        receipt: Option<&ChainReceipt>,
    ) -> Self {
        Self {
            l1_confirmations: l1_head.saturating_sub(l1_block_number),
            l1_timestamp,
            now,
            batch_reverted: receipt.is_some_and(|receipt| !receipt.success),
            proof_evidence: receipt
                .map(|receipt| ProofEvidence::from_receipt(profile, receipt))
                .unwrap_or_default(),
        }
    }
}

/// Returns the finality of a batch of the rollup given the observed inputs.
///
/// The result only depends on its arguments, and the confidence never decreases as
/// confirmations or time grow.
pub fn evaluate(profile: &RollupProfile, inputs: &FinalityInputs) -> FinalityMetrics {
    let thresholds = &profile.confirmation_thresholds;
    let confirmations = inputs.l1_confirmations;

    if inputs.batch_reverted {
        return FinalityMetrics {
            status: FinalityStatus::Disputed,
            confidence: 0,
            l1_confirmations: confirmations,
            challenge_period_remaining_hours: None,
            proof_verified: (!profile.is_optimistic()).then_some(false),
            security_level: SecurityLevel::Low,
        }
    }

    let tier = thresholds.tier(confirmations);
    let mut metrics = match profile.security_model {
        SecurityModel::Optimistic => evaluate_optimistic(profile, inputs, tier),
        SecurityModel::Zk => evaluate_zk(thresholds, inputs, tier),
    };
    if !metrics.is_finalized() {
        metrics.security_level = metrics.security_level.min(SecurityLevel::Medium);
    }
    metrics
}

fn evaluate_optimistic(
    profile: &RollupProfile,
    inputs: &FinalityInputs,
    tier: SecurityLevel,
) -> FinalityMetrics {
    let challenge_period_end = inputs.l1_timestamp.saturating_add(profile.challenge_period_secs());

    if inputs.now >= challenge_period_end {
        return FinalityMetrics {
            status: FinalityStatus::Finalized,
            confidence: tier_confidence(tier),
            l1_confirmations: inputs.l1_confirmations,
            challenge_period_remaining_hours: Some(0.0),
            proof_verified: None,
            security_level: tier,
        }
    }

    // the challenge period is not empty past this point.
    let remaining_hours = (challenge_period_end - inputs.now) as f64 / SECONDS_PER_HOUR as f64;
    let progress =
        (1.0 - remaining_hours / profile.challenge_period_hours as f64).clamp(0.0, 1.0);
    let high = profile.confirmation_thresholds.high.max(1);
    let confirmation_bonus =
        (inputs.l1_confirmations as f64 / high as f64).min(1.0) * CONFIRMATION_WEIGHT;
    let confidence = ((progress * CHALLENGE_PROGRESS_WEIGHT + confirmation_bonus) *
        CHALLENGE_PERIOD_MAX_CONFIDENCE)
        .round()
        .clamp(0.0, CHALLENGE_PERIOD_MAX_CONFIDENCE) as u8;

    FinalityMetrics {
        status: FinalityStatus::ChallengePeriod,
        confidence,
        l1_confirmations: inputs.l1_confirmations,
        challenge_period_remaining_hours: Some(remaining_hours),
        proof_verified: None,
        security_level: tier,
    }
}

fn evaluate_zk(
    thresholds: &ConfirmationThresholds,
    inputs: &FinalityInputs,
    tier: SecurityLevel,
) -> FinalityMetrics {
    let confirmations = inputs.l1_confirmations;
    let bonus = confirmation_bonus(thresholds, confirmations);
    let (status, confidence) = match inputs.proof_evidence {
        ProofEvidence::Verified if confirmations >= thresholds.low => {
            (FinalityStatus::Finalized, tier_confidence(tier))
        }
        ProofEvidence::Verified => (FinalityStatus::Pending, tier_confidence(tier)),
        ProofEvidence::Submitted => (FinalityStatus::Pending, SUBMITTED_PROOF_CONFIDENCE + bonus),
        ProofEvidence::None => (FinalityStatus::Pending, NO_PROOF_CONFIDENCE + bonus / 2),
    };

    FinalityMetrics {
        status,
        confidence,
        l1_confirmations: confirmations,
        challenge_period_remaining_hours: None,
        proof_verified: Some(inputs.proof_evidence == ProofEvidence::Verified),
        security_level: tier,
    }
}

/// Returns the confidence of a final batch at the confirmation tier.
const fn tier_confidence(tier: SecurityLevel) -> u8 {
    match tier {
        SecurityLevel::Low => 70,
        SecurityLevel::Medium => 85,
        SecurityLevel::High => 95,
        SecurityLevel::Maximum => 100,
    }
}

/// Returns the confidence bonus of unproven zk batches.
const fn confirmation_bonus(thresholds: &ConfirmationThresholds, confirmations: u64) -> u8 {
    let bonus = if confirmations < thresholds.low {
        0
    } else if confirmations < thresholds.medium {
        10
    } else if confirmations < thresholds.high {
        15
    } else if confirmations < thresholds.maximum {
        20
    } else {
        30
    };
    if bonus > MAX_CONFIRMATION_BONUS {
        MAX_CONFIRMATION_BONUS
    } else {
        bonus
    }
}

/// Calculates the finality of batches from the live state of L1.
#[derive(Debug, Clone)]
pub struct FinalityCalculator {
    registry: Arc<RollupRegistry>,
    clock: Arc<dyn Clock>,
    rpc_timeout: Duration,
}

impl FinalityCalculator {
    /// Returns a new [`FinalityCalculator`].
    pub fn new(
        registry: Arc<RollupRegistry>,
        clock: Arc<dyn Clock>,
        rpc_timeout: Duration,
    ) -> Self {
        Self { registry, clock, rpc_timeout }
    }

    /// Returns the finality of the batch posted for `network_id` in the L1 transaction
    /// `l1_tx_hash`, reading the L1 state from `l1`.
    #[tracing::instrument(
        target = "settlement::finality",
        skip_all,
        fields(network = %network_id, l1_tx_hash = ?l1_tx_hash, l1_block_number)
    )]
    pub async fn calculate(
        &self,
        l1: &dyn ChainClient,
        network_id: &NetworkId,
        l1_tx_hash: TxHash,
        l1_block_number: u64,
        l1_timestamp: u64,
    ) -> Result<FinalityMetrics, FinalityError> {
        let profile = self
            .registry
            .get(network_id)
            .ok_or_else(|| FinalityError::UnsupportedNetwork(network_id.clone()))?;

        let l1_head = with_timeout(self.rpc_timeout, l1.block_number()).await?;
        let receipt = with_timeout(self.rpc_timeout, l1.transaction_receipt(l1_tx_hash)).await?;
        let inputs = FinalityInputs::observe(
            &profile,
            l1_head,
            l1_block_number,
            l1_timestamp,
            self.clock.now_secs(),
            receipt.as_ref(),
        );

        let metrics = evaluate(&profile, &inputs);
        tracing::trace!(target: "settlement::finality", status = %metrics.status, confidence = metrics.confidence, confirmations = metrics.l1_confirmations, "calculated finality");
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedClock;

    use alloy_primitives::Address;
    use alloy_sol_types::SolEvent;
    use settlement_primitives::{known_networks, CommitBatch, FinalizeBatch};
    use settlement_providers::test_utils::MockChainClient;

    const HOUR: u64 = SECONDS_PER_HOUR;
    const BATCH_TIME: u64 = 1_700_000_000;

    fn profile(network: &str) -> Arc<RollupProfile> {
        RollupRegistry::builtin().get(&network.into()).unwrap()
    }

    fn optimistic_inputs(confirmations: u64, age_secs: u64) -> FinalityInputs {
        FinalityInputs {
            l1_confirmations: confirmations,
            l1_timestamp: BATCH_TIME,
            now: BATCH_TIME + age_secs,
            ..Default::default()
        }
    }

    #[test]
    fn test_optimistic_batch_past_challenge_period_is_finalized() {
        let profile = profile(known_networks::ARBITRUM_SEPOLIA);
        let metrics = evaluate(&profile, &optimistic_inputs(40, 169 * HOUR));

        assert_eq!(metrics.status, FinalityStatus::Finalized);
        assert_eq!(metrics.confidence, 100);
        assert_eq!(metrics.security_level, SecurityLevel::Maximum);
        assert_eq!(metrics.challenge_period_remaining_hours, Some(0.0));
        assert_eq!(metrics.proof_verified, None);
    }

    #[test]
    fn test_finalized_confidence_by_tier() {
        let profile = profile(known_networks::BASE);
        for (confirmations, expected) in [(0, 70), (5, 70), (6, 85), (12, 95), (32, 100)] {
            let metrics = evaluate(&profile, &optimistic_inputs(confirmations, 200 * HOUR));
            assert_eq!(metrics.confidence, expected, "{confirmations} confirmations");
        }
    }

    #[test]
    fn test_optimistic_batch_within_challenge_period() {
        let profile = profile(known_networks::ARBITRUM_SEPOLIA);
        let metrics = evaluate(&profile, &optimistic_inputs(0, HOUR));

        assert_eq!(metrics.status, FinalityStatus::ChallengePeriod);
        assert!(metrics.confidence <= 60);
        assert_eq!(metrics.challenge_period_remaining_hours, Some(167.0));
        assert_eq!(metrics.security_level, SecurityLevel::Low);

        // confidence stays capped however many confirmations the batch gathered.
        let metrics = evaluate(&profile, &optimistic_inputs(1_000, 167 * HOUR));
        assert_eq!(metrics.status, FinalityStatus::ChallengePeriod);
        assert_eq!(metrics.confidence, 60);
        assert_eq!(metrics.security_level, SecurityLevel::Medium);
    }

    #[test]
    fn test_challenge_period_confidence_formula() {
        let profile = profile(known_networks::OPTIMISM);
        // half of the period elapsed and half of the high threshold reached:
        // (0.5 * 0.7 + 0.5 * 0.3) * 60 = 30.
        let metrics = evaluate(&profile, &optimistic_inputs(6, 84 * HOUR));
        assert_eq!(metrics.confidence, 30);
    }

    #[test]
    fn test_confidence_is_monotonic() {
        for network in [known_networks::ARBITRUM_ONE, known_networks::SCROLL] {
            let profile = profile(network);
            for age in [0, HOUR, 100 * HOUR, 168 * HOUR, 200 * HOUR] {
                for evidence in
                    [ProofEvidence::None, ProofEvidence::Submitted, ProofEvidence::Verified]
                {
                    let mut previous = 0;
                    for confirmations in 0..=40 {
                        let inputs = FinalityInputs {
                            proof_evidence: evidence,
                            ..optimistic_inputs(confirmations, age)
                        };
                        let confidence = evaluate(&profile, &inputs).confidence;
                        assert!(confidence >= previous, "{network}: {confirmations} at {age}");
                        previous = confidence;
                    }
                }
            }

            let mut previous = 0;
            for age in (0..=200).map(|hours| hours * HOUR) {
                let confidence = evaluate(&profile, &optimistic_inputs(3, age)).confidence;
                assert!(confidence >= previous, "{network}: age {age}");
                previous = confidence;
            }
        }
    }

    #[test]
    fn test_zk_confidence_by_evidence() {
        let profile = profile(known_networks::SCROLL);
        let inputs = |confirmations, proof_evidence| FinalityInputs {
            l1_confirmations: confirmations,
            proof_evidence,
            ..Default::default()
        };

        let verified = evaluate(&profile, &inputs(12, ProofEvidence::Verified));
        assert_eq!(verified.status, FinalityStatus::Finalized);
        assert_eq!(verified.confidence, 95);
        assert_eq!(verified.proof_verified, Some(true));
        assert_eq!(verified.challenge_period_remaining_hours, None);

        let unconfirmed = evaluate(&profile, &inputs(0, ProofEvidence::Verified));
        assert_eq!(unconfirmed.status, FinalityStatus::Pending);
        assert_eq!(unconfirmed.confidence, 70);

        let submitted = evaluate(&profile, &inputs(6, ProofEvidence::Submitted));
        assert_eq!(submitted.status, FinalityStatus::Pending);
        assert_eq!(submitted.confidence, 55);
        assert_eq!(submitted.proof_verified, Some(false));
        assert_eq!(evaluate(&profile, &inputs(64, ProofEvidence::Submitted)).confidence, 70);

        let none = evaluate(&profile, &inputs(12, ProofEvidence::None));
        assert_eq!(none.confidence, 20);
        assert_eq!(none.security_level, SecurityLevel::Medium);
    }

    #[test]
    fn test_reverted_batch_is_disputed() {
        let profile = profile(known_networks::BASE_SEPOLIA);
        let inputs = FinalityInputs { batch_reverted: true, ..optimistic_inputs(50, 300 * HOUR) };
        let metrics = evaluate(&profile, &inputs);

        assert_eq!(metrics.status, FinalityStatus::Disputed);
        assert_eq!(metrics.confidence, 0);
        assert_eq!(metrics.security_level, SecurityLevel::Low);
    }

    #[test]
    fn test_proof_evidence_from_receipt() {
        let profile = profile(known_networks::SCROLL);
        let mut receipt = ChainReceipt { success: true, ..Default::default() };
        assert_eq!(ProofEvidence::from_receipt(&profile, &receipt), ProofEvidence::None);

        receipt.logs.push(settlement_primitives::ReceiptLog {
            address: Address::ZERO,
            topics: vec![CommitBatch::SIGNATURE_HASH],
        });
        assert_eq!(ProofEvidence::from_receipt(&profile, &receipt), ProofEvidence::Submitted);

        receipt.logs.push(settlement_primitives::ReceiptLog {
            address: Address::ZERO,
            topics: vec![FinalizeBatch::SIGNATURE_HASH],
        });
        assert_eq!(ProofEvidence::from_receipt(&profile, &receipt), ProofEvidence::Verified);
    }

    #[tokio::test]
    async fn test_calculate_reads_l1() -> eyre::Result<()> {
        let l1 = MockChainClient::new(120);
        let poster = Address::repeat_byte(0x11);
        let hash = l1.insert_transaction(100, poster, true, &[]);
        let calculator = FinalityCalculator::new(
            Arc::new(RollupRegistry::builtin()),
            Arc::new(FixedClock::new(BATCH_TIME + HOUR)),
            Duration::from_secs(10),
        );

        let network = NetworkId::from(known_networks::ARBITRUM_SEPOLIA);
        let first = calculator.calculate(&l1, &network, hash, 100, BATCH_TIME).await?;
        let second = calculator.calculate(&l1, &network, hash, 100, BATCH_TIME).await?;
        assert_eq!(first, second);
        assert_eq!(first.l1_confirmations, 20);
        assert_eq!(first.status, FinalityStatus::ChallengePeriod);

        let err = calculator
            .calculate(&l1, &"unknown-rollup".into(), hash, 100, BATCH_TIME)
            .await
            .unwrap_err();
        assert!(matches!(err, FinalityError::UnsupportedNetwork(_)));
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use settlement_primitives::{PendingRecord, SessionId, SessionStatus};

/// Aggregated settlement statistics of a session.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    /// The session.
    pub session_id: SessionId,
    /// The status of the session.
    pub status: SessionStatus,
    /// The number of registered records.
    pub total_transactions: usize,
    /// The number of records attributed to a batch.
    pub settled_transactions: usize,
    /// The number of records awaiting a batch.
    pub pending_transactions: usize,
    /// The number of settled records whose batch is final.
    pub finalized_transactions: usize,
    /// The mean settlement time of the settled records, in milliseconds.
    pub average_settlement_time_ms: Option<f64>,
    /// The mean finality confidence of the settled records.
    pub average_finality_confidence: Option<f64>,
    /// The sum of the amortized costs of the settled records, in USD.
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
    /// The mean amortized cost of the settled records, in USD.
    #[serde(rename = "averageCostPerTxUSD")]
    pub average_cost_per_tx_usd: Option<f64>,
}

impl SessionStatistics {
    /// Aggregates the records of a session.
    pub fn from_records(
        session_id: SessionId,
        status: SessionStatus,
        records: &[PendingRecord],
    ) -> Self {
        let settled: Vec<_> = records
            .iter()
            .filter_map(|record| {
                let metrics = record.finality_metrics.as_ref();
                record.l1_settlement_info.as_ref().map(|info| (info, metrics))
            })
            .collect();

        let total_cost_usd = settled.iter().map(|(info, _)| info.cost.per_tx_cost_usd).sum();
        let confidences: Vec<f64> = settled
            .iter()
            .filter_map(|(_, metrics)| metrics.map(|m| f64::from(m.confidence)))
            .collect();

        Self {
            session_id,
            status,
            total_transactions: records.len(),
            settled_transactions: settled.len(),
            pending_transactions: records.len() - settled.len(),
            finalized_transactions: settled
                .iter()
                .filter(|(_, metrics)| metrics.is_some_and(|m| m.is_finalized()))
                .count(),
            average_settlement_time_ms: mean(
                settled.iter().map(|(info, _)| info.settlement_time_ms as f64),
            ),
            average_finality_confidence: mean(confidences.into_iter()),
            total_cost_usd,
            average_cost_per_tx_usd: mean(
                settled.iter().map(|(info, _)| info.cost.per_tx_cost_usd),
            ),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

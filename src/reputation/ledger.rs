//! Append-only feedback ledger, exported at `/.well-known/feedback.json`

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One piece of feedback the host left about a remote agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub feedback_auth_id: Option<String>,
    pub agent_skill_id: String,
    pub task_id: String,
    pub context_id: String,
    /// Rating scaled to 0..=100
    pub rating_percent: u8,
    pub domain: String,
    pub notes: String,
    pub proof_of_payment_tx_hash: Option<String>,
}

/// In-memory, append-only list of feedback records
#[derive(Debug, Default)]
pub struct FeedbackLedger {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl FeedbackLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, record: FeedbackRecord) {
        self.records.write().await.push(record);
    }

    /// All records in insertion order
    pub async fn snapshot(&self) -> Vec<FeedbackRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Pretty JSON array of every record
    pub async fn to_json(&self) -> crate::core::Result<String> {
        Ok(serde_json::to_string_pretty(&*self.records.read().await)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rating_percent: u8) -> FeedbackRecord {
        FeedbackRecord {
            feedback_auth_id: None,
            agent_skill_id: "finder".to_string(),
            task_id: String::new(),
            context_id: String::new(),
            rating_percent,
            domain: "finder.localhost:10002".to_string(),
            notes: "quick".to_string(),
            proof_of_payment_tx_hash: None,
        }
    }

    #[tokio::test]
    async fn test_snapshot_keeps_order() {
        let ledger = FeedbackLedger::new();
        ledger.append(record(20)).await;
        ledger.append(record(100)).await;
        let records = ledger.snapshot().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rating_percent, 20);
        assert_eq!(records[1].rating_percent, 100);
    }

    #[tokio::test]
    async fn test_export_is_camel_case() {
        let ledger = FeedbackLedger::new();
        ledger.append(record(80)).await;
        let exported: serde_json::Value = serde_json::from_str(&ledger.to_json().await.unwrap()).unwrap();
        assert_eq!(exported[0]["ratingPercent"], 80);
        assert_eq!(exported[0]["agentSkillId"], "finder");
        assert!(exported[0]["feedbackAuthId"].is_null());
        assert!(exported[0].get("proofOfPaymentTxHash").is_some());
    }
}

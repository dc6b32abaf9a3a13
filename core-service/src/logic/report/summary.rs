//! Prediction Summary
//!
//! total_flows + per-label counts + {average, max, min} of the confidences
//! that are present. Absent confidences are skipped, never counted as 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logic::model::PredictionRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub average_confidence: f64,
    pub max_confidence: f64,
    pub min_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub total_flows: usize,
    pub attack_counts: BTreeMap<String, usize>,
    /// None when no record carries a confidence
    pub summary_stats: Option<ConfidenceStats>,
    pub detailed_results: Vec<PredictionRecord>,
}

impl PredictionSummary {
    pub fn from_records(records: Vec<PredictionRecord>) -> Self {
        let mut attack_counts = BTreeMap::new();
        for record in &records {
            *attack_counts.entry(record.predicted_label.clone()).or_insert(0) += 1;
        }

        let summary_stats = ConfidenceStats::from_scores(
            records.iter().filter_map(|r| r.confidence_score),
        );

        Self {
            total_flows: records.len(),
            attack_counts,
            summary_stats,
            detailed_results: records,
        }
    }

    /// Label with the highest count (ties -> alphabetical first)
    pub fn top_label(&self) -> Option<(&str, usize)> {
        self.attack_counts
            .iter()
            .fold(None, |best: Option<(&str, usize)>, (label, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((label.as_str(), count)),
            })
    }
}

impl ConfidenceStats {
    pub fn from_scores(scores: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;

        for score in scores {
            count += 1;
            sum += score;
            max = max.max(score);
            min = min.min(score);
        }

        (count > 0).then(|| Self {
            average_confidence: sum / count as f64,
            max_confidence: max,
            min_confidence: min,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, confidence: Option<f64>) -> PredictionRecord {
        PredictionRecord {
            predicted_label: label.to_string(),
            confidence_score: confidence,
            explanation: "test".to_string(),
        }
    }

    #[test]
    fn test_summary_counts_and_stats() {
        let summary = PredictionSummary::from_records(vec![
            record("DDoS", Some(0.9)),
            record("BENIGN", Some(0.5)),
            record("DDoS", None),
            record("DDoS", Some(0.7)),
        ]);

        assert_eq!(summary.total_flows, 4);
        assert_eq!(summary.attack_counts["DDoS"], 3);
        assert_eq!(summary.attack_counts["BENIGN"], 1);

        let stats = summary.summary_stats.as_ref().unwrap();
        assert!((stats.average_confidence - 0.7).abs() < 1e-12);
        assert_eq!(stats.max_confidence, 0.9);
        assert_eq!(stats.min_confidence, 0.5);
        assert_eq!(summary.top_label(), Some(("DDoS", 3)));
    }

    #[test]
    fn test_summary_without_confidences() {
        let summary = PredictionSummary::from_records(vec![record("BENIGN", None)]);
        assert!(summary.summary_stats.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["summary_stats"].is_null());
        assert_eq!(json["detailed_results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_top_label_tie_alphabetical() {
        let summary = PredictionSummary::from_records(vec![record("b", None), record("a", None)]);
        assert_eq!(summary.top_label(), Some(("a", 1)));
    }
}

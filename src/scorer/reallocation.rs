use serde::Serialize;

use crate::aggregator::AggregatedRow;
use crate::config::heuristic::{
    CONVERSION_WEIGHT, LOWER_BOUND, MIN_ROAS_PENALTY, ROAS_WEIGHT, SCORE_EPSILON, UPPER_BOUND,
};
use crate::types::{Constraints, Dimension, Metric, Ratio};

/// Anything the engine can redistribute spend across.
pub trait Allocatable {
    fn channel_label(&self) -> Option<&str> {
        None
    }
    fn retailer_id(&self) -> Option<&str> {
        None
    }
    fn retailer_name(&self) -> Option<&str> {
        None
    }
    fn roas(&self) -> Option<f64>;
    fn conversion_rate(&self) -> Option<f64>;
    fn current_spend(&self) -> f64;

    /// Channel label, else retailer id, else retailer name.
    fn allocation_key(&self) -> Option<String> {
        self.channel_label()
            .or_else(|| self.retailer_id())
            .or_else(|| self.retailer_name())
            .map(str::to_string)
    }
}

/// Retailer rows identify by retailer id; every other dimension's key is the channel label.
impl Allocatable for AggregatedRow {
    fn channel_label(&self) -> Option<&str> {
        match self.dimension {
            Dimension::RetailerId => None,
            _ => self.key.as_deref(),
        }
    }

    fn retailer_id(&self) -> Option<&str> {
        match self.dimension {
            Dimension::RetailerId => self.key.as_deref(),
            _ => None,
        }
    }

    fn roas(&self) -> Option<f64> {
        self.ratio(Ratio::Roas)
    }

    fn conversion_rate(&self) -> Option<f64> {
        self.ratio(Ratio::ConversionRate)
    }

    fn current_spend(&self) -> f64 {
        self.metric(Metric::AdSpend).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReallocationSuggestion {
    pub channel: Option<String>,
    pub current: f64,
    pub suggested: f64,
    pub reason: String,
}

/// Score-proportional budget redistribution, bounded to +/-50% of current spend per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReallocationEngine {
    constraints: Constraints,
}

impl ReallocationEngine {
    pub fn new(constraints: Constraints) -> Self {
        Self { constraints }
    }

    /// Weighted score, penalized below `min_roas`, floored at zero and padded by epsilon.
    pub fn score<R: Allocatable>(&self, row: &R) -> f64 {
        let roas = row.roas().unwrap_or(0.0);
        let conv = row.conversion_rate().unwrap_or(0.0);
        let mut score = roas * ROAS_WEIGHT + conv * CONVERSION_WEIGHT;
        if let Some(min_roas) = self.constraints.min_roas {
            if roas < min_roas {
                score *= MIN_ROAS_PENALTY;
            }
        }
        score.max(0.0) + SCORE_EPSILON
    }

    pub fn target_total(&self, current_total: f64) -> f64 {
        target_total(current_total, self.constraints.max_spend)
    }

    /// One suggestion per input row, in input order.
    pub fn suggest<R: Allocatable>(&self, rows: &[R]) -> Vec<ReallocationSuggestion> {
        let scores: Vec<f64> = rows.iter().map(|r| self.score(r)).collect();
        let total_score: f64 = scores.iter().sum();
        let current_total: f64 = rows.iter().map(Allocatable::current_spend).sum();
        let target = self.target_total(current_total);

        rows.iter()
            .zip(&scores)
            .map(|(row, score)| {
                let current = row.current_spend();
                let share = score / total_score * target;
                let suggested = if current > 0.0 {
                    share.clamp(current * LOWER_BOUND, current * UPPER_BOUND)
                } else {
                    share.max(0.0)
                };
                ReallocationSuggestion {
                    channel: row.allocation_key(),
                    current: round2(current),
                    suggested: round2(suggested),
                    reason: format!(
                        "Score-based (roas={}, conv_rate={})",
                        display_opt(row.roas()),
                        display_opt(row.conversion_rate())
                    ),
                }
            })
            .collect()
    }
}

/// Spend to distribute. A `max_spend` above current spend becomes a growth target;
/// a non-positive one is ignored.
pub fn target_total(current_total: f64, max_spend: Option<f64>) -> f64 {
    match max_spend.filter(|m| *m > 0.0) {
        None => current_total,
        Some(max) if max > current_total => max,
        Some(max) => current_total.min(max),
    }
}

/// Two decimals, exact halves to even (0.125 -> 0.12).
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

/// Whole numbers keep their `.0` (`4.0`, not `4`).
fn display_opt(v: Option<f64>) -> String {
    v.map(|v| format!("{v:?}")).unwrap_or_else(|| "null".to_string())
}

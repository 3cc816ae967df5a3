//! Churn risk levels, quantile risk categories and retention recommendations.

use crate::domain::model::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LOW_RISK_BELOW: f64 = 0.3;
pub const HIGH_RISK_FROM: f64 = 0.7;
pub const FEE_SENSITIVITY_THRESHOLD: f64 = 70.0;
pub const EARLY_TENURE_MONTHS: f64 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability < LOW_RISK_BELOW {
            RiskLevel::Low
        } else if probability < HIGH_RISK_FROM {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        })
    }
}

/// Position of a score within its batch, in fifths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskCategory {
    const ORDERED: [RiskCategory; 5] = [
        RiskCategory::VeryLow,
        RiskCategory::Low,
        RiskCategory::Medium,
        RiskCategory::High,
        RiskCategory::VeryHigh,
    ];
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskCategory::VeryLow => "Very Low",
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
            RiskCategory::VeryHigh => "Very High",
        })
    }
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Bin index (`0..n_bins`) of each value among equal-frequency bins of the
/// batch. Bin `i` covers `(edge[i], edge[i + 1]]`, with the first bin also
/// taking the minimum. When edges coincide the lowest matching bin wins.
pub(crate) fn quantile_bins(values: &[f64], n_bins: usize) -> Vec<usize> {
    if values.is_empty() || n_bins == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let edges: Vec<f64> = (1..n_bins)
        .map(|i| quantile(&sorted, i as f64 / n_bins as f64))
        .collect();

    values
        .iter()
        .map(|&v| edges.iter().position(|&edge| v <= edge).unwrap_or(n_bins - 1))
        .collect()
}

/// Bins each score into quintiles of the batch.
pub fn risk_categories(scores: &[f64]) -> Vec<RiskCategory> {
    quantile_bins(scores, RiskCategory::ORDERED.len())
        .into_iter()
        .map(|bin| RiskCategory::ORDERED[bin])
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    ReviewFeeStructure,
    EncourageOnlineServices,
    OfferLongerContract,
    PromoteSecurityPackage,
    EarlyTenureMonitoring,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::ReviewFeeStructure => {
                "Review fee structure - current charges above sensitivity threshold"
            }
            Recommendation::EncourageOnlineServices => "Encourage internet service adoption",
            Recommendation::OfferLongerContract => "Offer incentives for longer-term contract",
            Recommendation::PromoteSecurityPackage => "Promote security features package",
            Recommendation::EarlyTenureMonitoring => {
                "High-risk period: implement enhanced monitoring"
            }
        })
    }
}

/// Rule-based retention actions for one (preprocessed) customer record.
/// Missing fields never trigger a rule, except the security rule which fires
/// unless both services are explicitly `Yes`.
pub fn recommendations(customer: &Record) -> Vec<Recommendation> {
    let mut actions = Vec::new();

    if customer
        .get_f64("Monthly Charges")
        .is_some_and(|c| c > FEE_SENSITIVITY_THRESHOLD)
    {
        actions.push(Recommendation::ReviewFeeStructure);
    }
    if customer.get_str("Internet Service") == Some("No") {
        actions.push(Recommendation::EncourageOnlineServices);
    }
    if customer.get_str("Contract") == Some("Month-to-month") {
        actions.push(Recommendation::OfferLongerContract);
    }
    let secured = customer.get_str("Online Security") == Some("Yes")
        && customer.get_str("Device Protection") == Some("Yes");
    if !secured {
        actions.push(Recommendation::PromoteSecurityPackage);
    }
    if customer
        .get_f64("Tenure Months")
        .is_some_and(|t| t < EARLY_TENURE_MONTHS)
    {
        actions.push(Recommendation::EarlyTenureMonitoring);
    }

    actions
}

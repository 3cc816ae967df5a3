//! Executive summary KPIs over a preprocessed customer table.

use crate::core::risk::quantile_bins;
use crate::domain::model::{Record, Table, CHURN_LABEL, CHURN_REASON, CHURN_VALUE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TOP_REASONS: usize = 5;

/// Monthly-charge quartiles, cheapest first.
pub const VALUE_SEGMENTS: [&str; 4] = ["Bronze", "Silver", "Gold", "Platinum"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChurn {
    pub segment: String,
    pub customers: usize,
    pub churned: usize,
    pub churn_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub generated_at: DateTime<Utc>,
    pub total_customers: usize,
    pub churned_customers: usize,
    pub churn_rate_pct: f64,
    pub average_tenure_months: Option<f64>,
    pub average_tenure_years: Option<f64>,
    pub average_monthly_charges: Option<f64>,
    pub top_churn_reasons: Vec<ReasonCount>,
    pub churn_by_contract: Vec<SegmentChurn>,
    pub churn_by_value_segment: Vec<SegmentChurn>,
}

/// `Churn Value` decides when present, otherwise `Churn Label`.
pub fn is_churned(record: &Record) -> bool {
    match record.get_f64(CHURN_VALUE) {
        Some(v) => v == 1.0,
        None => record.get_str(CHURN_LABEL) == Some("Yes"),
    }
}

fn mean_of(table: &Table, column: &str) -> Option<f64> {
    let values: Vec<f64> = table.records.iter().filter_map(|r| r.get_f64(column)).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn segment_churn(segment: &str, customers: usize, churned: usize) -> SegmentChurn {
    SegmentChurn {
        segment: segment.to_string(),
        customers,
        churned,
        churn_rate_pct: pct(churned, customers),
    }
}

/// Churn per monthly-charge quartile. Customers without charges are left
/// out and empty segments are omitted.
fn churn_by_value_segment(table: &Table) -> Vec<SegmentChurn> {
    let (charges, churned): (Vec<f64>, Vec<bool>) = table
        .records
        .iter()
        .filter_map(|r| r.get_f64("Monthly Charges").map(|c| (c, is_churned(r))))
        .unzip();

    let mut counts = [(0usize, 0usize); VALUE_SEGMENTS.len()];
    for (bin, churned) in quantile_bins(&charges, VALUE_SEGMENTS.len()).into_iter().zip(churned) {
        counts[bin].0 += 1;
        if churned {
            counts[bin].1 += 1;
        }
    }

    VALUE_SEGMENTS
        .iter()
        .zip(counts)
        .filter(|(_, (customers, _))| *customers > 0)
        .map(|(segment, (customers, churned))| segment_churn(segment, customers, churned))
        .collect()
}

pub fn summarize(table: &Table) -> ExecutiveSummary {
    let total = table.len();
    let churned = table.records.iter().filter(|r| is_churned(r)).count();

    let average_tenure_months = mean_of(table, "Tenure Months");

    let mut reason_counts: HashMap<&str, usize> = HashMap::new();
    for record in table.records.iter().filter(|r| is_churned(r)) {
        if let Some(reason) = record.get_str(CHURN_REASON) {
            *reason_counts.entry(reason).or_default() += 1;
        }
    }
    let mut top_churn_reasons: Vec<ReasonCount> = reason_counts
        .into_iter()
        .map(|(reason, count)| ReasonCount {
            reason: reason.to_string(),
            count,
        })
        .collect();
    top_churn_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    top_churn_reasons.truncate(TOP_REASONS);

    let mut segments: HashMap<&str, (usize, usize)> = HashMap::new();
    for record in &table.records {
        if let Some(contract) = record.get_str("Contract") {
            let entry = segments.entry(contract).or_default();
            entry.0 += 1;
            if is_churned(record) {
                entry.1 += 1;
            }
        }
    }
    let mut churn_by_contract: Vec<SegmentChurn> = segments
        .into_iter()
        .map(|(segment, (customers, churned))| segment_churn(segment, customers, churned))
        .collect();
    churn_by_contract.sort_by(|a, b| a.segment.cmp(&b.segment));

    ExecutiveSummary {
        generated_at: Utc::now(),
        total_customers: total,
        churned_customers: churned,
        churn_rate_pct: pct(churned, total),
        average_tenure_months,
        average_tenure_years: average_tenure_months.map(|m| m / 12.0),
        average_monthly_charges: mean_of(table, "Monthly Charges"),
        top_churn_reasons,
        churn_by_contract,
        churn_by_value_segment: churn_by_value_segment(table),
    }
}

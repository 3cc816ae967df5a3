//! Cleaning of the raw customer table.

use crate::domain::model::{number_value, value_to_text, Table, CHURN_LABEL, CHURN_VALUE};
use serde_json::Value;

pub const NUMERICAL_COLUMNS: [&str; 3] = ["Tenure Months", "Monthly Charges", "Total Charges"];

pub const CATEGORICAL_COLUMNS: [&str; 10] = [
    "Contract",
    "Internet Service",
    "Online Security",
    "Online Backup",
    "Device Protection",
    "Tech Support",
    "Streaming TV",
    "Streaming Movies",
    "Payment Method",
    "Paperless Billing",
];

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Parses a numeric cell, stripping currency symbols and thousands separators.
/// Anything that does not parse to a finite number is treated as missing.
pub fn parse_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.replace('$', "").replace(',', "");
            cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Text for a categorical cell, with missing or blank cells mapped to `Unknown`.
pub fn categorical_text(value: Option<&Value>) -> String {
    value
        .and_then(value_to_text)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// Returns a cleaned copy of `table`:
/// numeric columns become numbers (or null), categorical columns become
/// strings with `Unknown` for gaps, and `Churn Label` is derived from
/// `Churn Value` when only the latter is present.
pub fn preprocess_data(table: &Table) -> Table {
    let mut df = table.clone();

    for column in NUMERICAL_COLUMNS {
        if !df.has_column(column) {
            continue;
        }
        for record in &mut df.records {
            let cleaned = record
                .data
                .get(column)
                .and_then(parse_numeric)
                .map(number_value)
                .unwrap_or(Value::Null);
            record.set(column, cleaned);
        }
    }

    for column in CATEGORICAL_COLUMNS {
        if !df.has_column(column) {
            continue;
        }
        for record in &mut df.records {
            let text = categorical_text(record.data.get(column));
            record.set(column, Value::String(text));
        }
    }

    if !df.has_column(CHURN_LABEL) && df.has_column(CHURN_VALUE) {
        tracing::debug!("Deriving '{}' from '{}'", CHURN_LABEL, CHURN_VALUE);
        for record in &mut df.records {
            let label = match record.get_f64(CHURN_VALUE) {
                Some(v) if v == 1.0 => Value::String("Yes".to_string()),
                Some(v) if v == 0.0 => Value::String("No".to_string()),
                _ => Value::Null,
            };
            record.set(CHURN_LABEL, label);
        }
        df.push_column(CHURN_LABEL);
    }

    df
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let csv = "Tenure Months,Monthly Charges,Contract,Churn Value\n\
                   12,$50.00,Month-to-month,1\n\
                   24,\"$1,075.50\",,0\n\
                   36,n/a,Two year,\n";
        Table::from_csv_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn strips_currency_and_separators() {
        let df = preprocess_data(&sample_table());
        assert_eq!(df.records[0].get_f64("Monthly Charges"), Some(50.0));
        assert_eq!(df.records[1].get_f64("Monthly Charges"), Some(1075.5));
        assert!(df.records[2].get("Monthly Charges").is_none());
        assert_eq!(df.records[2].get_f64("Tenure Months"), Some(36.0));
    }

    #[test]
    fn fills_missing_categories_with_unknown() {
        let df = preprocess_data(&sample_table());
        assert_eq!(df.records[0].get_str("Contract"), Some("Month-to-month"));
        assert_eq!(df.records[1].get_str("Contract"), Some(UNKNOWN_CATEGORY));
    }

    #[test]
    fn derives_churn_label_from_value() {
        let df = preprocess_data(&sample_table());
        assert!(df.has_column(CHURN_LABEL));
        assert_eq!(df.columns.last().map(String::as_str), Some(CHURN_LABEL));
        assert_eq!(df.records[0].get_str(CHURN_LABEL), Some("Yes"));
        assert_eq!(df.records[1].get_str(CHURN_LABEL), Some("No"));
        assert!(df.records[2].get(CHURN_LABEL).is_none());
    }

    #[test]
    fn leaves_input_untouched_and_skips_absent_columns() {
        let table = sample_table();
        let before = table.clone();
        let df = preprocess_data(&table);

        assert_eq!(table, before);
        assert!(!df.has_column("Total Charges"));
        assert!(df.records[0].get("Total Charges").is_none());
    }
}

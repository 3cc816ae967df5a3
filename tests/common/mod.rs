#![allow(dead_code)]

use churn_pipeline::config::toml_config::TomlConfig;
use churn_pipeline::core::Storage;
use churn_pipeline::utils::error::{ChurnError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const HEADER: [&str; 15] = [
    "CustomerID",
    "Gender",
    "Tenure Months",
    "Monthly Charges",
    "Total Charges",
    "Contract",
    "Internet Service",
    "Online Security",
    "Online Backup",
    "Device Protection",
    "Tech Support",
    "Payment Method",
    "Paperless Billing",
    "Churn Value",
    "Churn Reason",
];

const PAYMENT_METHODS: [&str; 4] = [
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

const CHURN_REASONS: [&str; 3] = [
    "Competitor offered more data",
    "Attitude of support person",
    "Price too high",
];

/// `1234.5` -> `"1,234.50"`
fn money(value: f64) -> String {
    let text = format!("{:.2}", value);
    let (int_part, frac) = text.split_at(text.len() - 3);
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}", grouped, frac)
}

/// Deterministic Telco-style customers. Month-to-month customers in their
/// first two years churn; nobody else does.
pub fn telco_rows(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| {
            let tenure = (i * 7) % 72;
            let contract = match i % 4 {
                0 | 1 => "Month-to-month",
                2 => "One year",
                _ => "Two year",
            };
            let internet = ["DSL", "Fiber optic", "No"][i % 3];
            let addon = |on: bool| {
                if internet == "No" {
                    "No internet service"
                } else if on {
                    "Yes"
                } else {
                    "No"
                }
            };
            let monthly = if internet == "No" {
                20.0 + (i % 5) as f64
            } else {
                20.35 + ((i * 13) % 90) as f64
            };
            // new customers have no total yet, as in the real export
            let total = if tenure == 0 {
                String::new()
            } else {
                money(monthly * tenure as f64)
            };
            let churned = contract == "Month-to-month" && tenure < 24;

            vec![
                format!("{:04}-CUST", i),
                if i % 2 == 0 { "Female" } else { "Male" }.to_string(),
                tenure.to_string(),
                format!("${:.2}", monthly),
                total,
                contract.to_string(),
                internet.to_string(),
                addon(i % 5 < 2).to_string(),
                addon(i % 3 == 0).to_string(),
                addon(i % 7 < 3).to_string(),
                addon(i % 2 == 0).to_string(),
                PAYMENT_METHODS[(i / 2) % 4].to_string(),
                if i % 2 == 0 { "Yes" } else { "No" }.to_string(),
                if churned { "1" } else { "0" }.to_string(),
                if churned {
                    CHURN_REASONS[i % 3].to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect()
}

fn write_csv(header: &[&str], rows: &[Vec<String>]) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.into_inner().unwrap()
}

pub fn telco_csv(n: usize) -> Vec<u8> {
    write_csv(&HEADER, &telco_rows(n))
}

/// Customers to score: same columns without the churn outcome.
pub fn batch_csv(n: usize) -> Vec<u8> {
    let keep = HEADER.len() - 2;
    let rows: Vec<Vec<String>> = telco_rows(n)
        .into_iter()
        .map(|mut row| {
            row.truncate(keep);
            row
        })
        .collect();
    write_csv(&HEADER[..keep], &rows)
}

/// Small, fast model settings with storage-relative paths.
pub fn test_config(input: &str) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.data.input_path = input.to_string();
    config.output.processed_dir = "processed".to_string();
    config.output.models_dir = "models".to_string();
    config.output.reports_dir = "reports".to_string();
    config.model.n_estimators = Some(20);
    config.split.cv_folds = 3;
    config
}

#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str, data: Vec<u8>) {
        self.files.lock().await.insert(path.to_string(), data);
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            ChurnError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

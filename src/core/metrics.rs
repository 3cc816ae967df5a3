//! Classification metrics and k-fold cross-validation.

use crate::core::scaler::StandardScaler;
use crate::core::split::k_fold_indices;
use crate::domain::model::Dataset;
use crate::models::{ChurnModel, Classifier, ModelKind, ModelParams, DECISION_THRESHOLD};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CrossValidation {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            scores,
            mean,
            std: var.sqrt(),
        }
    }
}

struct Confusion {
    tp: f64,
    fp: f64,
    tn: f64,
    fn_: f64,
}

fn confusion(labels: &[f64], predictions: &[f64]) -> Confusion {
    let mut c = Confusion {
        tp: 0.0,
        fp: 0.0,
        tn: 0.0,
        fn_: 0.0,
    };
    for (&y, &p) in labels.iter().zip(predictions) {
        match (y > 0.5, p > 0.5) {
            (true, true) => c.tp += 1.0,
            (false, true) => c.fp += 1.0,
            (false, false) => c.tn += 1.0,
            (true, false) => c.fn_ += 1.0,
        }
    }
    c
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

pub fn accuracy(labels: &[f64], predictions: &[f64]) -> f64 {
    let c = confusion(labels, predictions);
    ratio(c.tp + c.tn, c.tp + c.tn + c.fp + c.fn_)
}

pub fn precision(labels: &[f64], predictions: &[f64]) -> f64 {
    let c = confusion(labels, predictions);
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(labels: &[f64], predictions: &[f64]) -> f64 {
    let c = confusion(labels, predictions);
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1(labels: &[f64], predictions: &[f64]) -> f64 {
    let p = precision(labels, predictions);
    let r = recall(labels, predictions);
    ratio(2.0 * p * r, p + r)
}

/// Area under the ROC curve via the Mann-Whitney rank statistic, with tied
/// scores sharing their average rank. 0.5 when only one class is present.
pub fn roc_auc(labels: &[f64], scores: &[f64]) -> f64 {
    let n_pos = labels.iter().filter(|&&y| y > 0.5).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y > 0.5)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;

    (pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

pub fn evaluate<M: Classifier + ?Sized>(model: &M, dataset: &Dataset) -> Result<ClassificationMetrics> {
    let probabilities = model.predict_proba(&dataset.features)?;
    let predictions: Vec<f64> = probabilities
        .iter()
        .map(|&p| if p > DECISION_THRESHOLD { 1.0 } else { 0.0 })
        .collect();
    let labels = &dataset.labels;

    Ok(ClassificationMetrics {
        accuracy: accuracy(labels, &predictions),
        precision: precision(labels, &predictions),
        recall: recall(labels, &predictions),
        f1: f1(labels, &predictions),
        roc_auc: roc_auc(labels, &probabilities),
    })
}

/// Accuracy of a fresh model on each of `k` folds. The scaler is refitted on
/// every training fold so no statistics leak from the held-out fold.
pub fn cross_val_score(
    kind: ModelKind,
    params: &ModelParams,
    dataset: &Dataset,
    k: usize,
    seed: u64,
) -> Result<CrossValidation> {
    let folds = k_fold_indices(dataset.n_samples(), k, seed)?;
    let mut scores = Vec::with_capacity(k);

    for (fold_idx, held_out) in folds.iter().enumerate() {
        let train_idx: Vec<usize> = folds
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != fold_idx)
            .flat_map(|(_, f)| f.iter().copied())
            .collect();

        let mut train = dataset.subset(&train_idx);
        let mut test = dataset.subset(held_out);

        let mut scaler = StandardScaler::new();
        train.features = scaler.fit_transform(&train.features)?;
        test.features = scaler.transform(&test.features)?;

        let mut model = ChurnModel::new(kind, params);
        model.fit(&train)?;
        let score = model.score(&test)?;
        tracing::debug!("CV fold {}/{}: accuracy {:.4}", fold_idx + 1, k, score);
        scores.push(score);
    }

    Ok(CrossValidation::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confusion_based_metrics() {
        let labels = [1.0, 1.0, 0.0, 0.0, 1.0];
        let predictions = [1.0, 0.0, 1.0, 0.0, 1.0];

        assert!((accuracy(&labels, &predictions) - 0.6).abs() < 1e-12);
        assert!((precision(&labels, &predictions) - 2.0 / 3.0).abs() < 1e-12);
        assert!((recall(&labels, &predictions) - 2.0 / 3.0).abs() < 1e-12);
        assert!((f1(&labels, &predictions) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_ratios_are_zero() {
        let labels = [0.0, 0.0];
        let predictions = [0.0, 0.0];
        assert_eq!(precision(&labels, &predictions), 0.0);
        assert_eq!(recall(&labels, &predictions), 0.0);
        assert_eq!(f1(&labels, &predictions), 0.0);
    }

    #[test]
    fn auc_handles_perfect_inverse_and_ties() {
        let labels = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]), 1.0);
        assert_eq!(roc_auc(&labels, &[0.9, 0.8, 0.2, 0.1]), 0.0);
        assert_eq!(roc_auc(&labels, &[0.5, 0.5, 0.5, 0.5]), 0.5);
        // sklearn: roc_auc_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8]) == 0.75
        assert!((roc_auc(&labels, &[0.1, 0.4, 0.35, 0.8]) - 0.75).abs() < 1e-12);
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.2, 0.3]), 0.5);
    }

    #[test]
    fn cross_validation_summarizes_folds() {
        let mut dataset = Dataset::new(vec!["x".to_string()]);
        for i in 0..100 {
            dataset.add_sample(vec![i as f64], if i >= 50 { 1.0 } else { 0.0 });
        }

        let params = ModelParams {
            n_estimators: 5,
            ..Default::default()
        };
        let cv = cross_val_score(ModelKind::RandomForest, &params, &dataset, 5, 42).unwrap();

        assert_eq!(cv.scores.len(), 5);
        assert!(cv.mean > 0.9);
        assert!(cv.std >= 0.0);
    }

    #[test]
    fn cv_statistics_use_population_std() {
        let cv = CrossValidation::from_scores(vec![0.8, 1.0]);
        assert!((cv.mean - 0.9).abs() < 1e-12);
        assert!((cv.std - 0.1).abs() < 1e-12);
    }
}

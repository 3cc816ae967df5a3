use crate::domain::model::Dataset;
use crate::utils::error::{ChurnError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Shuffled hold-out split. The test set takes `ceil(test_size * n)` rows.
pub fn train_test_split(dataset: &Dataset, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ChurnError::InvalidConfigValueError {
            field: "split.test_size".to_string(),
            value: test_size.to_string(),
            reason: "Must be strictly between 0 and 1".to_string(),
        });
    }

    let n = dataset.n_samples();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ChurnError::ProcessingError {
            message: format!(
                "Cannot split {} sample(s) with test_size {}: one side would be empty",
                n, test_size
            ),
        });
    }

    let indices = shuffled_indices(n, seed);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(Split {
        train: dataset.subset(train_idx),
        test: dataset.subset(test_idx),
    })
}

/// Partitions `0..n` into `k` shuffled folds whose sizes differ by at most one.
pub fn k_fold_indices(n: usize, k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k < 2 || k > n {
        return Err(ChurnError::InvalidConfigValueError {
            field: "split.cv_folds".to_string(),
            value: k.to_string(),
            reason: format!("Need 2 <= folds <= samples ({})", n),
        });
    }

    let indices = shuffled_indices(n, seed);
    let base = n / k;
    let extra = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        folds.push(indices[start..start + size].to_vec());
        start += size;
    }

    Ok(folds)
}

fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    indices
}

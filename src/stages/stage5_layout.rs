use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerance for comparing shares
const EPSILON: f64 = 1e-9;

/// Configuration for Stage 5 layout balancing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Smallest share any step may end up with
    pub min_share: f64,
    /// Share moved from the widest step per transfer
    pub transfer_step: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_share: 0.1,
            transfer_step: 0.05,
        }
    }
}

/// Perform Stage 5: turn step lengths into display proportions
///
/// Shares start proportional to `lengths`. Each share below `min_share`
/// is topped up in `transfer_step` increments taken from the currently
/// widest share, which is never drawn below `min_share` itself. Shares
/// always sum to 1. When there are more steps than `1 / min_share`
/// allows, the floor cannot hold for all of them and the transfers stop
/// once no donor has room left.
pub fn balance_proportions(lengths: &[f64], config: &LayoutConfig) -> Vec<f64> {
    if lengths.is_empty() {
        return Vec::new();
    }

    let sanitized: Vec<f64> = lengths
        .iter()
        .map(|&l| if l.is_finite() && l > 0.0 { l } else { 0.0 })
        .collect();
    let total: f64 = sanitized.iter().sum();

    let mut shares: Vec<f64> = if total > 0.0 {
        sanitized.iter().map(|l| l / total).collect()
    } else {
        vec![1.0 / lengths.len() as f64; lengths.len()]
    };

    if shares.len() == 1 {
        return shares;
    }

    let mut transfers = 0usize;
    for i in 0..shares.len() {
        while shares[i] < config.min_share - EPSILON {
            let Some(donor) = widest_share(&shares, i) else {
                break;
            };
            let room = shares[donor] - config.min_share;
            if room <= EPSILON {
                break;
            }
            let needed = config.min_share - shares[i];
            let amount = config.transfer_step.min(room).min(needed.max(EPSILON));
            if amount <= 0.0 || amount.is_nan() {
                break;
            }
            shares[i] += amount;
            shares[donor] -= amount;
            transfers += 1;
        }
    }

    if transfers > 0 {
        debug!("Layout rebalanced with {} transfers: {:?}", transfers, shares);
    }

    shares
}

/// Index of the largest share other than `skip`
fn widest_share(shares: &[f64], skip: usize) -> Option<usize> {
    shares
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

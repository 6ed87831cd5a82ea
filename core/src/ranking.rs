//! Dense, tie-sharing ranks and percentiles.
//!
//! Ranks are positions in the list of distinct scores sorted high to low,
//! so issuers with numerically identical scores always share both rank and
//! percentile, and the ranks used are exactly 1..=m for m distinct scores.

use crate::types::IssuerId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedScore {
    pub issuer_id:  IssuerId,
    pub score:      f64,
    /// 1-based dense rank; 1 = highest score.
    pub rank:       u32,
    /// 1.0 for the highest distinct score, 0.0 for the lowest.
    pub percentile: f64,
}

/// Numeric equality, with NaN equal to itself so it forms one tie group.
fn same_score(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Score descending, then issuer id ascending.
fn report_order(a: &(IssuerId, f64), b: &(IssuerId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Rank every issuer. Output is ordered by score descending, then issuer id
/// ascending; that order does not influence rank or percentile.
pub fn assign_ranks(scores: &[(IssuerId, f64)]) -> Vec<RankedScore> {
    let mut ordered = scores.to_vec();
    ordered.sort_by(report_order);

    let mut distinct: Vec<f64> = ordered.iter().map(|&(_, s)| s).collect();
    distinct.dedup_by(|a, b| same_score(*a, *b));
    let m = distinct.len();

    let mut ranked = Vec::with_capacity(ordered.len());
    let mut position = 0usize;
    for (issuer_id, score) in ordered {
        // `ordered` is sorted the same way as `distinct`, so the position
        // only ever moves forward.
        while !same_score(distinct[position], score) {
            position += 1;
        }
        let percentile = if m > 1 {
            1.0 - position as f64 / (m - 1) as f64
        } else {
            1.0
        };
        ranked.push(RankedScore {
            issuer_id,
            score,
            rank: position as u32 + 1,
            percentile,
        });
    }
    ranked
}

use super::rules::round2;
use super::{Classification, DimensionResult};

/// Share of dimensions a label needs to win the global vote.
const MAJORITY_RATIO: f64 = 0.5;
/// Global score ceiling, reached when every dimension is at risk.
const GLOBAL_SCORE_SCALE: f64 = 4.0;

/// Majority vote over dimension classifications plus the weighted global score.
pub(crate) fn global_result(dimensions: &[DimensionResult]) -> (Classification, f64) {
    if dimensions.is_empty() {
        return (Classification::Intermediate, 0.0);
    }

    let total = dimensions.len() as f64;
    let count = |wanted: Classification| {
        dimensions
            .iter()
            .filter(|dimension| dimension.classification == wanted)
            .count() as f64
    };
    let risk = count(Classification::Risk);
    let favorable = count(Classification::Favorable);
    let intermediate = total - risk - favorable;

    let classification = if risk / total >= MAJORITY_RATIO {
        Classification::Risk
    } else if favorable / total >= MAJORITY_RATIO {
        Classification::Favorable
    } else {
        Classification::Intermediate
    };

    let score = round2((risk + 0.5 * intermediate) / total * GLOBAL_SCORE_SCALE);
    (classification, score)
}

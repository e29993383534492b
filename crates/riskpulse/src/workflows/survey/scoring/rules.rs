use super::super::domain::DimensionSign;
use super::tables::{TERCILE_LOWER, TERCILE_UPPER};
use super::Classification;

/// Flips a reverse-scored item: `ceiling - v` on the 4-point scale, `ceiling + 1 - v` on 5 points.
pub fn invert_value(value: i32, scale_ceiling: i32) -> i32 {
    if scale_ceiling <= 4 {
        scale_ceiling - value
    } else {
        scale_ceiling + 1 - value
    }
}

/// 5 when any observed value exceeds 4, otherwise 4.
pub fn detect_scale_ceiling(values: impl IntoIterator<Item = i32>) -> i32 {
    match values.into_iter().max() {
        Some(max) if max > 4 => 5,
        _ => 4,
    }
}

/// Tercile classification of a dimension mean.
pub fn classify_tercile(mean: f64, sign: DimensionSign) -> Classification {
    match sign {
        DimensionSign::Protection => {
            if mean >= TERCILE_UPPER {
                Classification::Favorable
            } else if mean > TERCILE_LOWER {
                Classification::Intermediate
            } else {
                Classification::Risk
            }
        }
        DimensionSign::Risk => {
            if mean <= TERCILE_LOWER {
                Classification::Favorable
            } else if mean < TERCILE_UPPER {
                Classification::Intermediate
            } else {
                Classification::Risk
            }
        }
    }
}

pub fn mean(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: i64 = values.iter().map(|value| i64::from(*value)).sum();
    total as f64 / values.len() as f64
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

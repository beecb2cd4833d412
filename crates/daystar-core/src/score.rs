// Star scoring formulas for the exact and range measurement models.
//
// All arithmetic is carried out on integer numerator/denominator pairs so the
// directed rounding in each branch lands exactly on the boundary values
// (`actual == target`, `actual == upper_limit`) instead of one ulp away.

use crate::error::ScoreError;

/// Highest score a single action can earn in a day.
pub const MAX_SCORE: u8 = 20;

/// Score awarded for hitting the target exactly.
pub const TARGET_SCORE: u8 = 10;

const TARGET: i128 = TARGET_SCORE as i128;

// ---------------------------------------------------------------------------
// Exact model
// ---------------------------------------------------------------------------

/// Score a count-type action against an exact target.
///
/// A target of 0 is a binary "must not do" action: 10 stars for zero, nothing
/// otherwise. For positive targets the score falls off linearly with the
/// distance from the target in either direction:
/// `ceil((1 - |actual - target| / target) * 10)`, never below 0.
pub fn score_exact(actual: i64, target: i64) -> Result<u8, ScoreError> {
    if actual < 0 || target < 0 {
        return Err(ScoreError::invalid_input(format!(
            "actual and target must be non-negative integers (actual={actual}, target={target})"
        )));
    }

    if target == 0 {
        return Ok(if actual == 0 { TARGET_SCORE } else { 0 });
    }

    let target = i128::from(target);
    let distance = (i128::from(actual) - target).abs();
    let raw = ceil_div(TARGET * (target - distance), target);
    Ok(clamp_score(raw))
}

// ---------------------------------------------------------------------------
// Range model
// ---------------------------------------------------------------------------

/// Score a range-type action.
///
/// Without an `upper_limit` the target is a "max allowed" value: staying
/// under it earns bonus stars up to 20 at zero, going over it loses stars
/// until 0 at twice the target.
///
/// With an `upper_limit` the target is a minimum: falling short scales the
/// score down from 10, exceeding it earns bonus stars up to 20 at the upper
/// limit, and anything past the limit scores 0 with no partial credit.
pub fn score_range(actual: i64, target: i64, upper_limit: Option<i64>) -> Result<u8, ScoreError> {
    if target <= 0 || actual < 0 {
        return Err(ScoreError::invalid_input(format!(
            "actual must be >= 0 and target must be > 0 (actual={actual}, target={target})"
        )));
    }
    if let Some(limit) = upper_limit {
        if limit < target {
            return Err(ScoreError::invalid_input(format!(
                "upper_limit must be >= target (upper_limit={limit}, target={target})"
            )));
        }
    }

    let actual = i128::from(actual);
    let target = i128::from(target);

    let raw = match upper_limit {
        None => max_allowed(actual, target),
        Some(limit) => bonus_region(actual, target, i128::from(limit)),
    };
    Ok(clamp_score(raw))
}

/// Lower is better: +10/target per unit under the target (rounded up),
/// -10/target per unit over it (rounded down).
fn max_allowed(actual: i128, target: i128) -> i128 {
    if actual <= target {
        ceil_div(TARGET * target + TARGET * (target - actual), target)
    } else {
        floor_div(TARGET * target - TARGET * (actual - target), target)
    }
}

/// Proportional credit below the target (rounded down), linear bonus between
/// target and limit (rounded up), hard zero past the limit.
fn bonus_region(actual: i128, target: i128, limit: i128) -> i128 {
    if actual < target {
        return floor_div(TARGET * actual, target);
    }
    if actual > limit {
        return 0;
    }

    let span = limit - target;
    if span == 0 {
        // target == limit: the only value left is the limit itself.
        return i128::from(MAX_SCORE);
    }
    ceil_div(TARGET * span + TARGET * (actual - target), span)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `ceil(numerator / denominator)` for a positive denominator.
fn ceil_div(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator.div_euclid(denominator);
    if numerator.rem_euclid(denominator) == 0 {
        quotient
    } else {
        quotient + 1
    }
}

/// `floor(numerator / denominator)` for a positive denominator.
fn floor_div(numerator: i128, denominator: i128) -> i128 {
    numerator.div_euclid(denominator)
}

fn clamp_score(raw: i128) -> u8 {
    // Clamped into 0..=20 first, so the narrowing cast cannot truncate.
    raw.clamp(0, i128::from(MAX_SCORE)) as u8
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

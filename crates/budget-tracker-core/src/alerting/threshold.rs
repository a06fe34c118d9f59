//! Budget utilisation and threshold rules

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{AlertType, Budget};

/// `round_half_up(spending * 100 / amount)` as a whole percentage.
///
/// A zero (or negative) amount yields 0. Negative spending clamps to 0 and a
/// result too large for `u32` saturates.
pub fn percentage_used(spending: Decimal, amount: Decimal) -> u32 {
    if amount <= Decimal::ZERO {
        return 0;
    }

    let Some(ratio) = spending
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(amount))
    else {
        return u32::MAX;
    };

    let rounded = ratio.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() {
        return 0;
    }
    rounded.to_u32().unwrap_or(u32::MAX)
}

/// Alert types a budget qualifies for at `percentage_used`.
///
/// Each toggle is checked on its own, in a fixed order. The two ranges do not
/// overlap, so at most one type is returned.
pub fn candidate_alerts(budget: &Budget, percentage_used: u32) -> Vec<AlertType> {
    let mut candidates = Vec::with_capacity(1);

    if budget.alert_threshold_80 && (80..100).contains(&percentage_used) {
        candidates.push(AlertType::Threshold80);
    }

    if budget.alert_threshold_100 && percentage_used >= 100 {
        candidates.push(if percentage_used > 100 {
            AlertType::Exceeded
        } else {
            AlertType::Threshold100
        });
    }

    candidates
}

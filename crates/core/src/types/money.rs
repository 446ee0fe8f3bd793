//! Profit and return-on-investment math for orders.
//!
//! All money amounts use [`Decimal`] so that derived figures are exact and
//! stable under re-serialization. Derived figures are always recomputed from
//! the money inputs; callers never supply them directly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived money figures for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    /// Sell price minus buy price minus refund amount. Negative values are
    /// valid and represent a loss.
    pub net_profit: Decimal,
    /// Return on investment as a percentage, rounded to two decimal places.
    /// Zero when the buy price is not positive.
    pub roi: Decimal,
}

/// Compute net profit and ROI from an order's money inputs.
///
/// `net_profit = sell - buy - refund`, with no floor at zero.
/// `roi = (net_profit / buy) * 100` rounded to two decimal places when
/// `buy > 0`, otherwise zero (ROI against a free or unknown cost basis is
/// meaningless).
///
/// # Example
///
/// ```
/// use rust_decimal::Decimal;
/// use order_portal_core::profit_and_roi;
///
/// let breakdown = profit_and_roi(
///     Decimal::new(800, 2),  // 8.00
///     Decimal::new(1200, 2), // 12.00
///     Decimal::ZERO,
/// );
/// assert_eq!(breakdown.net_profit, Decimal::new(400, 2));
/// assert_eq!(breakdown.roi, Decimal::new(5000, 2)); // 50.00%
/// ```
#[must_use]
pub fn profit_and_roi(buy: Decimal, sell: Decimal, refund: Decimal) -> ProfitBreakdown {
    let net_profit = sell - buy - refund;
    let roi = if buy > Decimal::ZERO {
        (net_profit / buy * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };

    ProfitBreakdown { net_profit, roi }
}

//! Crossing detection
//!
//! Determines when an aggressor can trade against a resting order.

use types::numeric::Price;
use types::order::Side;

/// Check if an aggressor crosses a resting order.
///
/// A buy crosses when its price is at or above the resting ask; a sell
/// crosses when its price is at or below the resting bid.
pub fn crosses(aggressor_side: Side, aggressor_price: Price, resting_price: Price) -> bool {
    match aggressor_side {
        Side::Buy => aggressor_price >= resting_price,
        Side::Sell => aggressor_price <= resting_price,
    }
}

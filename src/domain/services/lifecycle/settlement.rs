//----------------------------------------------------------------------
// MODULE OVERVIEW
//----------------------------------------------------------------------
// Pure fee arithmetic for completed deliveries. The platform keeps a
// configured percentage of the delivery fee; the rider receives the
// remainder. All amounts are `Decimal` so the split is exact apart from
// the rounding applied to the admin cut.
//----------------------------------------------------------------------

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The two sides of a settled delivery fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Platform cut, rounded to the nearest whole unit.
    pub admin_fee: Decimal,
    /// What the rider's wallet is credited with.
    pub rider_fee: Decimal,
}

/// Splits a delivery fee between the platform and the rider.
///
/// The admin fee is `admin_charge_pct` percent of the fee, rounded to the
/// nearest whole unit; the rider fee is the exact remainder, so the two
/// parts always sum back to the original fee.
///
/// # Arguments
///
/// * `delivery_fee` - The full fee paid by the customer.
/// * `admin_charge_pct` - Platform percentage, e.g. `dec!(10)` for 10%.
pub fn split_delivery_fee(delivery_fee: Decimal, admin_charge_pct: Decimal) -> Settlement {
    let admin_fee = (delivery_fee * admin_charge_pct / dec!(100)).round();
    Settlement {
        admin_fee,
        rider_fee: delivery_fee - admin_fee,
    }
}

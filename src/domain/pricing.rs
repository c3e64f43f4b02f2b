//! Discount math and order totals

use serde::Serialize;

use crate::domain::voucher::{Voucher, VoucherType};

/// Flat base shipping fee, in currency units, before any shipping voucher.
pub const BASE_SHIPPING_FEE: i64 = 30_000;

/// What a voucher does to an order: the discount taken off the total and the
/// possibly reduced shipping fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscountOutcome {
    pub discount: i64,
    pub shipping_fee: i64,
}

/// Rounded integer percentage (half-up). Money never goes through floats.
fn percent_of(amount: i64, percent: i64) -> i64 {
    (amount * percent + 50) / 100
}

/// Computes the discount for an already-validated voucher.
pub fn compute_discount(voucher: &Voucher, subtotal: i64, shipping_fee: i64) -> DiscountOutcome {
    match voucher.voucher_type {
        VoucherType::Percent => DiscountOutcome {
            discount: percent_of(subtotal, voucher.value).min(voucher.max_discount),
            shipping_fee,
        },
        VoucherType::Fixed => DiscountOutcome {
            discount: voucher.value.min(voucher.max_discount),
            shipping_fee,
        },
        VoucherType::Shipping => {
            let reduced = (shipping_fee - voucher.value).max(0);
            DiscountOutcome {
                // Only what was actually removed counts as discount.
                discount: shipping_fee - reduced,
                shipping_fee: reduced,
            }
        }
    }
}

/// The pricing fragment embedded in an order record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub applied_voucher_code: Option<String>,
    pub total: i64,
}

/// Assembles the final breakdown. The total is floored at zero.
pub fn price(
    subtotal: i64,
    shipping_fee: i64,
    discount: i64,
    applied_voucher_code: Option<String>,
) -> PricingBreakdown {
    PricingBreakdown {
        subtotal,
        shipping_fee,
        discount,
        applied_voucher_code,
        total: (subtotal + shipping_fee - discount).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn voucher(voucher_type: VoucherType, value: i64, max_discount: i64) -> Voucher {
        Voucher {
            id: "V".into(),
            code: "V".into(),
            voucher_type,
            value,
            min_order_value: 0,
            max_discount,
            description: String::new(),
            expiry: Utc::now().date_naive(),
            is_active: true,
            usage_limit: 1,
            usage_count: 0,
            user_id: None,
        }
    }

    #[test]
    fn test_percent_discount_is_capped() {
        // SUMMER30: 30% capped at 300,000 against a 2,000,000 order.
        let v = voucher(VoucherType::Percent, 30, 300_000);
        let out = compute_discount(&v, 2_000_000, BASE_SHIPPING_FEE);
        assert_eq!(out.discount, 300_000);
        assert_eq!(out.shipping_fee, BASE_SHIPPING_FEE);
        let b = price(2_000_000, out.shipping_fee, out.discount, Some("V".into()));
        assert_eq!(b.total, 2_000_000 + 30_000 - 300_000);
    }

    #[test]
    fn test_percent_discount_rounds_to_whole_currency() {
        let v = voucher(VoucherType::Percent, 15, i64::MAX);
        // 15% of 333 is 49.95, rounds to 50.
        assert_eq!(compute_discount(&v, 333, 0).discount, 50);
    }

    #[test]
    fn test_fixed_discount_defensively_capped() {
        let v = voucher(VoucherType::Fixed, 50_000, 40_000);
        assert_eq!(compute_discount(&v, 300_000, 0).discount, 40_000);
    }

    #[test]
    fn test_shipping_discount_never_goes_negative() {
        let v = voucher(VoucherType::Shipping, 30_000, 30_000);
        let out = compute_discount(&v, 600_000, 20_000);
        assert_eq!(out.shipping_fee, 0);
        assert_eq!(out.discount, 20_000); // not the full 30,000
    }

    #[test]
    fn test_total_is_floored_at_zero() {
        let b = price(10_000, 0, 50_000, None);
        assert_eq!(b.total, 0);
    }

    #[test]
    fn test_total_invariant() {
        for (subtotal, shipping, discount) in
            [(0, 0, 0), (1, 30_000, 15_000), (2_000_000, 30_000, 300_000)]
        {
            let b = price(subtotal, shipping, discount, None);
            assert_eq!(b.total, (subtotal + shipping - discount).max(0));
            assert!(discount <= subtotal + shipping);
        }
    }
}

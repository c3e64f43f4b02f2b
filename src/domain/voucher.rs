//! Voucher model and redemption checks

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::VoucherError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherType {
    /// Percentage points off the subtotal, capped by `max_discount`.
    Percent,
    /// Flat currency amount off the order.
    Fixed,
    /// Currency amount off the shipping fee, never below zero.
    Shipping,
}

/// A redeemable discount code.
///
/// The serialized field names are the persisted record shape and double as
/// the wire format when exposed over HTTP, so they must stay stable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub voucher_type: VoucherType,
    pub value: i64,
    pub min_order_value: i64,
    pub max_discount: i64,
    pub description: String,
    /// Inclusive through the end of this calendar day.
    pub expiry: NaiveDate,
    pub is_active: bool,
    pub usage_limit: u32,
    pub usage_count: u32,
    /// Present on reward vouchers. Not checked at redemption time; a leaked
    /// reward code is usable by anyone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Voucher {
    /// Checks whether the voucher can be applied to an order with the given
    /// subtotal. Checks run in a fixed order and the first failure wins, so
    /// the caller always gets the most specific reason.
    pub fn validate(&self, now: DateTime<Utc>, subtotal: i64) -> Result<(), VoucherError> {
        if !self.is_active {
            return Err(VoucherError::Disabled);
        }
        if now.date_naive() > self.expiry {
            return Err(VoucherError::Expired(self.expiry));
        }
        if self.usage_count >= self.usage_limit {
            return Err(VoucherError::UsageLimitReached);
        }
        if subtotal < self.min_order_value {
            return Err(VoucherError::BelowMinimum {
                shortfall: self.min_order_value - subtotal,
            });
        }
        Ok(())
    }

    pub fn remaining_uses(&self) -> u32 {
        self.usage_limit.saturating_sub(self.usage_count)
    }
}

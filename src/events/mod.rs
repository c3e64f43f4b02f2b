//! Domain events published to the messaging side-channel
//!
//! Delivery is fire-and-forget: consumers learn about redemptions and
//! rewards, but the checkout and review flows never wait on them.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderCreated {
        order_id: String,
        user_id: String,
        total: i64,
    },
    VoucherRedeemed {
        code: String,
        order_id: String,
        discount: i64,
    },
    RewardIssued {
        user_id: String,
        code: String,
    },
}

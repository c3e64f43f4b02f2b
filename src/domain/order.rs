//! Order records handed to the order store

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing::PricingBreakdown;
use crate::{Result, StorefrontError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub recipient: String,
    pub phone: String,
    pub address: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    /// Bank transfer; the QR code shown at checkout is display-only.
    Transfer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub applied_voucher_code: Option<String>,
    pub total: i64,
    pub shipping_details: ShippingDetails,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn create(
        user_id: impl Into<String>,
        items: Vec<OrderItem>,
        breakdown: PricingBreakdown,
        shipping_details: ShippingDetails,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            items,
            subtotal: breakdown.subtotal,
            shipping_fee: breakdown.shipping_fee,
            discount: breakdown.discount,
            applied_voucher_code: breakdown.applied_voucher_code,
            total: breakdown.total,
            shipping_details,
            payment_method,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subtotal_of(items: &[OrderItem]) -> i64 {
        items.iter().map(OrderItem::line_total).sum()
    }

    pub fn confirm(&mut self) -> Result<()> {
        self.transition(OrderStatus::Pending, OrderStatus::Confirmed)
    }

    pub fn ship(&mut self) -> Result<()> {
        self.transition(OrderStatus::Confirmed, OrderStatus::Shipping)
    }

    pub fn deliver(&mut self) -> Result<()> {
        self.transition(OrderStatus::Shipping, OrderStatus::Delivered)
    }

    /// Cancellation is allowed from any state except delivered.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status == OrderStatus::Delivered {
            return Err(StorefrontError::InvalidStatusTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
        Ok(())
    }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus) -> Result<()> {
        if self.status != from {
            return Err(StorefrontError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

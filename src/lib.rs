//! Storefront Pricing Core
//!
//! Voucher redemption and order-total computation for a small storefront.
//!
//! ## Features
//! - Voucher catalog with a seeded starter set
//! - Voucher validation (active flag, expiry, usage caps, order minimums)
//! - Discount calculation per voucher type (percent, fixed, shipping)
//! - Order pricing and checkout orchestration
//! - Single-use reward vouchers issued for a user's first product review
//!
//! Persistence goes through a pluggable [`store::BlobStore`]; in-memory and
//! JSON-file backends ship with the crate, and the messaging side-channel is
//! an injectable [`notify::Notifier`].

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::order::OrderStatus;

pub mod domain;
pub mod events;
pub mod notify;
pub mod services;
pub mod store;

/// Reasons a voucher cannot be applied to an order.
///
/// The set is closed so callers can render a distinct hint per variant;
/// never branch on the rendered message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoucherError {
    #[error("Voucher not found")]
    NotFound,

    #[error("Voucher is disabled")]
    Disabled,

    #[error("Voucher expired on {0}")]
    Expired(NaiveDate),

    #[error("Voucher usage limit reached")]
    UsageLimitReached,

    #[error("Order is {shortfall} below the voucher minimum")]
    BelowMinimum { shortfall: i64 },
}

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error(transparent)]
    Voucher(#[from] VoucherError),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The underlying store failed to persist a mutation. Distinct from
    /// validation failures: the operation may have partially applied.
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

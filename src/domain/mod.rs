//! Domain model: vouchers, pricing, orders, reviews

pub mod order;
pub mod pricing;
pub mod review;
pub mod voucher;

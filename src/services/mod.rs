//! Application services over the domain model

pub mod checkout;
pub mod rewards;
pub mod vouchers;

//! Checkout orchestration
//!
//! Validation, discount math, order persistence, then usage bookkeeping, in
//! that order. The voucher is burned only after the order write succeeds, so
//! an abandoned checkout never consumes a single-use code. There is no
//! rollback across the order and voucher writes; a failed increment after a
//! persisted order surfaces as a storage error and leaves the order in
//! place.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentMethod, ShippingDetails};
use crate::domain::pricing::{compute_discount, price, PricingBreakdown, BASE_SHIPPING_FEE};
use crate::events::DomainEvent;
use crate::notify::Notifier;
use crate::services::vouchers::VoucherCatalog;
use crate::store::{keys, BlobStore, Collection};
use crate::{Result, StorefrontError};

pub struct CheckoutRequest {
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub voucher_code: Option<String>,
    pub shipping_details: ShippingDetails,
    pub payment_method: PaymentMethod,
}

pub struct CheckoutService {
    catalog: Arc<VoucherCatalog>,
    orders: Collection<Order>,
    notifier: Arc<dyn Notifier>,
    write_lock: Mutex<()>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<VoucherCatalog>,
        store: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            orders: Collection::new(store, keys::ORDERS),
            notifier,
            write_lock: Mutex::new(()),
        }
    }

    /// The "apply voucher" step in the cart: validates the code and prices
    /// the order without mutating any state.
    pub fn preview(&self, code: &str, subtotal: i64, shipping_fee: i64) -> Result<PricingBreakdown> {
        let voucher = self.catalog.find_by_code(code)?;
        voucher.validate(Utc::now(), subtotal)?;
        let outcome = compute_discount(&voucher, subtotal, shipping_fee);
        Ok(price(
            subtotal,
            outcome.shipping_fee,
            outcome.discount,
            Some(voucher.code),
        ))
    }

    pub async fn place_order(&self, request: CheckoutRequest) -> Result<Order> {
        let now = Utc::now();
        let subtotal = Order::subtotal_of(&request.items);
        let mut shipping_fee = BASE_SHIPPING_FEE;
        let mut discount = 0;
        let mut applied = None;

        if let Some(code) = request.voucher_code.as_deref() {
            let voucher = self.catalog.find_by_code(code)?;
            voucher.validate(now, subtotal)?;
            let outcome = compute_discount(&voucher, subtotal, shipping_fee);
            shipping_fee = outcome.shipping_fee;
            discount = outcome.discount;
            applied = Some(voucher.code);
        }

        let breakdown = price(subtotal, shipping_fee, discount, applied);
        let order = Order::create(
            request.user_id,
            request.items,
            breakdown,
            request.shipping_details,
            request.payment_method,
            now,
        );
        self.append(&order)?;

        if let Some(code) = order.applied_voucher_code.clone() {
            self.catalog.increment_usage(&code)?;
            tracing::info!(code = %code, order_id = %order.id, discount = order.discount, "Voucher redeemed");
            self.emit(DomainEvent::VoucherRedeemed {
                code,
                order_id: order.id.clone(),
                discount: order.discount,
            })
            .await;
        }
        tracing::info!(order_id = %order.id, total = order.total, "Order created");
        self.emit(DomainEvent::OrderCreated {
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            total: order.total,
        })
        .await;
        Ok(order)
    }

    pub fn get_order(&self, id: &str) -> Result<Order> {
        self.orders
            .get_all()?
            .into_iter()
            .find(|o| o.id == id)
            .ok_or(StorefrontError::OrderNotFound)
    }

    pub fn list_orders(&self) -> Result<Vec<Order>> {
        self.orders.get_all()
    }

    /// Back-office status changes; transition rules live on the order.
    pub fn set_status(&self, id: &str, status: OrderStatus) -> Result<Order> {
        let _guard = self.lock();
        let mut all = self.orders.get_all()?;
        let order = all
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StorefrontError::OrderNotFound)?;
        match status {
            OrderStatus::Confirmed => order.confirm()?,
            OrderStatus::Shipping => order.ship()?,
            OrderStatus::Delivered => order.deliver()?,
            OrderStatus::Cancelled => order.cancel()?,
            OrderStatus::Pending => {
                return Err(StorefrontError::InvalidStatusTransition {
                    from: order.status,
                    to: OrderStatus::Pending,
                })
            }
        }
        let updated = order.clone();
        self.orders.set_all(&all)?;
        Ok(updated)
    }

    fn append(&self, order: &Order) -> Result<()> {
        let _guard = self.lock();
        let mut all = self.orders.get_all()?;
        all.push(order.clone());
        self.orders.set_all(&all)
    }

    async fn emit(&self, event: DomainEvent) {
        if let Err(e) = self.notifier.publish(&event).await {
            tracing::warn!(error = %e, "Event publication failed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::store::MemoryStore;
    use crate::VoucherError;

    fn service() -> CheckoutService {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let catalog = Arc::new(VoucherCatalog::new(store.clone()).unwrap());
        CheckoutService::new(catalog, store, Arc::new(LogNotifier))
    }

    fn items(unit_price: i64, quantity: u32) -> Vec<OrderItem> {
        vec![OrderItem {
            product_id: "P1".into(),
            name: "Linen shirt".into(),
            unit_price,
            quantity,
        }]
    }

    fn request(items: Vec<OrderItem>, voucher_code: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            user_id: "user-1".into(),
            items,
            voucher_code: voucher_code.map(String::from),
            shipping_details: ShippingDetails::default(),
            payment_method: PaymentMethod::Cod,
        }
    }

    #[tokio::test]
    async fn test_checkout_without_voucher() {
        let s = service();
        let order = s.place_order(request(items(150_000, 2), None)).await.unwrap();
        assert_eq!(order.subtotal, 300_000);
        assert_eq!(order.shipping_fee, BASE_SHIPPING_FEE);
        assert_eq!(order.discount, 0);
        assert_eq!(order.total, 330_000);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(s.get_order(&order.id).unwrap(), order);
    }

    #[tokio::test]
    async fn test_checkout_with_percent_voucher_burns_one_use() {
        let s = service();
        let order = s
            .place_order(request(items(250_000, 2), Some("WELCOME10")))
            .await
            .unwrap();
        // 10% of 500,000 = 50,000, under the 100,000 cap.
        assert_eq!(order.discount, 50_000);
        assert_eq!(order.total, 500_000 + 30_000 - 50_000);
        assert_eq!(order.applied_voucher_code.as_deref(), Some("WELCOME10"));
        assert_eq!(
            s.catalog.find_by_code("WELCOME10").unwrap().usage_count,
            1
        );
    }

    #[tokio::test]
    async fn test_below_minimum_is_rejected_with_shortfall() {
        let s = service();
        let err = s
            .place_order(request(items(150_000, 1), Some("WELCOME10")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorefrontError::Voucher(VoucherError::BelowMinimum { shortfall: 50_000 })
        ));
        assert!(s.list_orders().unwrap().is_empty());
        assert_eq!(s.catalog.find_by_code("WELCOME10").unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn test_preview_does_not_burn_usage() {
        let s = service();
        let b = s.preview("FREESHIP", 600_000, BASE_SHIPPING_FEE).unwrap();
        assert_eq!(b.shipping_fee, 0);
        assert_eq!(b.discount, 30_000);
        assert_eq!(b.total, 600_000);
        // An abandoned checkout leaves the voucher untouched.
        assert_eq!(s.catalog.find_by_code("FREESHIP").unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn test_exhausted_voucher_is_rejected_at_checkout() {
        let s = service();
        let mut v = s.catalog.find_by_code("FIXED50K").unwrap();
        v.usage_limit = 1;
        v.usage_count = 1;
        s.catalog.save(&v).unwrap();
        let err = s
            .place_order(request(items(400_000, 1), Some("FIXED50K")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorefrontError::Voucher(VoucherError::UsageLimitReached)
        ));
    }

    #[tokio::test]
    async fn test_status_transitions_persist() {
        let s = service();
        let order = s.place_order(request(items(100_000, 1), None)).await.unwrap();
        s.set_status(&order.id, OrderStatus::Confirmed).unwrap();
        let updated = s.set_status(&order.id, OrderStatus::Shipping).unwrap();
        assert_eq!(updated.status, OrderStatus::Shipping);
        assert!(s.set_status(&order.id, OrderStatus::Pending).is_err());
        assert_eq!(s.get_order(&order.id).unwrap().status, OrderStatus::Shipping);
    }
}

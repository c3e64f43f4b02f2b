//! Voucher catalog
//!
//! All voucher mutation goes through this service; nothing else writes the
//! vouchers collection. A single lock serializes every read-modify-write so
//! two concurrent redemptions of the same code cannot both pass the usage
//! cap.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Months, Utc};

use crate::domain::voucher::{Voucher, VoucherType};
use crate::store::{keys, BlobStore, Collection};
use crate::{Result, VoucherError};

pub struct VoucherCatalog {
    vouchers: Collection<Voucher>,
    write_lock: Mutex<()>,
}

impl VoucherCatalog {
    /// Opens the catalog, seeding the starter voucher set when the
    /// collection does not exist yet.
    pub fn new(store: Arc<dyn BlobStore>) -> Result<Self> {
        let catalog = Self {
            vouchers: Collection::new(store, keys::VOUCHERS),
            write_lock: Mutex::new(()),
        };
        catalog.seed_if_empty()?;
        Ok(catalog)
    }

    fn seed_if_empty(&self) -> Result<()> {
        let _guard = self.lock();
        if self.vouchers.get_all()?.is_empty() {
            self.vouchers.set_all(&starter_vouchers())?;
            tracing::info!("Seeded starter voucher catalog");
        }
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Voucher>> {
        self.vouchers.get_all()
    }

    /// Exact, case-sensitive lookup.
    pub fn find_by_code(&self, code: &str) -> Result<Voucher> {
        self.vouchers
            .get_all()?
            .into_iter()
            .find(|v| v.code == code)
            .ok_or_else(|| VoucherError::NotFound.into())
    }

    /// Upsert by code.
    pub fn save(&self, voucher: &Voucher) -> Result<()> {
        let _guard = self.lock();
        let mut all = self.vouchers.get_all()?;
        match all.iter_mut().find(|v| v.code == voucher.code) {
            Some(existing) => *existing = voucher.clone(),
            None => all.push(voucher.clone()),
        }
        self.vouchers.set_all(&all)
    }

    /// Conditional increment: the usage cap is re-checked under the lock, so
    /// the count can never exceed the limit however many callers race.
    pub fn increment_usage(&self, code: &str) -> Result<()> {
        let _guard = self.lock();
        let mut all = self.vouchers.get_all()?;
        let voucher = all
            .iter_mut()
            .find(|v| v.code == code)
            .ok_or(VoucherError::NotFound)?;
        if voucher.usage_count >= voucher.usage_limit {
            return Err(VoucherError::UsageLimitReached.into());
        }
        voucher.usage_count += 1;
        self.vouchers.set_all(&all)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The fixed starter set. FREESHIP requires a 500,000 minimum; the legacy
/// 300,000 seed variant was dropped when the tables were unified.
fn starter_vouchers() -> Vec<Voucher> {
    let expiry = Utc::now().date_naive() + Months::new(12);
    let starter = |code: &str, voucher_type, value, min_order_value, max_discount, usage_limit, description: &str| Voucher {
        id: code.into(),
        code: code.into(),
        voucher_type,
        value,
        min_order_value,
        max_discount,
        description: description.into(),
        expiry,
        is_active: true,
        usage_limit,
        usage_count: 0,
        user_id: None,
    };
    vec![
        starter(
            "WELCOME10",
            VoucherType::Percent,
            10,
            200_000,
            100_000,
            100,
            "10% off orders from 200,000",
        ),
        starter(
            "FREESHIP",
            VoucherType::Shipping,
            30_000,
            500_000,
            30_000,
            200,
            "Free shipping on orders from 500,000",
        ),
        starter(
            "SUMMER30",
            VoucherType::Percent,
            30,
            1_000_000,
            300_000,
            50,
            "30% off orders from 1,000,000",
        ),
        starter(
            "FIXED50K",
            VoucherType::Fixed,
            50_000,
            300_000,
            50_000,
            100,
            "50,000 off orders from 300,000",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::StorefrontError;

    fn catalog() -> VoucherCatalog {
        VoucherCatalog::new(Arc::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_seeds_starter_set_once() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let first = VoucherCatalog::new(store.clone()).unwrap();
        assert_eq!(first.list().unwrap().len(), 4);
        first.increment_usage("WELCOME10").unwrap();
        // Reopening must not reset the collection.
        let second = VoucherCatalog::new(store).unwrap();
        assert_eq!(second.find_by_code("WELCOME10").unwrap().usage_count, 1);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let c = catalog();
        assert!(c.find_by_code("FREESHIP").is_ok());
        assert!(matches!(
            c.find_by_code("freeship"),
            Err(StorefrontError::Voucher(VoucherError::NotFound))
        ));
    }

    #[test]
    fn test_save_round_trips_field_for_field() {
        let c = catalog();
        let mut v = c.find_by_code("FIXED50K").unwrap();
        v.description = "updated".into();
        v.user_id = Some("user-9".into());
        c.save(&v).unwrap();
        assert_eq!(c.find_by_code("FIXED50K").unwrap(), v);
        assert_eq!(c.list().unwrap().len(), 4); // upsert, not append
    }

    #[test]
    fn test_increment_stops_at_the_limit() {
        let c = catalog();
        let mut v = c.find_by_code("WELCOME10").unwrap();
        v.usage_limit = 1;
        c.save(&v).unwrap();
        c.increment_usage("WELCOME10").unwrap();
        assert!(matches!(
            c.increment_usage("WELCOME10"),
            Err(StorefrontError::Voucher(VoucherError::UsageLimitReached))
        ));
        assert_eq!(c.find_by_code("WELCOME10").unwrap().usage_count, 1);
    }
}

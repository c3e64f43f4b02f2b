//! Review rewards
//!
//! A user's first product review earns a single-use 10% voucher scoped to
//! that user. The qualification check is "no prior review by this user", so
//! the issuer is naturally idempotent once the review is on record; the
//! check and the review write are not atomic, which is an accepted gap for
//! a single-user store.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};

use crate::domain::review::Review;
use crate::domain::voucher::{Voucher, VoucherType};
use crate::events::DomainEvent;
use crate::notify::Notifier;
use crate::services::vouchers::VoucherCatalog;
use crate::store::{keys, BlobStore, Collection};
use crate::Result;

const REWARD_PERCENT: i64 = 10;
const REWARD_MIN_ORDER: i64 = 200_000;
const REWARD_MAX_DISCOUNT: i64 = 100_000;
const REWARD_VALID_MONTHS: u32 = 3;

pub struct RewardService {
    catalog: Arc<VoucherCatalog>,
    reviews: Collection<Review>,
    notifier: Arc<dyn Notifier>,
}

impl RewardService {
    pub fn new(
        catalog: Arc<VoucherCatalog>,
        store: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            reviews: Collection::new(store, keys::REVIEWS),
            notifier,
        }
    }

    pub fn has_any_review(&self, user_id: &str) -> Result<bool> {
        Ok(self
            .reviews
            .get_all()?
            .iter()
            .any(|r| r.user_id == user_id))
    }

    /// Issues the first-review reward, or `None` when the user has reviewed
    /// before.
    pub fn issue_if_first_review(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Voucher>> {
        if self.has_any_review(user_id)? {
            return Ok(None);
        }
        let voucher = reward_voucher(user_id, now);
        self.catalog.save(&voucher)?;
        tracing::info!(user_id, code = %voucher.code, "Issued first-review reward voucher");
        Ok(Some(voucher))
    }

    /// Records the review and hands out the reward when it is the user's
    /// first. Notification failures are logged and never fail submission.
    pub async fn submit_review(&self, review: Review) -> Result<Option<Voucher>> {
        let issued = self.issue_if_first_review(&review.user_id, Utc::now())?;

        let mut all = self.reviews.get_all()?;
        all.push(review.clone());
        self.reviews.set_all(&all)?;

        if let Some(voucher) = &issued {
            let text = format!(
                "Thanks for your first review! Use code {} for {}% off your next order.",
                voucher.code, voucher.value
            );
            if let Err(e) = self.notifier.notify(&review.user_id, &text, Some(voucher)).await {
                tracing::warn!(error = %e, user_id = %review.user_id, "Reward notification failed");
            }
            if let Err(e) = self
                .notifier
                .publish(&DomainEvent::RewardIssued {
                    user_id: review.user_id.clone(),
                    code: voucher.code.clone(),
                })
                .await
            {
                tracing::warn!(error = %e, "Event publication failed");
            }
        }
        Ok(issued)
    }

    pub fn reviews_for_product(&self, product_id: &str) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .get_all()?
            .into_iter()
            .filter(|r| r.product_id == product_id)
            .collect())
    }
}

fn reward_voucher(user_id: &str, now: DateTime<Utc>) -> Voucher {
    let code = reward_code(user_id, now);
    Voucher {
        id: code.clone(),
        code,
        voucher_type: VoucherType::Percent,
        value: REWARD_PERCENT,
        min_order_value: REWARD_MIN_ORDER,
        max_discount: REWARD_MAX_DISCOUNT,
        description: format!("{REWARD_PERCENT}% thank-you voucher for your first review"),
        expiry: now.date_naive() + Months::new(REWARD_VALID_MONTHS),
        is_active: true,
        usage_limit: 1,
        usage_count: 0,
        user_id: Some(user_id.to_string()),
    }
}

fn reward_code(user_id: &str, now: DateTime<Utc>) -> String {
    let prefix: String = user_id.chars().take(4).collect();
    format!("REVIEW10_{}_{}", prefix, now.timestamp_millis() % 1_000_000)
}

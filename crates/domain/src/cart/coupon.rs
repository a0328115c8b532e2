//! Coupon evaluator.

use cart_store::CouponRecord;
use chrono::{DateTime, Utc};
use common::CouponId;
use serde::{Deserialize, Serialize};

use super::{CartError, Money};
use crate::error::DomainError;

/// How a coupon's discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is a whole percentage between 0 and 100.
    Percentage,
    /// `discount_value` is an amount in minor units.
    FixedAmount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::FixedAmount => "fixed_amount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(DiscountType::Percentage),
            "fixed_amount" => Some(DiscountType::FixedAmount),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a coupon as seen when it was applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order_amount: Money,
    /// Zero means unlimited.
    pub max_uses: i64,
    pub current_uses: i64,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Coupon {
    /// A coupon expiring exactly at `now` is already expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns true if the coupon has a usage cap and has reached it.
    pub fn is_exhausted(&self) -> bool {
        self.max_uses > 0 && self.current_uses >= self.max_uses
    }

    /// Checks whether this coupon may be applied to a cart with the given subtotal.
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// active flag, expiry, usage limit, minimum order amount.
    pub fn ensure_applicable(&self, subtotal: Money, now: DateTime<Utc>) -> Result<(), CartError> {
        if !self.is_active {
            return Err(CartError::business_rule("Coupon is not active"));
        }

        if self.is_expired(now) {
            return Err(CartError::business_rule("Coupon has expired"));
        }

        if self.is_exhausted() {
            return Err(CartError::business_rule("Coupon usage limit has been reached"));
        }

        if self.min_order_amount.is_positive() && subtotal < self.min_order_amount {
            return Err(CartError::business_rule(format!(
                "Minimum order amount of {} not met. Current subtotal: {}",
                self.min_order_amount.cents(),
                subtotal.cents()
            )));
        }

        Ok(())
    }

    /// Computes the discount this coupon grants on `subtotal`.
    ///
    /// The result never exceeds the subtotal. Returns None on arithmetic overflow.
    pub fn discount_for(&self, subtotal: Money) -> Option<Money> {
        let discount = match self.discount_type {
            DiscountType::Percentage => subtotal.checked_percentage(self.discount_value)?,
            DiscountType::FixedAmount => Money::from_cents(self.discount_value),
        };
        Some(discount.min(subtotal))
    }

    /// Converts the snapshot back into its persistence record.
    pub fn to_record(&self) -> CouponRecord {
        CouponRecord {
            id: self.id.clone(),
            code: self.code.clone(),
            discount_type: self.discount_type.as_str().to_string(),
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount.cents(),
            max_uses: self.max_uses,
            current_uses: self.current_uses,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

impl TryFrom<CouponRecord> for Coupon {
    type Error = DomainError;

    fn try_from(record: CouponRecord) -> Result<Self, Self::Error> {
        let corrupt = |what: String| {
            DomainError::CorruptRecord(format!("coupon {}: {}", record.id, what))
        };

        let discount_type = DiscountType::parse(&record.discount_type)
            .ok_or_else(|| corrupt(format!("unknown discount type '{}'", record.discount_type)))?;

        let value_in_range = match discount_type {
            DiscountType::Percentage => (0..=100).contains(&record.discount_value),
            DiscountType::FixedAmount => record.discount_value >= 0,
        };
        if !value_in_range {
            return Err(corrupt(format!(
                "discount value {} out of range for {}",
                record.discount_value, discount_type
            )));
        }

        if record.min_order_amount < 0 || record.max_uses < 0 || record.current_uses < 0 {
            return Err(corrupt("negative amount or usage count".to_string()));
        }

        Ok(Coupon {
            id: record.id,
            code: record.code,
            discount_type,
            discount_value: record.discount_value,
            min_order_amount: Money::from_cents(record.min_order_amount),
            max_uses: record.max_uses,
            current_uses: record.current_uses,
            expires_at: record.expires_at,
            is_active: record.is_active,
        })
    }
}

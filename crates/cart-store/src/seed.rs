//! Coupons the service ships with.

use chrono::{DateTime, TimeZone, Utc};

use crate::CouponRecord;

fn seed_expiry() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Returns the default coupon catalogue.
///
/// Kept in sync with the seed rows in `migrations/002_seed_coupons.sql`.
pub fn default_coupons() -> Vec<CouponRecord> {
    let expires_at = seed_expiry();
    vec![
        CouponRecord {
            id: "cpn_001".into(),
            code: "SAVE10".to_string(),
            discount_type: "percentage".to_string(),
            discount_value: 10,
            min_order_amount: 5000,
            max_uses: 100,
            current_uses: 0,
            expires_at,
            is_active: true,
        },
        CouponRecord {
            id: "cpn_002".into(),
            code: "WELCOME20".to_string(),
            discount_type: "fixed_amount".to_string(),
            discount_value: 2000,
            min_order_amount: 0,
            max_uses: 1000,
            current_uses: 0,
            expires_at,
            is_active: true,
        },
        CouponRecord {
            id: "cpn_003".into(),
            code: "SUMMER15".to_string(),
            discount_type: "percentage".to_string(),
            discount_value: 15,
            min_order_amount: 10000,
            max_uses: 50,
            current_uses: 0,
            expires_at,
            is_active: true,
        },
    ]
}

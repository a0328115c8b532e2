pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod seed;
pub mod store;

pub use common::{CartId, CartItemId, CouponId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::CartQuery;
pub use record::{CartItemRecord, CartRecord, CouponRecord};
pub use seed::default_coupons;
pub use store::{CartStore, CouponStore};

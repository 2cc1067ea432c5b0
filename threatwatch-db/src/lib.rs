mod bundled;
mod error;
mod schema;
mod store;

pub use bundled::{bundled_entries, seed_bundled_cves};
pub use error::DbError;
pub use store::{current_period, FindingFilter, FindingReview, ScanFilter, Store, TargetUpdate};

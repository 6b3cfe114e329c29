//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (standalone operations) or `&mut PgConnection`
//! (operations that join the caller's transaction).

pub mod broadcast_repo;
pub mod job_repo;
pub mod ledger_repo;
pub mod price_repo;
pub mod user_repo;

pub use broadcast_repo::BroadcastRepo;
pub use job_repo::JobRepo;
pub use ledger_repo::LedgerRepo;
pub use price_repo::PriceRepo;
pub use user_repo::UserRepo;

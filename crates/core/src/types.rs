/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Credit amounts in the smallest currency unit. Signed so that ledger
/// deltas and balances share one representation.
pub type Credits = i64;

//! Unified error codes for the table session engine
//!
//! - [`ErrorCode`]: Standardized numeric codes shared with callers
//! - [`ErrorCategory`]: Classification of codes by range
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 7xxx: Table errors
//! - 9xxx: System errors (94xx: storage)

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};

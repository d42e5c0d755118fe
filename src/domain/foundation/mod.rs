//! Foundation value objects shared by all domain modules.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{GroupId, UserId};
pub use timestamp::Timestamp;

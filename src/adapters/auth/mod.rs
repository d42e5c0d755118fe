//! Auth adapters.

mod jwt;

pub use jwt::JwtAuthProvider;

pub mod endpoints;
pub mod error;
pub mod identity;
pub mod router;
pub mod types;

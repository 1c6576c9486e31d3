pub mod analytics;
pub mod attachments;
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
pub mod query;
pub mod repo;
pub mod timestamps;
pub mod validate;

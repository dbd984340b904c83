pub mod cache;
pub mod outbound;
pub mod repositories;

//! Application services: membership ledger, capacity enforcement and the landing aggregator.

pub mod capacity;
pub mod content;
pub mod error;
pub mod landing;
pub mod membership;
pub mod messages;
pub mod plans;
pub mod repos;
pub mod users;

//! Koktail: activity memberships with capacity limits, a landing board and its cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

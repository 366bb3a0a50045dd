//! product_search_agent: a product recommendation agent over a Vertex AI
//! Search (Discovery Engine) data store.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod agent;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod product_agent;
pub mod search;
pub mod session;
pub mod tools;

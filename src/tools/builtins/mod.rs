//! Built-in tool implementations.
//!
//! Each sub-module implements one tool the agent can invoke and exposes
//! a `register` function that adds it to a [`ToolRegistry`](super::ToolRegistry).

pub mod product_search;

//! The interception decision engine (C1): a three-tier precedence resolver
//! that precomputes, per method, whether and how to log, cached for
//! hot-path O(1) lookup.
pub mod cache;
pub mod service;

pub use cache::DecisionCache;

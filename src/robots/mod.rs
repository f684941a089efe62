//! Robots.txt handling module
//!
//! This module provides fetching, parsing and per-origin caching of robots.txt
//! allow/disallow rules.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, RobotsSource};
pub use parser::RobotsPolicy;

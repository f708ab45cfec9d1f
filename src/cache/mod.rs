//! The temperature-based tiering eviction engine.
//!
//! This module contains the core cache data structures and algorithms:
//! - [`hitset`]: bloom-backed per-epoch membership set
//! - [`histogram`]: power-of-two quantile histogram over temperatures
//! - [`epochs`]: epoch rotation and decayed temperature estimation
//! - [`index`]: recency-ordered object index with stable handles
//! - [`agent`]: bounded round-robin eviction agent
//! - [`tiering`]: the public cache façade

pub mod agent;
pub mod epochs;
pub mod histogram;
pub mod hitset;
pub mod index;
pub mod tiering;

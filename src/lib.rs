//! Keeps a local cache of Asana project tasks fresh.
//!
//! A [`daemon::Daemon`] periodically lists the tasks of a fixed set of
//! projects and writes each result as a snapshot through
//! [`cache::CacheStore`]. Other tools read those snapshots without touching
//! the network.

pub mod asana;
pub mod cache;
pub mod config;
pub mod daemon;
pub mod error;
pub mod logging;

//! Gource Logs - Per-repository activity logs and their combination.
//!
//! This library turns the history of many local repositories into gource
//! custom logs, prefixes each record with its repository, and merges them
//! into one deduplicated, sorted log for visualization. The HTTP server in
//! [`server`] exposes these operations alongside rendering and avatar
//! downloads.

pub mod avatars;
pub mod config;
pub mod logs;
pub mod persistence;
pub mod process;
pub mod render;
pub mod repos;
pub mod search;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_utils;

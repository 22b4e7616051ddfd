// src/lib.rs

//! Delisting announcement watcher library

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_support;

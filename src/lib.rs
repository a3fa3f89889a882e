// src/lib.rs

//! Crawl gateway library.
//!
//! A synchronous dispatch front-end over asynchronous crawl, search and
//! extraction operations.

pub mod bridge;
pub mod config;
pub mod error;
pub mod gateway;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

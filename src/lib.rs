// src/lib.rs

//! Lotto Crawler Library
//!
//! Harvests lottery draw results from the PCSO search page into SQLite and
//! serves filtered listings and number frequencies over HTTP.

pub mod error;
pub mod models;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

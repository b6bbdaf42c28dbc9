// src/lib.rs

//! Court status ingestion library.
//!
//! Collects the pending statuses ("estados pendientes") that municipal civil
//! courts publish as HTML pages, PDF documents or scanned images, and turns
//! them into one normalized, ordered record set for querying and export.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

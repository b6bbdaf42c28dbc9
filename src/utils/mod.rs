//! Utility functions and helpers.

pub mod calendar;
pub mod http;
pub mod text;
pub mod url;

pub use calendar::subtract_business_days;

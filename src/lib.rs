//! Time-series extraction from uploaded tables.
//!
//! Load a CSV or XLSX file, find its time and measurement columns, optionally
//! restrict or highlight a time-of-day window, and produce clean plot data.

pub mod config;
pub mod data;

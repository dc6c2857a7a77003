//! Data layer: loading, column classification, time windows and plot assembly.
//!
//! Architecture:
//! ```text
//!  .csv / .tsv / .xlsx
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  decode + sniff / first sheet → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ classify  │  Temporal / Numeric / Unclassified → ClassifiedTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  window   │  time-of-day filter mask, highlight intervals
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ assemble  │  drop invalid rows → PlotRequest
//!   └──────────┘
//! ```
//!
//! `pipeline` runs the last three steps for one interaction.

pub mod assemble;
pub mod classify;
pub mod error;
pub mod loader;
pub mod model;
pub mod numeric;
pub mod pipeline;
pub mod timestamp;
pub mod window;
pub mod xlsx;

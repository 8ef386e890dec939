//! Vendor-facing half of the bar sync engine.
//!
//! - [`models`]: bars, keys, periods, instruments and request parameters.
//! - [`providers`]: capability traits for the market-data terminal and the
//!   HTTP gateway client implementing them.
//! - [`io`]: Parquet encoding of bar series.

pub mod io;
pub mod models;
pub mod providers;

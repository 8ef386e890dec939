use std::path::PathBuf;

use polars::prelude::PolarsError;
use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Writing the Parquet file failed.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: PolarsError,
        backtrace: Backtrace,
    },

    /// Reading or decoding the Parquet file failed.
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: PolarsError,
        backtrace: Backtrace,
    },

    /// Building or inspecting a DataFrame failed.
    #[snafu(display("DataFrame error: {source}"))]
    Frame {
        source: PolarsError,
        backtrace: Backtrace,
    },

    /// Bars could not be mapped onto columns, or back.
    #[snafu(display("Data conversion error: {message}"))]
    Conversion {
        message: String,
        backtrace: Backtrace,
    },

    /// A filesystem operation failed.
    #[snafu(display("I/O error on {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

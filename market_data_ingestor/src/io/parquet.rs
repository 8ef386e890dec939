//! Parquet files holding one bar series each.

use std::{
    fs::{self, File},
    io::ErrorKind,
    path::Path,
};

use polars::prelude::*;
use snafu::ResultExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    io::{
        frame::{bars_to_frame, frame_to_bars},
        sink::{IoSnafu, ReadSnafu, SinkError, WriteSnafu},
    },
    models::bar::Bar,
};

/// Replace `path` with a file holding exactly `bars`.
///
/// The frame is written to a temp file in the same directory, fsynced and
/// renamed over the target, so readers see either the old or the new file.
pub fn write_bars_atomic(path: &Path, bars: &[Bar]) -> Result<(), SinkError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).context(IoSnafu { path: dir })?;

    let mut df = bars_to_frame(bars)?;
    let mut tmp = NamedTempFile::new_in(dir).context(IoSnafu { path: dir })?;
    ParquetWriter::new(tmp.as_file_mut())
        .finish(&mut df)
        .context(WriteSnafu { path })?;
    tmp.as_file().sync_all().context(IoSnafu { path: tmp.path() })?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .context(IoSnafu { path })?;

    debug!(path = %path.display(), rows = bars.len(), "series file written");
    Ok(())
}

/// Load a series file; `Ok(None)` when it does not exist yet.
pub fn read_bars(path: &Path) -> Result<Option<Vec<Bar>>, SinkError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(IoSnafu { path }),
    };
    let df = ParquetReader::new(file).finish().context(ReadSnafu { path })?;
    frame_to_bars(&df).map(Some)
}

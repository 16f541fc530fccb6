//! Logging setup (§4.11): `env_logger` to stdout/stderr, optionally mirrored
//! to a size-rotated file via `file-rotate`.

use env_logger::{Builder, Target};
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use log::LevelFilter;

const ROTATED_FILE_MAX_BYTES: usize = 10 * 1024 * 1024;
const ROTATED_FILE_COUNT: usize = 5;

/// Initializes the global logger. `debug` raises the default level from
/// `Info` to `Debug`; `log_file`, if given, additionally writes to a rotated
/// file instead of stdout (matching the upstream simulator's optional
/// `logs_filepath` config field).
pub fn init(debug: bool, log_file: Option<&str>) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = Builder::new();
    builder.filter_level(level);

    if let Some(path) = log_file {
        let rotator = FileRotate::new(
            path,
            AppendCount::new(ROTATED_FILE_COUNT),
            ContentLimit::Bytes(ROTATED_FILE_MAX_BYTES),
            Compression::None,
        );
        builder.target(Target::Pipe(Box::new(rotator)));
    }

    builder.init();
}

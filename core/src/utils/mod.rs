pub mod detector;
pub mod payload_loader;

use std::fs::File;
use std::io;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use which::which;

/// Resolves the full path to an optional external binary.
/// Search order: ./tools/{name} → ./{name} → system PATH
pub fn get_binary_path(tool_name: &str) -> Option<String> {
    let binary_name = if cfg!(target_os = "windows") {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    };

    let tools_path = PathBuf::from("./tools").join(&binary_name);
    if tools_path.is_file() {
        return Some(tools_path.to_string_lossy().to_string());
    }

    let local_path = PathBuf::from("./").join(&binary_name);
    if local_path.is_file() {
        return Some(local_path.to_string_lossy().to_string());
    }

    if let Ok(path) = which(&binary_name) {
        return Some(path.to_string_lossy().to_string());
    }

    None
}

/// Reads a file line-by-line, returning all non-empty trimmed lines.
pub fn read_lines(path: &str) -> io::Result<Vec<String>> {
    let file = File::open(Path::new(path))?;
    let reader = io::BufReader::new(file);
    let lines = reader
        .lines()
        .filter_map(|line| {
            let line = line.ok()?;
            let trimmed = line.trim().to_string();
            if trimmed.is_empty() { None } else { Some(trimmed) }
        })
        .collect();
    Ok(lines)
}

/// Installs the global logger. `RUST_LOG` overrides the verbosity flag.
pub fn init_logger(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.format(|buf, record| {
        writeln!(buf, "[{}] {}", record.level().as_str().to_lowercase(), record.args())
    });
    let _ = builder.try_init();
}

//! Default file locations, all relative to a single data directory.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//!
//! Running two isolated instances side by side:
//! ```bash
//! DATA_DIR=data/test/a PORT=8081 cargo run
//! DATA_DIR=data/test/b PORT=8082 cargo run
//! ```

use std::env;
use std::sync::OnceLock;

static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// SQLite database holding users, sessions, histories and analyses
pub fn db_path() -> String {
    format!("{}/virusdecode.db", data_dir())
}

/// Sample analyses imported into the template account on first start
pub fn sample_file() -> String {
    format!("{}/samples.json", data_dir())
}

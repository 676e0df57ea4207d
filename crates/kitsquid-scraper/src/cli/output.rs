//! Output mode flags shared by every command.
//!
//! `main` turns the global `--json`/`--quiet`/`--verbose` flags into
//! `KITSQUID_*` environment variables so any module can check them.

use serde::Serialize;

pub fn is_json() -> bool {
    std::env::var_os("KITSQUID_JSON").is_some()
}

pub fn is_quiet() -> bool {
    std::env::var_os("KITSQUID_QUIET").is_some()
}

pub fn is_verbose() -> bool {
    std::env::var_os("KITSQUID_VERBOSE").is_some()
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: cannot encode output: {e}"),
    }
}

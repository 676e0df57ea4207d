//! CLI subcommand implementations for the `kitsquid-scrape` binary.

pub mod output;
pub mod scrape_cmd;
pub mod session;
pub mod spinner;
pub mod store_cmd;
pub mod terms_cmd;

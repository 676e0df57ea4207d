//! `terms`: list the configured term keys.

use crate::cli::output;
use crate::cli::session::Session;
use crate::terms::normalize_tag;
use anyhow::Result;

pub async fn run(session: &Session) -> Result<()> {
    let mut entries: Vec<(String, String)> = session
        .config
        .terms
        .iter()
        .map(|(k, v)| (normalize_tag(k), v.clone()))
        .collect();
    let order = crate::terms::sort_chronologically(
        &entries.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
    );
    entries.sort_by_key(|(k, _)| order.iter().position(|o| o == k));

    if output::is_json() {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|(k, v)| serde_json::json!({"term": k, "token": v}))
            .collect();
        output::print_json(&serde_json::json!({ "terms": items }));
    } else if entries.is_empty() {
        println!("  No terms configured. Add them under \"terms\" in the config file.");
    } else {
        for (k, v) in &entries {
            println!("  {k:<10}  {v}");
        }
    }
    Ok(())
}

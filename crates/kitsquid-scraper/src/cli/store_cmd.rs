//! CLI handlers for store maintenance: `migrate`, `backfill-html`, `show`.

use crate::cli::output;
use crate::cli::session::Session;
use crate::store::migrations;
use anyhow::{bail, Result};

pub async fn run_migrate(session: &Session) -> Result<()> {
    let store = session.open_store()?;
    let applied = migrations::run_pending(&store)?;

    if output::is_json() {
        let items: Vec<serde_json::Value> = applied
            .iter()
            .map(|m| serde_json::json!({"id": m.id, "rewritten": m.rewritten}))
            .collect();
        output::print_json(&serde_json::json!({ "applied": items }));
    } else if applied.is_empty() {
        println!("  No pending migrations.");
    } else {
        for m in &applied {
            println!("  {:<28}  {} records rewritten", m.id, m.rewritten);
        }
    }
    Ok(())
}

pub async fn run_backfill(session: &Session) -> Result<()> {
    let store = session.open_store()?;
    let rewritten = migrations::run_backfill(&store)?;
    if output::is_json() {
        output::print_json(&serde_json::json!({ "rewritten": rewritten }));
    } else if !output::is_quiet() {
        println!("  Sanitized {rewritten} descriptions.");
    }
    Ok(())
}

pub async fn run_show(session: &Session, internal_id: &str) -> Result<()> {
    let store = session.open_store()?;
    let Some(record) = store.get(internal_id)? else {
        bail!("no stored event with id {internal_id}");
    };

    if output::is_json() {
        output::print_json(&record);
        return Ok(());
    }
    let stub = record.stub();
    println!("  {}  {}", stub.catalog_code, stub.name);
    println!("    Id:          {}", stub.internal_id);
    println!("    Type:        {}", stub.kind);
    println!("    Terms:       {}", stub.term_tags.join(", "));
    println!("    Categories:  {}", stub.category_path.join(" > "));
    let lecturers: Vec<&str> = stub.lecturers.iter().map(|l| l.name.as_str()).collect();
    println!("    Lecturers:   {}", lecturers.join(", "));
    for entry in &stub.schedule {
        println!("    Date:        {}  {}", entry.date_text, entry.room);
    }
    for link in &record.event.links {
        println!("    {:<12} {}", format!("{}:", link.label), link.url);
    }
    println!("    Rating:      {:.1}", record.rating);
    if output::is_verbose() && !record.event.description_html.is_empty() {
        println!("\n{}", record.event.description_html);
    }
    Ok(())
}

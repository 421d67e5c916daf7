use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use momo_ledger::{insert_record, read_sms_export, setup_database, verify_count, Classifier};

const DEFAULT_XML: &str = "data/sms_export.xml";
const DEFAULT_DB: &str = "momo_transactions.db";
const OVERFLOW_LOG: &str = "unprocessed_messages.log";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let xml_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_XML);
            let db_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_DB);
            run_import(Path::new(xml_path), Path::new(db_path))
        }
        _ => {
            eprintln!("Usage: momo-ledger import [<sms_export.xml>] [<transactions.db>]");
            eprintln!("       (query the result with the momo-server binary)");
            std::process::exit(2);
        }
    }
}

fn run_import(xml_path: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  MoMo Ledger - SMS import ({})", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Setup database
    println!("\n🔧 Setting up database...");
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 2. Read the SMS export. An unreadable source is fatal: abort with
    // zero records processed.
    println!("\n📂 Reading SMS export...");
    let batch = read_sms_export(xml_path)?;
    println!("✓ Found {} message bodies", batch.bodies.len());
    if batch.missing_bodies > 0 {
        println!("✓ Skipped {} entries without a body", batch.missing_bodies);
    }

    // 3. Classify and insert, in source order
    println!("\n💾 Classifying and inserting...");
    let mut classifier = Classifier::new()?;
    let mut processed = 0usize;

    for body in &batch.bodies {
        if let Some(record) = classifier.classify(body)? {
            insert_record(&conn, &record)?;
            processed += 1;
        }
    }

    let count = verify_count(&conn)?;
    println!("✓ Inserted {} transactions ({} rows in store)", processed, count);

    // 4. Hand the overflow collection to the sink, write-once after the
    // full batch
    let unprocessed = classifier.into_unprocessed();
    if !unprocessed.is_empty() {
        write_overflow_log(Path::new(OVERFLOW_LOG), &unprocessed)?;
        println!("✓ Wrote {} unmatched messages to {}", unprocessed.len(), OVERFLOW_LOG);
    }

    // 5. Summary
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "🎉 Import complete: {} processed, {} unprocessed, {} skipped",
        processed,
        unprocessed.len(),
        batch.missing_bodies
    );

    Ok(())
}

/// Overflow sink: one message per block, blank-line separated, arrival order.
fn write_overflow_log(path: &Path, messages: &[String]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create overflow log: {}", path.display()))?;

    for message in messages {
        writeln!(file, "{}\n", message)?;
    }

    Ok(())
}

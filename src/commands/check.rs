//! Check command implementation.
//!
//! Parses and shape-checks a dump, printing a summary instead of the report.

use std::path::PathBuf;
use std::time::Instant;

use beamscope::{extract_processes, parse_document, ParseLimits};

use crate::config::{Config, DEFAULT_MAX_DEPTH, DEFAULT_MAX_INPUT_MB};
use crate::input::read_document;

/// Validates that a dump parses and every entry is well-shaped.
pub fn command_check(
    input: Option<PathBuf>,
    verbose: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 beamscope - Dump Check");
    println!("=========================");

    let max_input_mb = config.max_input_mb.unwrap_or(DEFAULT_MAX_INPUT_MB);
    let limits = ParseLimits {
        max_depth: config.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
    };

    let start = Instant::now();
    let text = read_document(input.as_deref(), max_input_mb as u64 * 1024 * 1024)?;
    println!("   📄 Read {} bytes", text.len());

    let term = match parse_document(&text, &limits) {
        Ok(term) => {
            println!("   ✅ Document parses");
            term
        }
        Err(e) => {
            println!("   ❌ Parse failed: {}", e);
            std::process::exit(1);
        }
    };

    let records = match extract_processes(term) {
        Ok(records) => {
            println!("   ✅ {} process entries, all well-shaped", records.len());
            records
        }
        Err(e) => {
            println!("   ❌ Shape check failed: {}", e);
            std::process::exit(1);
        }
    };

    if verbose {
        for record in &records {
            println!(
                "   ├─ {} reductions={} qlen={}",
                record.pid, record.reductions, record.message_queue_len
            );
        }
    }

    if let Some(busiest) = records.first() {
        println!(
            "   🏆 Busiest: {} with {} reductions",
            busiest.pid, busiest.reductions
        );
    }

    let duration = start.elapsed();
    println!(
        "   ⏱️  Checked in {:.2}ms",
        duration.as_secs_f64() * 1000.0
    );

    println!("\n✅ Check completed successfully");
    Ok(())
}

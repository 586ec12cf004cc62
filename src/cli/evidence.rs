//! Evidence ledger subcommands.
//!
//! Provides commands to:
//! - `list`: Filtered or fallback listing of ledger records
//! - `show`: One candidate's newest record in full

use anyhow::Result;
use clap::Subcommand;

use crate::config;
use crate::ledger::{EvidenceLedger, DEFAULT_FALLBACK_LIMIT};

/// Evidence-related subcommands
#[derive(Subcommand, Debug)]
pub enum EvidenceCommands {
    /// List ledger records
    List {
        /// Exact candidate_id filter
        #[arg(long)]
        candidate_id: Option<String>,

        /// Case-insensitive substring against candidate_id/notes
        #[arg(long)]
        matching: Option<String>,

        /// Fallback count when no filter matches
        #[arg(long, default_value_t = DEFAULT_FALLBACK_LIMIT)]
        last: usize,
    },

    /// Show the newest record for a candidate in full
    Show {
        /// Candidate ID to display
        candidate_id: String,
    },
}

/// Execute the `evidence list` command
pub async fn execute_list(
    candidate_id: Option<String>,
    matching: Option<String>,
    last: usize,
) -> Result<()> {
    let ledger = EvidenceLedger::new(config::log_path()?);
    let records = ledger
        .select(candidate_id.as_deref(), matching.as_deref(), last)
        .await?;

    if records.is_empty() {
        println!("No evidence records found");
        return Ok(());
    }

    println!(
        "{:<22} {:<20} {:>9} {:>9}  {}",
        "TIMESTAMP", "CANDIDATE", "LAT", "LON", "PRIMARY SOURCE"
    );
    println!("{}", "-".repeat(90));

    for record in &records {
        let primary = record
            .primary_source()
            .map(|s| format!("{}: {}", s.source_type, s.id))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<22} {:<20} {:>9.4} {:>9.4}  {}",
            record.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            record.candidate_id,
            record.lat,
            record.lon,
            primary
        );
    }

    println!("\nTotal: {} records", records.len());
    Ok(())
}

/// Execute the `evidence show` command
pub async fn execute_show(candidate_id: &str) -> Result<()> {
    let ledger = EvidenceLedger::new(config::log_path()?);
    let records = ledger.find_candidate(candidate_id).await?;

    let Some(record) = records.last() else {
        anyhow::bail!("No evidence recorded for candidate: {}", candidate_id);
    };

    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

//! Output module for reporting on crawl results
//!
//! This module handles:
//! - Summarising a finished run for the console
//! - Computing and printing statistics over the stored dataset

pub mod stats;

pub use stats::{compute_statistics, load_statistics, print_statistics, DatasetStatistics, PostCount};

use crate::crawler::RunReport;

/// Prints the summary of one run to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Run Summary ===\n");

    if report.already_complete {
        println!("Index already fully crawled; timestamps refreshed.");
        println!("  Stored records: {}", report.total_records);
        return;
    }

    println!("  Index pages fetched: {}", report.pages_fetched);
    println!("  Posts listed: {}", report.documents_seen);
    println!("  Posts skipped: {}", report.documents_skipped);
    println!("  Comments scanned: {}", report.comments_scanned);
    println!("  Matching comments: {}", report.records_matched);
    println!("  New records: {}", report.records_added);
    println!("  Stored records: {}", report.total_records);

    if let Some(error) = &report.index_error {
        println!("  Index paging stopped early: {}", error);
    }

    if let Some(state) = &report.state {
        println!();
        println!("Crawl State:");
        println!("  Next offset: {}", state.next_offset);
        println!("  Posts seen so far: {}", state.total_documents_seen);
        println!("  Complete: {}", if state.done { "yes" } else { "no" });
    }
}

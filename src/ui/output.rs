//! End-of-run reporting.

use crate::writer::RunSummary;
use std::path::Path;

/// Prints what was mirrored and how many modules or entries were lost on the way.
///
/// # Arguments
/// * `summary` - Counters collected by the writer
/// * `output_dir` - Directory the mirror was written to
pub fn print_run_summary(summary: &RunSummary, output_dir: &Path) {
    println!("\n🔚 Mirror completed into '{}'", output_dir.display());
    println!(
        "\t📦 {} modules processed, {} entries received",
        summary.modules, summary.entries_received
    );
    println!(
        "\t💾 {} unique entries written, {} duplicates skipped",
        summary.entries_written, summary.duplicates
    );

    if summary.degraded_modules == 0 && summary.entries_failed == 0 {
        println!("✅ No failures!");
        return;
    }

    if summary.degraded_modules > 0 {
        println!(
            "⚠️  {} modules failed or were only partially saved, see warnings above",
            summary.degraded_modules
        );
    }
    if summary.entries_failed > 0 {
        println!("⚠️  {} entries could not be saved", summary.entries_failed);
    }
}

//! Verify command implementation.

use super::format_size;
use std::path::Path;
use valuez_storage::{FileStore, VerifyReport};

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }

    println!("Verifying store at {}", path.display());
    println!();

    let report = FileStore::verify(path)?;
    print_report(&report);

    println!();
    if report.is_clean() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

fn print_report(report: &VerifyReport) {
    println!("  File size:      {}", format_size(report.file_len));
    println!("  Valid frames:   {}", report.frames);
    println!("  Operations:     {}", report.ops);
    println!("  Valid prefix:   {} bytes", report.valid_len);
    if let Some(error) = &report.error {
        println!();
        println!("  Error: {error}");
        println!("  Trailing bytes: {}", report.trailing_bytes);
        if report.is_recoverable() {
            println!("  The damaged tail will be dropped on next open.");
        } else {
            println!("  Valid frames follow the damage; the store cannot be opened.");
        }
    }
}

//! Compact command implementation.

use super::{format_size, open_store};
use std::path::Path;
use valuez_storage::BucketStore;

/// Runs the compact command.
pub fn run(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(path)?;

    println!("Compacting store at {}", path.display());
    if dry_run {
        println!("(dry run - no changes will be made)");
        println!();
        println!("  Frames:    {}", store.frame_count());
        println!("  File size: {}", format_size(store.len_bytes()));
        store.close()?;
        return Ok(());
    }
    println!();

    let report = store.compact()?;
    store.close()?;

    println!("  Frames before: {}", report.frames_before);
    println!("  Size before:   {}", format_size(report.bytes_before));
    println!("  Size after:    {}", format_size(report.bytes_after));
    println!(
        "  Space saved:   {}",
        format_size(report.bytes_before.saturating_sub(report.bytes_after))
    );
    Ok(())
}

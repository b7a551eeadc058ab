//! CLI entry-point for inspecting the saved cursor.

use crate::cursor::Cursor;
use crate::error::Result;
use clap::Args as ClapArgs;
use std::path::PathBuf;

/// Args for the `status` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Cursor checkpoint file
    #[arg(long, default_value_os_t = crate::config::default_cursor_file())]
    pub cursor_file: PathBuf,
}

/// Print the saved cursor position without touching anything else.
pub async fn run(args: Args) -> Result<()> {
    let cursor = Cursor::load(&args.cursor_file).await?;

    if cursor.is_empty() {
        println!("No cursor found. Backfill will start from the beginning.");
        return Ok(());
    }

    println!("Cursor file:     {}", args.cursor_file.display());
    println!("Version:         {}", cursor.version);
    println!("Last created at: {}", cursor.last_created_at.to_rfc3339());
    println!("Last id:         {}", cursor.last_id);
    println!("Current date:    {}", cursor.current_date);
    println!("Processed:       {}", cursor.processed_count);
    println!("Updated at:      {}", cursor.updated_at.to_rfc3339());

    Ok(())
}

//! CLI entry-point for clearing the saved cursor.

use crate::cursor::Cursor;
use crate::error::Result;
use clap::Args as ClapArgs;
use std::path::PathBuf;

/// Args for the `reset-cursor` sub-command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Cursor checkpoint file
    #[arg(long, default_value_os_t = crate::config::default_cursor_file())]
    pub cursor_file: PathBuf,
}

/// Overwrite the cursor with its empty state.
///
/// Also the documented way out of a corrupt cursor file.
pub async fn run(args: Args) -> Result<()> {
    Cursor::empty().save(&args.cursor_file).await?;
    println!("Cursor reset. The next run starts from the beginning.");
    Ok(())
}

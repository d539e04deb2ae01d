//! # Extract Subcommand
//!
//! Prints the text a policy file would be stored as after upload. Useful
//! for seeing why a phrase does or does not match in substring mode.

use std::path::PathBuf;

use clap::Args;

use crate::{read_text, EXIT_OK};

/// Arguments for `polcheck extract`.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// File to extract. `.pdf` files use the PDF text layer, anything else
    /// is read as UTF-8.
    pub path: PathBuf,

    /// Print the character count instead of the text.
    #[arg(long)]
    pub count: bool,
}

/// Execute the extract subcommand.
pub fn run_extract(args: &ExtractArgs) -> anyhow::Result<u8> {
    let text = read_text(&args.path)?;
    if args.count {
        println!("{}", text.chars().count());
    } else {
        println!("{text}");
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_plain_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let args = ExtractArgs { path, count: true };
        assert_eq!(run_extract(&args).unwrap(), EXIT_OK);
    }

    #[test]
    fn extract_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();
        let args = ExtractArgs { path, count: false };
        assert!(run_extract(&args).is_err());
    }
}

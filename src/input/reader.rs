use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{self, Read};

const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB

/// Reads the text to translate from a file or stdin, capped at 1 MB.
pub struct InputReader;

impl InputReader {
    pub fn read(file_path: Option<&str>) -> Result<String> {
        match file_path {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("Failed to access file: {path}"))?;
                Self::read_capped(file, "file")
                    .with_context(|| format!("Failed to read file: {path}"))
            }
            None => Self::read_capped(io::stdin().lock(), "input")
                .context("Failed to read from stdin"),
        }
    }

    /// Reads at most one byte past the cap so oversized input is detected
    /// without loading all of it.
    fn read_capped(reader: impl Read, what: &str) -> Result<String> {
        let mut buffer = Vec::new();
        reader
            .take(MAX_INPUT_SIZE as u64 + 1)
            .read_to_end(&mut buffer)?;

        if buffer.len() > MAX_INPUT_SIZE {
            bail!(
                "Error: Input size exceeds maximum allowed size (1 MB).\n\n\
                 Consider splitting the {what} into smaller parts."
            );
        }

        String::from_utf8(buffer).context("Input is not valid UTF-8")
    }
}

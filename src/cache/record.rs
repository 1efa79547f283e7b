//! Line format of the persisted cache file.
//!
//! Each entry is two lines, the original followed by its translation.
//! Literal newlines inside either text are replaced by [`NEWLINE_TOKEN`].

use std::path::Path;

use crate::error::{CacheError, Result};

/// Stand-in for `\n` inside a persisted line.
pub const NEWLINE_TOKEN: &str = "/@_/nl/_@/";

/// Escapes a text so it occupies exactly one line.
pub fn encode_line(text: &str) -> String {
    text.replace('\n', NEWLINE_TOKEN)
}

/// Restores the newlines escaped by [`encode_line`].
pub fn decode_line(line: &str) -> String {
    line.replace(NEWLINE_TOKEN, "\n")
}

/// Formats one `(original, translation)` record, trailing newline included.
pub fn format_record(original: &str, translation: &str) -> String {
    format!("{}\n{}\n", encode_line(original), encode_line(translation))
}

/// Parses the whole content of a cache file into decoded pairs.
///
/// Lines end at `\n` only; a `\r` belongs to the text. `path` is only used
/// for error reporting.
pub fn parse_records(content: &str, path: &Path) -> Result<Vec<(String, String)>> {
    let mut records = Vec::new();
    let mut lines = content.split_terminator('\n').enumerate();

    while let Some((index, original)) = lines.next() {
        let Some((_, translation)) = lines.next() else {
            return Err(CacheError::CorruptCache {
                path: path.to_path_buf(),
                line: index + 1,
                reason: "record has no translation".to_string(),
            });
        };
        records.push((decode_line(original), decode_line(translation)));
    }

    Ok(records)
}

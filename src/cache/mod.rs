mod cell;
mod record;
mod store;

pub use cell::{CellState, TranslationCell, normalize};
pub use record::{NEWLINE_TOKEN, decode_line, encode_line, format_record, parse_records};
pub use store::{CacheStore, Lookup, file_name};

mod client;
mod language;
mod prompt;
mod provider;

pub use client::OpenAiTranslator;
pub use language::{SUPPORTED_LANGUAGES, language_name, print_languages, validate_language};
pub use provider::BatchTranslator;

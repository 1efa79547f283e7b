use anyhow::Result;
use async_trait::async_trait;

/// A service able to translate an ordered list of texts in one call.
///
/// Implementations must return exactly one translation per input, in input
/// order. Any transport or decoding problem is reported as an error; the
/// caller never retries.
#[async_trait]
pub trait BatchTranslator: Send + Sync {
    async fn translate_batch(
        &self,
        source: &str,
        target: &str,
        texts: &[String],
    ) -> Result<Vec<String>>;
}

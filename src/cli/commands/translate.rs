use anyhow::{Context, Result, bail};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigManager, ResolveOptions, resolve_config};
use crate::input::InputReader;
use crate::registry::Registry;
use crate::status;
use crate::translation::{BatchTranslator, OpenAiTranslator, validate_language};
use crate::translator::Translator;
use crate::ui::{Spinner, Style};

pub struct TranslateOptions {
    pub file: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

/// Translates every line of the input through the cache and prints the
/// translations in input order.
pub fn run_translate(options: TranslateOptions) -> Result<()> {
    let config_file = ConfigManager::new().load_or_default();
    let resolved = resolve_config(
        &ResolveOptions {
            from: options.from,
            to: options.to,
            provider: options.provider,
            model: options.model,
            cache_dir: options.cache_dir,
        },
        &config_file,
    )?;
    validate_language(&resolved.source_language)?;
    validate_language(&resolved.target_language)?;

    let source_text = InputReader::read(options.file.as_deref())?;
    if source_text.is_empty() {
        bail!("Error: Input is empty");
    }

    let registry = Registry::new(resolved.registry_config())
        .context("Failed to start the translation dispatcher")?;
    let provider: Arc<dyn BatchTranslator> = Arc::new(OpenAiTranslator::new(
        resolved.endpoint.clone(),
        resolved.model.clone(),
        resolved.api_key.clone(),
    ));
    let translator = Translator::open(&registry, provider, resolved.translator_options())
        .context("Failed to open the translation cache")?;

    let cells: Vec<_> = source_text
        .lines()
        .map(|line| translator.translate(line))
        .collect();
    let pending = cells.iter().filter(|cell| !cell.is_resolved()).count();
    translator.flush_batch();

    let spinner = Spinner::new(&format!("Translating {pending} of {} lines...", cells.len()));
    let mut translated = Vec::with_capacity(cells.len());
    let mut failed = 0;
    for cell in &cells {
        match cell.get() {
            Ok(text) => translated.push(text),
            Err(e) => {
                failed += 1;
                spinner.set_message(Style::warning(format!("{failed} lines failed")));
                tracing::warn!(error = %e, "Line left untranslated");
                translated.push(cell.original().to_string());
            }
        }
    }
    spinner.stop();

    let cache_path = translator.cache_path().to_path_buf();
    translator.close().context("Failed to close the translation cache")?;

    let mut stdout = io::stdout().lock();
    for line in &translated {
        writeln!(stdout, "{line}")?;
    }
    stdout.flush()?;

    if failed > 0 {
        status!(
            "{} {failed} lines were printed untranslated",
            Style::warning("Warning:")
        );
        bail!("{failed} of {} lines could not be translated", cells.len());
    }
    status!(
        "{} {} lines ({} from cache) {}",
        Style::success("Translated"),
        cells.len(),
        cells.len() - pending,
        Style::secondary(cache_path.display())
    );

    Ok(())
}

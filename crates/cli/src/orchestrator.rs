//! Deck and folder processing.

use anyhow::{Context, Result};
use deck_core::{translate_slide, PresentationFormat, Translator, WalkStats};
use deck_pptx::Deck;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

const PROGRESS_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} slides ({elapsed})";

/// Result of translating one deck.
#[derive(Debug)]
pub struct DeckReport {
    pub output: PathBuf,
    pub slides: usize,
    pub stats: WalkStats,
}

impl DeckReport {
    /// One-line outcome for the terminal.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Saved as {} ({} slides, {} runs translated)",
            self.output.display(),
            self.slides,
            self.stats.runs_changed
        );
        if self.stats.failed_shapes > 0 {
            line.push_str(&format!(", {} shapes failed", self.stats.failed_shapes));
        }
        line
    }
}

/// Result of translating a folder of decks.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub translated: Vec<DeckReport>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Where the translation of `input` is written: `<target>_<file name>`.
pub fn output_path(input: &Path, target_language: &str, output_dir: &Path) -> PathBuf {
    let filename = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("presentation.pptx");

    output_dir.join(format!("{}_{}", target_language, filename))
}

/// Translate a single deck and save it next to the others in `output_dir`.
pub fn process_presentation<T: Translator + ?Sized>(
    input: &Path,
    target_language: &str,
    translator: &mut T,
    output_dir: &Path,
    show_progress: bool,
) -> Result<DeckReport> {
    log::info!("Opening {}", input.display());
    let mut deck =
        Deck::open(input).with_context(|| format!("Error opening file {}", input.display()))?;

    let slide_count = deck.slide_count();
    let progress = progress_bar(slide_count as u64, show_progress);

    let mut stats = WalkStats::default();
    for slide in deck.slides_mut() {
        stats.merge(translate_slide(slide, target_language, translator));
        progress.inc(1);
    }
    progress.finish();

    if stats.failed_shapes > 0 {
        log::warn!(
            "{}: {} shape(s) left partially untranslated",
            input.display(),
            stats.failed_shapes
        );
    }

    let output = output_path(input, target_language, output_dir);
    deck.save(&output)
        .with_context(|| format!("Error saving file {}", output.display()))?;
    log::info!(
        "Saved {} ({} of {} runs changed)",
        output.display(),
        stats.runs_changed,
        stats.runs_translated + stats.runs_skipped
    );

    Ok(DeckReport {
        output,
        slides: slide_count,
        stats,
    })
}

/// PPTX files directly inside `dir`, sorted by name.
pub fn find_decks(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut decks = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read folder {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read folder {}", dir.display()))?
            .path();
        let is_pptx = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(PresentationFormat::from_extension)
            == Some(PresentationFormat::Pptx);

        if is_pptx && path.is_file() {
            decks.push(path);
        }
    }

    decks.sort();
    Ok(decks)
}

/// Translate every deck in `dir`. A failing deck is reported and skipped.
pub fn process_folder<T: Translator + ?Sized>(
    dir: &Path,
    target_language: &str,
    translator: &mut T,
    output_dir: &Path,
    show_progress: bool,
) -> Result<BatchSummary> {
    let decks = find_decks(dir)?;
    if decks.is_empty() {
        log::warn!("No .pptx files found in {}", dir.display());
    }

    let mut summary = BatchSummary::default();
    for input in decks {
        match process_presentation(&input, target_language, translator, output_dir, show_progress)
        {
            Ok(report) => summary.translated.push(report),
            Err(e) => {
                log::error!("{:#}", e);
                summary.failed.push((input, format!("{:#}", e)));
            }
        }
    }

    Ok(summary)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    progress.set_message("Translating");
    progress
}

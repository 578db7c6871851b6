//! Shape-tree translation.
//!
//! Walks the shapes of a slide in document order and replaces the text of
//! every meaningful run with its translation, rescaling the run's font size
//! when the text length changes.

use crate::error::Result;
use crate::layout::adjust_font_size;
use crate::model::{Shape, Slide, TextFrame};
use crate::text::is_meaningful;

/// Something that can translate a piece of text.
///
/// Implementations are expected to fail open: an unusable answer from the
/// service should come back as `Ok` with the original text. `Err` is for
/// failures that make the rest of the current shape pointless to attempt.
pub trait Translator {
    fn translate(&mut self, text: &str, target_language: &str) -> Result<String>;
}

impl<T: Translator + ?Sized> Translator for &mut T {
    fn translate(&mut self, text: &str, target_language: &str) -> Result<String> {
        (**self).translate(text, target_language)
    }
}

/// Counters collected while walking shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Runs sent to the translator.
    pub runs_translated: usize,

    /// Runs whose text changed.
    pub runs_changed: usize,

    /// Runs skipped because they hold no meaningful text.
    pub runs_skipped: usize,

    /// Shapes abandoned after a translator error.
    pub failed_shapes: usize,
}

impl WalkStats {
    /// Add another set of counters to this one.
    pub fn merge(&mut self, other: WalkStats) {
        self.runs_translated += other.runs_translated;
        self.runs_changed += other.runs_changed;
        self.runs_skipped += other.runs_skipped;
        self.failed_shapes += other.failed_shapes;
    }
}

/// Translate every shape of a slide.
pub fn translate_slide<T: Translator + ?Sized>(
    slide: &mut Slide,
    target_language: &str,
    translator: &mut T,
) -> WalkStats {
    log::debug!("Translating slide {}", slide.number);
    translate_shapes(&mut slide.shapes, target_language, translator)
}

/// Translate a sequence of shapes, recursing into groups.
///
/// A translator error abandons the remaining runs of the shape it occurred
/// in; the error is logged and the walk moves on to the next shape.
pub fn translate_shapes<T: Translator + ?Sized>(
    shapes: &mut [Shape],
    target_language: &str,
    translator: &mut T,
) -> WalkStats {
    let mut stats = WalkStats::default();

    for (index, shape) in shapes.iter_mut().enumerate() {
        if let Err(e) = translate_shape(shape, target_language, translator, &mut stats) {
            log::warn!("Error processing shape {}: {}", index, e);
            stats.failed_shapes += 1;
        }
    }

    stats
}

fn translate_shape<T: Translator + ?Sized>(
    shape: &mut Shape,
    target_language: &str,
    translator: &mut T,
    stats: &mut WalkStats,
) -> Result<()> {
    match shape {
        Shape::Text(frame) => translate_frame(frame, target_language, translator, stats),
        Shape::Table(table) => {
            for frame in table.text_frames_mut() {
                translate_frame(frame, target_language, translator, stats)?;
            }
            Ok(())
        }
        Shape::Group(children) => {
            stats.merge(translate_shapes(children, target_language, translator));
            Ok(())
        }
        Shape::Opaque => Ok(()),
    }
}

fn translate_frame<T: Translator + ?Sized>(
    frame: &mut TextFrame,
    target_language: &str,
    translator: &mut T,
    stats: &mut WalkStats,
) -> Result<()> {
    for run in frame.runs_mut() {
        if run.text.trim().is_empty() || !is_meaningful(&run.text) {
            stats.runs_skipped += 1;
            continue;
        }

        let translated = translator.translate(&run.text, target_language)?;
        stats.runs_translated += 1;

        if translated != run.text {
            run.font_size = adjust_font_size(&run.text, &translated, run.font_size);
            run.text = translated;
            stats.runs_changed += 1;
        }
    }
    Ok(())
}

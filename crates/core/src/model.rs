//! Domain types for the translatable content of a deck.
//!
//! The model only covers what translation needs: shapes, the text they hold
//! and the font size of each run. Everything else stays inside the package
//! backend that produced the model.

/// Identifies a run inside the slide part it was read from.
///
/// Keys are assigned by the package backend in document order and are only
/// meaningful to that backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey(pub usize);

/// The smallest unit of styled text inside a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Current text of the run.
    pub text: String,

    /// Explicit font size in points. `None` when the size is inherited.
    pub font_size: Option<f64>,

    key: RunKey,
}

impl Run {
    /// Create a new run.
    pub fn new(key: RunKey, text: impl Into<String>, font_size: Option<f64>) -> Self {
        Self {
            text: text.into(),
            font_size,
            key,
        }
    }

    /// Backend key of this run.
    pub fn key(&self) -> RunKey {
        self.key
    }
}

/// An ordered sequence of runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self { runs }
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A text body: the paragraphs of a text shape or a table cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

impl TextFrame {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }

    /// Iterate over every run in document order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.paragraphs.iter().flat_map(|p| p.runs.iter())
    }

    /// Iterate mutably over every run in document order.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.paragraphs.iter_mut().flat_map(|p| p.runs.iter_mut())
    }
}

/// A table cell. Cells merged into a neighbour may carry no text body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub text_frame: Option<TextFrame>,
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// A grid of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    /// Iterate over the text frames of all cells, row by row.
    pub fn text_frames(&self) -> impl Iterator<Item = &TextFrame> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter_map(|c| c.text_frame.as_ref())
    }

    /// Iterate mutably over the text frames of all cells, row by row.
    pub fn text_frames_mut(&mut self) -> impl Iterator<Item = &mut TextFrame> {
        self.rows
            .iter_mut()
            .flat_map(|r| r.cells.iter_mut())
            .filter_map(|c| c.text_frame.as_mut())
    }
}

/// A visual element on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A shape holding a text body.
    Text(TextFrame),
    /// A graphic frame holding a table.
    Table(Table),
    /// A group of nested shapes.
    Group(Vec<Shape>),
    /// Anything without translatable text (pictures, connectors, charts...).
    Opaque,
}

impl Shape {
    /// Call `f` for every run in this shape, in document order.
    pub fn for_each_run<'a, F: FnMut(&'a Run)>(&'a self, f: &mut F) {
        match self {
            Shape::Text(frame) => frame.runs().for_each(|r| f(r)),
            Shape::Table(table) => table
                .text_frames()
                .flat_map(|frame| frame.runs())
                .for_each(|r| f(r)),
            Shape::Group(children) => {
                for child in children {
                    child.for_each_run(f);
                }
            }
            Shape::Opaque => {}
        }
    }
}

/// A single slide.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Top-level shapes in document order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new empty slide with the given number.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            shapes: Vec::new(),
        }
    }

    /// Call `f` for every run on the slide, in document order.
    pub fn for_each_run<'a, F: FnMut(&'a Run)>(&'a self, mut f: F) {
        for shape in &self.shapes {
            shape.for_each_run(&mut f);
        }
    }

    /// Collect the text of every run on the slide.
    pub fn run_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        self.for_each_run(|r| texts.push(r.text.clone()));
        texts
    }
}

/// The format of a presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary). Recognized so it can be rejected clearly.
    Ppt,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(key: usize, text: &str) -> Run {
        Run::new(RunKey(key), text, None)
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            PresentationFormat::from_extension("PPTX"),
            Some(PresentationFormat::Pptx)
        );
        assert_eq!(
            PresentationFormat::from_extension("ppt"),
            Some(PresentationFormat::Ppt)
        );
        assert_eq!(PresentationFormat::from_extension("txt"), None);

        assert_eq!(
            PresentationFormat::from_magic(b"PK\x03\x04rest"),
            Some(PresentationFormat::Pptx)
        );
        assert_eq!(
            PresentationFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(PresentationFormat::Ppt)
        );
        assert_eq!(PresentationFormat::from_magic(b"PK"), None);
    }

    #[test]
    fn test_run_order_through_groups_and_tables() {
        let table = Table {
            rows: vec![Row {
                cells: vec![
                    Cell {
                        text_frame: Some(TextFrame::new(vec![Paragraph::new(vec![run(1, "b")])])),
                    },
                    Cell { text_frame: None },
                    Cell {
                        text_frame: Some(TextFrame::new(vec![Paragraph::new(vec![run(2, "c")])])),
                    },
                ],
            }],
        };

        let mut slide = Slide::new(1);
        slide.shapes.push(Shape::Text(TextFrame::new(vec![Paragraph::new(vec![
            run(0, "a"),
        ])])));
        slide.shapes.push(Shape::Group(vec![Shape::Opaque, Shape::Table(table)]));
        slide.shapes.push(Shape::Text(TextFrame::new(vec![Paragraph::new(vec![
            run(3, "d"),
        ])])));

        assert_eq!(slide.run_texts(), vec!["a", "b", "c", "d"]);

        let mut keys = Vec::new();
        slide.for_each_run(|r| keys.push(r.key().0));
        assert_eq!(keys, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_runs_borrowed_past_visit() {
        let mut slide = Slide::new(1);
        slide.shapes.push(Shape::Group(vec![Shape::Text(TextFrame::new(vec![
            Paragraph::new(vec![run(0, "kept"), run(1, "too")]),
        ]))]));

        let mut runs: Vec<&Run> = Vec::new();
        slide.for_each_run(|r| runs.push(r));

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "kept");
        assert_eq!(runs[1].key(), RunKey(1));
    }

    #[test]
    fn test_paragraph_text() {
        let p = Paragraph::new(vec![run(0, "Hello "), run(1, "World")]);
        assert_eq!(p.text(), "Hello World");
    }
}

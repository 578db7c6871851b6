//! Slide part parsing and serialization.
//!
//! A slide part is kept as the list of XML events it was read from. The
//! shape tree handed out for translation only references runs by key; on
//! save, the events belonging to edited runs are replaced and everything
//! else is written back exactly as read.

use deck_core::{
    Cell, Error, Paragraph, Result, Row, Run, RunKey, Shape, Slide, Table, TextFrame,
};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;

/// A parsed slide part.
#[derive(Debug, Clone)]
pub struct SlidePart {
    /// Path of the part inside the package, e.g. `ppt/slides/slide1.xml`.
    path: String,

    /// Slide model exposed for translation.
    slide: Slide,

    events: Vec<Event<'static>>,
    anchors: Vec<RunAnchor>,
}

/// Where a run lives in the event list, and what it held when read.
#[derive(Debug, Clone, Default)]
struct RunAnchor {
    /// Indices of the text events inside `a:t`.
    text_events: Vec<usize>,
    /// Index of the `a:rPr` event, if the run has one.
    props_event: Option<usize>,
    text: String,
    font_size: Option<f64>,
}

/// Builder state for one open XML element.
#[derive(Debug)]
enum Frame {
    /// Outside `p:spTree`, looking for it.
    Seek,
    /// `p:spTree`
    Tree(Vec<Shape>),
    /// `p:grpSp`
    Group(Vec<Shape>),
    /// `p:sp`
    Sp(Option<TextFrame>),
    /// `p:graphicFrame`
    GraphicFrame(Option<Table>),
    /// `a:graphic` / `a:graphicData`
    Graphic,
    /// `a:tbl`
    Table(Vec<Row>),
    /// `a:tr`
    Row(Vec<Cell>),
    /// `a:tc`
    Cell(Option<TextFrame>),
    /// `p:txBody` / `a:txBody`
    Body(Vec<Paragraph>),
    /// `a:p`
    Paragraph(Vec<Run>),
    /// `a:r`, holding its anchor index
    Run(usize),
    /// `a:t` inside a run
    RunText(usize),
    /// Shape element without translatable text
    Opaque,
    /// Anything else
    Ignored,
}

impl Frame {
    /// Frame for a child element named `name` (local name) of this frame.
    fn child(&self, name: &[u8]) -> Frame {
        match (self, name) {
            (Frame::Seek, b"spTree") => Frame::Tree(Vec::new()),
            (Frame::Seek, _) => Frame::Seek,
            (Frame::Tree(_) | Frame::Group(_), b"sp") => Frame::Sp(None),
            (Frame::Tree(_) | Frame::Group(_), b"grpSp") => Frame::Group(Vec::new()),
            (Frame::Tree(_) | Frame::Group(_), b"graphicFrame") => Frame::GraphicFrame(None),
            (
                Frame::Tree(_) | Frame::Group(_),
                b"pic" | b"cxnSp" | b"contentPart" | b"AlternateContent",
            ) => Frame::Opaque,
            (Frame::Sp(_), b"txBody") => Frame::Body(Vec::new()),
            (Frame::GraphicFrame(_) | Frame::Graphic, b"graphic" | b"graphicData") => {
                Frame::Graphic
            }
            (Frame::Graphic, b"tbl") => Frame::Table(Vec::new()),
            (Frame::Table(_), b"tr") => Frame::Row(Vec::new()),
            (Frame::Row(_), b"tc") => Frame::Cell(None),
            (Frame::Cell(_), b"txBody") => Frame::Body(Vec::new()),
            (Frame::Body(_), b"p") => Frame::Paragraph(Vec::new()),
            (Frame::Run(anchor), b"t") => Frame::RunText(*anchor),
            _ => Frame::Ignored,
        }
    }
}

impl SlidePart {
    /// Parse a slide part from its XML content.
    pub fn parse(path: impl Into<String>, number: usize, xml: &str) -> Result<Self> {
        let path = path.into();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut events: Vec<Event<'static>> = Vec::new();
        let mut anchors: Vec<RunAnchor> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut slide = Slide::new(number);

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::XmlError(format!(
                    "Error parsing {} at position {}: {}",
                    path,
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(ref e) => {
                    let name = e.name();
                    let name = local_name(name.as_ref());

                    let frame = match (stack.last(), name) {
                        (Some(Frame::Paragraph(_)), b"r") => {
                            anchors.push(RunAnchor::default());
                            Frame::Run(anchors.len() - 1)
                        }
                        (Some(Frame::Run(anchor)), b"rPr") => {
                            record_props(&mut anchors[*anchor], e, events.len())?;
                            Frame::Ignored
                        }
                        (Some(parent), _) => parent.child(name),
                        (None, _) => Frame::Seek,
                    };
                    stack.push(frame);
                }
                Event::Empty(ref e) => {
                    let name = e.name();
                    let name = local_name(name.as_ref());

                    if let Some(Frame::Run(anchor)) = stack.last() {
                        match name {
                            b"rPr" => record_props(&mut anchors[*anchor], e, events.len())?,
                            b"t" => {
                                // Expand <a:t/> so the run has a text slot to write into.
                                let anchor = &mut anchors[*anchor];
                                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                                events.push(Event::Start(e.clone().into_owned()));
                                anchor.text_events.push(events.len());
                                events.push(Event::Text(BytesText::new("").into_owned()));
                                events.push(Event::End(BytesEnd::new(tag)));
                                continue;
                            }
                            _ => {}
                        }
                    }
                }
                Event::Text(ref e) => {
                    if let Some(Frame::RunText(anchor)) = stack.last() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::XmlError(format!("Bad text in {}: {}", path, e)))?;
                        let anchor = &mut anchors[*anchor];
                        anchor.text.push_str(&text);
                        anchor.text_events.push(events.len());
                    }
                }
                Event::CData(ref e) => {
                    if let Some(Frame::RunText(anchor)) = stack.last() {
                        let anchor = &mut anchors[*anchor];
                        anchor.text.push_str(&String::from_utf8_lossy(e));
                        anchor.text_events.push(events.len());
                    }
                }
                Event::End(_) => {
                    let frame = stack.pop().ok_or_else(|| {
                        Error::XmlError(format!("Unbalanced end tag in {}", path))
                    })?;
                    close_frame(frame, &mut stack, &anchors, &mut slide);
                }
                Event::Eof => break,
                _ => {}
            }

            events.push(event.into_owned());
        }

        log::debug!(
            "Parsed {}: {} shapes, {} runs",
            path,
            slide.shapes.len(),
            anchors.len()
        );

        Ok(Self {
            path,
            slide,
            events,
            anchors,
        })
    }

    /// Path of the part inside the package.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Slide model.
    pub fn slide(&self) -> &Slide {
        &self.slide
    }

    /// Mutable slide model. Only run text and font size are written back.
    pub fn slide_mut(&mut self) -> &mut Slide {
        &mut self.slide
    }

    /// Whether any run differs from what was read.
    pub fn is_modified(&self) -> bool {
        let mut modified = false;
        self.slide.for_each_run(|run| {
            if let Some(anchor) = self.anchors.get(run.key().0) {
                modified |= run.text != anchor.text || run.font_size != anchor.font_size;
            }
        });
        modified
    }

    /// Serialize the part, applying edited runs.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let replacements = self.replacements()?;

        let mut writer = Writer::new(Vec::new());
        for (index, event) in self.events.iter().enumerate() {
            let event = replacements.get(&index).unwrap_or(event);
            writer
                .write_event(event)
                .map_err(|e| Error::XmlError(format!("Error writing {}: {}", self.path, e)))?;
        }

        Ok(writer.into_inner())
    }

    /// Replacement events for every edited run, keyed by event index.
    fn replacements(&self) -> Result<HashMap<usize, Event<'static>>> {
        let mut edited: Vec<(&RunAnchor, &Run)> = Vec::new();
        self.slide.for_each_run(|run| {
            if let Some(anchor) = self.anchors.get(run.key().0) {
                edited.push((anchor, run));
            }
        });

        let mut replacements = HashMap::new();
        for (anchor, run) in edited {
            if run.text != anchor.text {
                for (i, &index) in anchor.text_events.iter().enumerate() {
                    let text = if i == 0 { run.text.as_str() } else { "" };
                    replacements.insert(index, Event::Text(BytesText::new(text).into_owned()));
                }
            }

            if run.font_size != anchor.font_size {
                if let (Some(index), Some(size)) = (anchor.props_event, run.font_size) {
                    let event = match &self.events[index] {
                        Event::Start(e) => Event::Start(with_font_size(e, size)?),
                        Event::Empty(e) => Event::Empty(with_font_size(e, size)?),
                        _ => continue,
                    };
                    replacements.insert(index, event);
                }
            }
        }

        Ok(replacements)
    }
}

/// Attach a finished frame to its parent.
fn close_frame(frame: Frame, stack: &mut [Frame], anchors: &[RunAnchor], slide: &mut Slide) {
    match frame {
        Frame::Tree(shapes) => slide.shapes = shapes,
        Frame::Group(shapes) => push_shape(stack, Shape::Group(shapes)),
        Frame::Sp(Some(text_frame)) => push_shape(stack, Shape::Text(text_frame)),
        Frame::Sp(None) | Frame::GraphicFrame(None) | Frame::Opaque => {
            push_shape(stack, Shape::Opaque)
        }
        Frame::GraphicFrame(Some(table)) => push_shape(stack, Shape::Table(table)),
        Frame::Table(rows) => {
            // a:tbl sits below a:graphic/a:graphicData
            if let Some(Frame::GraphicFrame(slot)) = stack
                .iter_mut()
                .rev()
                .find(|f| matches!(f, Frame::GraphicFrame(_)))
            {
                *slot = Some(Table { rows });
            }
        }
        Frame::Row(cells) => {
            if let Some(Frame::Table(rows)) = stack.last_mut() {
                rows.push(Row { cells });
            }
        }
        Frame::Cell(text_frame) => {
            if let Some(Frame::Row(cells)) = stack.last_mut() {
                cells.push(Cell { text_frame });
            }
        }
        Frame::Body(paragraphs) => {
            if let Some(Frame::Sp(slot) | Frame::Cell(slot)) = stack.last_mut() {
                *slot = Some(TextFrame::new(paragraphs));
            }
        }
        Frame::Paragraph(runs) => {
            if let Some(Frame::Body(paragraphs)) = stack.last_mut() {
                paragraphs.push(Paragraph::new(runs));
            }
        }
        Frame::Run(index) => {
            if let Some(Frame::Paragraph(runs)) = stack.last_mut() {
                let anchor = &anchors[index];
                runs.push(Run::new(
                    RunKey(index),
                    anchor.text.clone(),
                    anchor.font_size,
                ));
            }
        }
        Frame::Seek | Frame::Graphic | Frame::RunText(_) | Frame::Ignored => {}
    }
}

fn push_shape(stack: &mut [Frame], shape: Shape) {
    if let Some(Frame::Tree(shapes) | Frame::Group(shapes)) = stack.last_mut() {
        shapes.push(shape);
    }
}

/// Remember the `a:rPr` event of a run and its font size.
fn record_props(anchor: &mut RunAnchor, props: &BytesStart, index: usize) -> Result<()> {
    anchor.props_event = Some(index);
    for attr in props.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(format!("Bad run properties: {}", e)))?;
        if attr.key.as_ref() == b"sz" {
            // Hundredths of a point
            anchor.font_size = String::from_utf8_lossy(&attr.value)
                .parse::<f64>()
                .ok()
                .map(|sz| sz / 100.0);
        }
    }
    Ok(())
}

/// Copy of `props` with its `sz` attribute set to `size` points.
fn with_font_size(props: &BytesStart, size: f64) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(props.name().as_ref()).into_owned();
    let sz = ((size * 100.0).round() as i64).to_string();

    let mut updated = BytesStart::new(name);
    let mut has_size = false;
    for attr in props.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(format!("Bad run properties: {}", e)))?;
        if attr.key.as_ref() == b"sz" {
            updated.push_attribute(("sz", sz.as_str()));
            has_size = true;
        } else {
            updated.push_attribute(attr);
        }
    }
    if !has_size {
        updated.push_attribute(("sz", sz.as_str()));
    }

    Ok(updated)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{picture, run, slide_xml, table, text_shape};

    fn texts(part: &SlidePart) -> Vec<String> {
        part.slide().run_texts()
    }

    fn first_run_mut(part: &mut SlidePart) -> &mut Run {
        match &mut part.slide_mut().shapes[0] {
            Shape::Text(frame) => &mut frame.paragraphs[0].runs[0],
            other => panic!("expected text shape, got {:?}", other),
        }
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_parse_shape_kinds() {
        let xml = slide_xml(&[
            text_shape(&[&[run("Title", Some(4400))]]),
            picture(),
            r#"<p:sp><p:nvSpPr><p:cNvPr id="9" name="Line"/></p:nvSpPr><p:spPr/></p:sp>"#
                .to_string(),
            format!(
                "<p:grpSp><p:nvGrpSpPr/><p:grpSpPr/>{}{}</p:grpSp>",
                table(&[&["A", "B"], &["C", "D"]]),
                picture()
            ),
        ]);
        let part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();
        let shapes = &part.slide().shapes;

        assert_eq!(shapes.len(), 4);
        assert!(matches!(shapes[0], Shape::Text(_)));
        assert_eq!(shapes[1], Shape::Opaque);
        assert_eq!(shapes[2], Shape::Opaque);
        let Shape::Group(children) = &shapes[3] else {
            panic!("expected group");
        };
        assert_eq!(children.len(), 2);
        let Shape::Table(table) = &children[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].cells.len(), 2);
        assert_eq!(children[1], Shape::Opaque);

        assert_eq!(texts(&part), vec!["Title", "A", "B", "C", "D"]);
    }

    #[test]
    fn test_runs_and_sizes() {
        let xml = slide_xml(&[text_shape(&[
            &[run("Hello ", Some(2400)), run("World", None)],
            &[run("Fish & Chips", Some(1800))],
        ])]);
        let part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();

        let Shape::Text(frame) = &part.slide().shapes[0] else {
            panic!("expected text shape");
        };
        assert_eq!(frame.paragraphs.len(), 2);
        assert_eq!(frame.paragraphs[0].text(), "Hello World");
        assert_eq!(frame.paragraphs[0].runs[0].font_size, Some(24.0));
        assert_eq!(frame.paragraphs[0].runs[1].font_size, None);
        assert_eq!(frame.paragraphs[1].runs[0].text, "Fish & Chips");
    }

    #[test]
    fn test_fields_and_breaks_are_not_runs() {
        let xml = slide_xml(&[format!(
            "<p:sp><p:txBody><a:bodyPr/><a:p>{}<a:br/><a:fld id=\"{{1}}\" type=\"slidenum\"><a:t>3</a:t></a:fld></a:p></p:txBody></p:sp>",
            run("Page", None)
        )]);
        let part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();
        assert_eq!(texts(&part), vec!["Page"]);
    }

    #[test]
    fn test_unmodified_part_round_trips_exactly() {
        let xml = slide_xml(&[
            text_shape(&[&[run("  spaced  ", Some(2000)), run("x < y", None)]]),
            table(&[&["A", ""]]),
        ]);
        let part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();

        assert!(!part.is_modified());
        assert_eq!(String::from_utf8(part.to_xml().unwrap()).unwrap(), xml);
    }

    #[test]
    fn test_edited_run_written_back() {
        let xml = slide_xml(&[text_shape(&[&[
            run("Salt & Pepper", Some(2200)),
            run("kept", Some(2200)),
        ]])]);
        let mut part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();

        let run = first_run_mut(&mut part);
        run.text = "Sel <et> poivre".to_string();
        run.font_size = Some(18.5);
        assert!(part.is_modified());

        let written = String::from_utf8(part.to_xml().unwrap()).unwrap();
        assert!(written.contains("Sel &lt;et&gt; poivre"));
        assert!(written.contains(r#"sz="1850""#));
        assert!(written.contains(r#"sz="2200""#));

        let reparsed = SlidePart::parse("ppt/slides/slide1.xml", 1, &written).unwrap();
        assert_eq!(texts(&reparsed), vec!["Sel <et> poivre", "kept"]);
        let Shape::Text(frame) = &reparsed.slide().shapes[0] else {
            panic!("expected text shape");
        };
        assert_eq!(frame.paragraphs[0].runs[0].font_size, Some(18.5));
        assert_eq!(frame.paragraphs[0].runs[1].font_size, Some(22.0));
    }

    #[test]
    fn test_other_attributes_preserved_when_resizing() {
        let xml = slide_xml(&[
            r#"<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" sz="3000" b="1" dirty="0"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill></a:rPr><a:t>Bold</a:t></a:r></a:p></p:txBody></p:sp>"#
                .to_string(),
        ]);
        let mut part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();
        first_run_mut(&mut part).font_size = Some(20.0);

        let written = String::from_utf8(part.to_xml().unwrap()).unwrap();
        assert!(written.contains(
            r#"<a:rPr lang="en-US" sz="2000" b="1" dirty="0"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill></a:rPr>"#
        ));
    }

    #[test]
    fn test_empty_text_element_gets_a_slot() {
        let xml = slide_xml(&[
            r#"<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"/><a:t/></a:r></a:p></p:txBody></p:sp>"#
                .to_string(),
        ]);
        let mut part = SlidePart::parse("ppt/slides/slide1.xml", 1, &xml).unwrap();
        assert_eq!(texts(&part), vec![""]);

        first_run_mut(&mut part).text = "filled".to_string();
        let written = String::from_utf8(part.to_xml().unwrap()).unwrap();
        assert!(written.contains("<a:t>filled</a:t>"));
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let result = SlidePart::parse("ppt/slides/slide1.xml", 1, "<p:sld><p:cSld></p:sld>");
        assert!(matches!(result, Err(Error::XmlError(_))));
    }
}

//! Minimal in-memory PPTX packages for tests.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Bytes stored for the picture part, checked for pass-through.
pub const MEDIA_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";

/// An `a:r` element. `sz` is in hundredths of a point.
pub fn run(text: &str, sz: Option<u32>) -> String {
    let size = sz.map(|s| format!(r#" sz="{}""#, s)).unwrap_or_default();
    format!(
        r#"<a:r><a:rPr lang="en-US"{} dirty="0"/><a:t>{}</a:t></a:r>"#,
        size,
        escape(text)
    )
}

/// A text body holding the given paragraphs of runs.
fn text_body(tag: &str, paragraphs: &[&[String]]) -> String {
    let mut xml = format!("<{}><a:bodyPr/><a:lstStyle/>", tag);
    for runs in paragraphs {
        xml.push_str("<a:p>");
        for r in runs.iter() {
            xml.push_str(r);
        }
        xml.push_str(r#"<a:endParaRPr lang="en-US" dirty="0"/></a:p>"#);
    }
    xml.push_str(&format!("</{}>", tag));
    xml
}

/// A `p:sp` text shape.
pub fn text_shape(paragraphs: &[&[String]]) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Text 1"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/>{}</p:sp>"#,
        text_body("p:txBody", paragraphs)
    )
}

/// A `p:pic` picture shape.
pub fn picture() -> String {
    r#"<p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture 3" descr="Logo"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId9"/></p:blipFill><p:spPr/></p:pic>"#
        .to_string()
}

/// A `p:graphicFrame` holding a table, one run per cell.
pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="5" name="Table 4"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="0" y="0"/><a:ext cx="100" cy="100"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr/><a:tblGrid><a:gridCol w="100"/></a:tblGrid>"#,
    );
    for cells in rows {
        xml.push_str(r#"<a:tr h="100">"#);
        for text in cells.iter() {
            let runs = vec![run(text, Some(1800))];
            xml.push_str(&format!(
                "<a:tc>{}<a:tcPr/></a:tc>",
                text_body("a:txBody", &[runs.as_slice()])
            ));
        }
        xml.push_str("</a:tr>");
    }
    xml.push_str("</a:tbl></a:graphicData></a:graphic></p:graphicFrame>");
    xml
}

/// A complete slide part around the given shapes.
pub fn slide_xml(shapes: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>",
        NAMESPACES,
        shapes.concat()
    )
}

/// Zip the given parts, in order. Media parts are stored, XML is deflated.
pub fn zip_parts(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        let method = if name.starts_with("ppt/media/") {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = FileOptions::default().compression_method(method);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A PPTX package whose slides appear in the given order.
pub fn build_pptx(slides: &[String]) -> Vec<u8> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
    );
    let mut sld_ids = String::new();
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
    );

    for i in 0..slides.len() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            n
        ));
        sld_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
            n + 1,
            SLIDE_REL,
            n
        ));
    }
    content_types.push_str("</Types>");
    rels.push_str("</Relationships>");

    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#,
        NAMESPACES, sld_ids
    );
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#;

    let slide_names: Vec<String> = (1..=slides.len())
        .map(|n| format!("ppt/slides/slide{}.xml", n))
        .collect();

    let mut parts: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", content_types.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        ("ppt/presentation.xml", presentation.as_bytes()),
        ("ppt/_rels/presentation.xml.rels", rels.as_bytes()),
    ];
    for (name, xml) in slide_names.iter().zip(slides) {
        parts.push((name.as_str(), xml.as_bytes()));
    }
    parts.push(("ppt/media/image1.png", MEDIA_BYTES));

    zip_parts(&parts)
}

/// Write a PPTX package to `path`.
pub fn write_pptx(path: impl AsRef<Path>, slides: &[String]) {
    std::fs::write(path, build_pptx(slides)).unwrap();
}

/// A one-slide deck with a single text run.
pub fn single_run_deck(text: &str, sz: Option<u32>) -> Vec<u8> {
    let runs = vec![run(text, sz)];
    build_pptx(&[slide_xml(&[text_shape(&[runs.as_slice()])])])
}

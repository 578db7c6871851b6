//! PPTX package reading and writing.

use crate::slide::{local_name, SlidePart};
use deck_core::{Error, PresentationFormat, Result, Slide};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Largest buffer reserved up front from an entry's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// One file inside the package, as read.
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    compression: CompressionMethod,
    is_dir: bool,
    data: Vec<u8>,
}

/// An opened PPTX deck.
///
/// All package parts are held in memory. Slide parts are parsed into shape
/// trees; everything else is written back untouched on save.
#[derive(Debug, Clone)]
pub struct Deck {
    entries: Vec<PackageEntry>,
    slides: Vec<SlidePart>,
}

impl Deck {
    /// Open a PPTX file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening {}", path.display());
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Read a PPTX package from memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        match PresentationFormat::from_magic(&data) {
            Some(PresentationFormat::Pptx) => {}
            Some(PresentationFormat::Ppt) => {
                return Err(Error::UnsupportedFormat(
                    "legacy PPT files cannot be rewritten, save the deck as .pptx first"
                        .to_string(),
                ));
            }
            None => {
                return Err(Error::UnsupportedFormat(
                    "not a PPTX (ZIP) package".to_string(),
                ));
            }
        }

        let entries = read_entries(data)?;
        let mut deck = Self {
            entries,
            slides: Vec::new(),
        };

        let slide_order = deck.get_slide_order()?;
        for (idx, slide_path) in slide_order.iter().enumerate() {
            let xml = deck.read_xml(slide_path)?;
            deck.slides.push(SlidePart::parse(slide_path.as_str(), idx + 1, &xml)?);
        }

        log::debug!("Found {} slides", deck.slides.len());
        Ok(deck)
    }

    /// Number of slides.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Slides in presentation order.
    pub fn slides(&self) -> impl Iterator<Item = &Slide> {
        self.slides.iter().map(|part| part.slide())
    }

    /// Mutable slides in presentation order.
    pub fn slides_mut(&mut self) -> impl Iterator<Item = &mut Slide> {
        self.slides.iter_mut().map(|part| part.slide_mut())
    }

    /// Parsed slide parts in presentation order.
    pub fn slide_parts(&self) -> &[SlidePart] {
        &self.slides
    }

    /// Raw bytes of a package part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Serialize the package, writing back edited slides.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut rewritten: HashMap<&str, Vec<u8>> = HashMap::new();
        for part in self.slides.iter().filter(|p| p.is_modified()) {
            log::debug!("Rewriting {}", part.path());
            rewritten.insert(part.path(), part.to_xml()?);
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default().compression_method(method);

            if entry.is_dir {
                writer
                    .add_directory(entry.name.as_str(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", entry.name, e)))?;
                continue;
            }

            let data = rewritten
                .get(entry.name.as_str())
                .map(Vec::as_slice)
                .unwrap_or(entry.data.as_slice());
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", entry.name, e)))?;
            writer.write_all(data)?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Save the deck to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        log::debug!("Saved {}", path.display());
        Ok(())
    }

    /// Get the ordered list of slide paths.
    ///
    /// The order comes from `p:sldIdLst` in presentation.xml. Packages
    /// without one fall back to the slide relationships sorted by number.
    fn get_slide_order(&self) -> Result<Vec<String>> {
        let rels = self.read_relationships()?;
        let slide_rels: HashMap<&str, &Relationship> = rels
            .iter()
            .filter(|r| r.rel_type.ends_with("/slide"))
            .map(|r| (r.id.as_str(), r))
            .collect();

        let listed: Vec<String> = self
            .read_slide_ids()?
            .iter()
            .filter_map(|id| slide_rels.get(id.as_str()))
            .map(|r| resolve_target(&r.target))
            .collect();
        if !listed.is_empty() {
            return Ok(listed);
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .values()
            .map(|r| {
                let order_num = extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
                (resolve_target(&r.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse the presentation relationships.
    fn read_relationships(&self) -> Result<Vec<Relationship>> {
        let rels_content = self.read_xml(PRESENTATION_RELS_PATH)?;
        let mut rels = Vec::new();

        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let mut rel = Relationship::default();
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).to_string();
                        match attr.key.as_ref() {
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            b"Id" => rel.id = value,
                            _ => {}
                        }
                    }
                    rels.push(rel);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(rels)
    }

    /// Relationship ids of `p:sldId` entries, in presentation order.
    fn read_slide_ids(&self) -> Result<Vec<String>> {
        let content = match self.read_xml(PRESENTATION_PATH) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("No usable presentation.xml ({}), ordering slides by name", e);
                return Ok(Vec::new());
            }
        };

        let mut ids = Vec::new();
        let mut reader = Reader::from_str(&content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sldId" =>
                {
                    // r:id, not the numeric id attribute
                    let rel_id = e.attributes().flatten().find(|attr| {
                        let key = attr.key.as_ref();
                        key != b"id" && local_name(key) == b"id"
                    });
                    if let Some(attr) = rel_id {
                        ids.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing presentation.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(ids)
    }

    /// Read a package part as UTF-8 text.
    fn read_xml(&self, path: &str) -> Result<String> {
        let data = self
            .part(path)
            .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", path)))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::CorruptedFile(format!("'{}' is not valid UTF-8: {}", path, e)))
    }
}

/// A relationship from presentation.xml.rels.
#[derive(Debug, Default)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Read every entry of the archive into memory, keeping their order.
fn read_entries(data: Vec<u8>) -> Result<Vec<PackageEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;

        let mut data = Vec::with_capacity(prealloc_hint(file.size()));
        file.read_to_end(&mut data)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", file.name(), e)))?;

        entries.push(PackageEntry {
            name: file.name().to_string(),
            compression: file.compression(),
            is_dir: file.is_dir(),
            data,
        });
    }

    Ok(entries)
}

/// Initial capacity for an entry. The declared size comes from the archive
/// header and is not trusted beyond [`MAX_PREALLOC`].
fn prealloc_hint(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOC) as usize
}

/// Resolve a relationship target relative to the `ppt/` folder.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    // Remove common extensions first
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    // Try to find digits at the end
    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

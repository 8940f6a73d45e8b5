//! Per-extension document loading.
//!
//! Turns an uploaded file into zero or more [`TextBlock`]s. The loader is
//! selected by file extension; a file whose matched loader fails is retried
//! with the plain-text fallback before the failure is reported. Unknown
//! extensions go straight to the fallback and report
//! [`Error::UnsupportedFormat`] when the bytes are not valid UTF-8 either.
//!
//! | Extension | Strategy |
//! |-----------|----------|
//! | `txt`, `md` | whole file as one block |
//! | `csv` | one block per record, `header: value` lines |
//! | `json` | one block per array item (`content` field), or the document itself |
//! | `pdf` | `pdf-extract`, one block |
//! | `docx`, `doc` | ZIP + `word/document.xml` text runs |
//! | `xlsx`, `xls` | ZIP + shared strings, one block per worksheet |
//! | `html`, `htm`, `xml` | tag-stripped character data |
//!
//! Every block's metadata carries `file_name`, `file_extension`, `file_path`,
//! and a human-readable `type` label; format-specific loaders add their own
//! keys (`row`, `sheet`, `item`).

use std::io::Read;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::Error;
use crate::models::TextBlock;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Load a file into text blocks, dispatching on its extension.
pub fn load_file(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match load_by_extension(path, &extension) {
        Ok(blocks) => Ok(attach_file_metadata(blocks, path, &extension)),
        Err(primary) => {
            tracing::warn!(
                extension = %extension,
                error = %primary,
                "loader failed, retrying with plain-text fallback"
            );
            match load_plain_text(path) {
                Ok(blocks) => Ok(attach_file_metadata(blocks, path, &extension)),
                Err(_) => Err(primary),
            }
        }
    }
}

/// Human-readable label for a file extension, stored in document metadata.
pub fn type_label(extension: &str) -> &'static str {
    match extension {
        "pdf" => "PDF document",
        "txt" | "md" => "Text file",
        "csv" => "CSV data",
        "xlsx" | "xls" => "Excel spreadsheet",
        "docx" | "doc" => "Word document",
        "json" => "JSON data",
        "html" | "htm" => "HTML document",
        "xml" => "XML document",
        _ => "Unknown format",
    }
}

fn load_by_extension(path: &Path, extension: &str) -> Result<Vec<TextBlock>, Error> {
    let result = match extension {
        "txt" | "md" => load_plain_text(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "pdf" => load_pdf(path),
        "docx" | "doc" => load_docx(path),
        "xlsx" | "xls" => load_xlsx(path),
        "html" | "htm" | "xml" => load_markup(path),
        other => {
            // No specific loader; a plain UTF-8 read is the generic fallback.
            return load_plain_text(path)
                .map_err(|_| Error::UnsupportedFormat(other.to_string()));
        }
    };
    result
}

fn unreadable_text(extension: &str) -> Error {
    Error::Loader {
        extension: extension.to_string(),
        message: "file is not valid UTF-8 text".to_string(),
    }
}

fn loader_err(extension: &str, message: impl ToString) -> Error {
    Error::Loader {
        extension: extension.to_string(),
        message: message.to_string(),
    }
}

fn attach_file_metadata(blocks: Vec<TextBlock>, path: &Path, extension: &str) -> Vec<TextBlock> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let label = type_label(extension);

    blocks
        .into_iter()
        .map(|mut block| {
            let meta = &mut block.metadata;
            meta.entry("file_name".to_string())
                .or_insert_with(|| json!(file_name.as_str()));
            meta.entry("file_extension".to_string())
                .or_insert_with(|| json!(extension));
            meta.entry("file_path".to_string())
                .or_insert_with(|| json!(path.display().to_string()));
            meta.entry("type".to_string()).or_insert_with(|| json!(label));
            block
        })
        .collect()
}

// ============ Plain text ============

fn load_plain_text(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let bytes = std::fs::read(path).map_err(|e| loader_err("txt", e))?;
    let text = String::from_utf8(bytes).map_err(|_| unreadable_text("txt"))?;
    Ok(vec![TextBlock {
        text,
        metadata: Map::new(),
    }])
}

// ============ CSV ============

fn load_csv(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| loader_err("csv", e))?;

    let headers = reader
        .headers()
        .map_err(|e| loader_err("csv", e))?
        .clone();

    let mut blocks = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| loader_err("csv", e))?;
        let text = record
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let header = headers.get(i).unwrap_or("");
                format!("{}: {}", header, field)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut metadata = Map::new();
        metadata.insert("row".to_string(), json!(row));
        blocks.push(TextBlock { text, metadata });
    }
    Ok(blocks)
}

// ============ JSON ============

fn load_json(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let bytes = std::fs::read(path).map_err(|e| loader_err("json", e))?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| loader_err("json", e))?;

    match value {
        Value::Array(items) => {
            let mut blocks = Vec::new();
            for (position, entry) in items.into_iter().enumerate() {
                let text = match &entry {
                    Value::Object(map) => map
                        .get("content")
                        .and_then(|c| c.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| entry.to_string()),
                    other => other.to_string(),
                };
                let mut metadata = Map::new();
                metadata.insert("item".to_string(), json!(position));
                if let Value::Object(map) = &entry {
                    for (key, value) in map {
                        if key != "content" {
                            metadata.insert(key.clone(), value.clone());
                        }
                    }
                }
                blocks.push(TextBlock { text, metadata });
            }
            Ok(blocks)
        }
        other => Ok(vec![TextBlock {
            text: other.to_string(),
            metadata: Map::new(),
        }]),
    }
}

// ============ PDF ============

fn load_pdf(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let bytes = std::fs::read(path).map_err(|e| loader_err("pdf", e))?;
    let text =
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| loader_err("pdf", e))?;
    Ok(vec![TextBlock {
        text,
        metadata: Map::new(),
    }])
}

// ============ OOXML (docx / xlsx) ============

fn open_archive(path: &Path, extension: &str) -> Result<zip::ZipArchive<std::io::Cursor<Vec<u8>>>, Error> {
    let bytes = std::fs::read(path).map_err(|e| loader_err(extension, e))?;
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| loader_err(extension, e))
}

fn read_zip_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>,
    name: &str,
    extension: &str,
) -> Result<Vec<u8>, Error> {
    let entry = archive
        .by_name(name)
        .map_err(|e| loader_err(extension, e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| loader_err(extension, e))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(loader_err(
            extension,
            format!("ZIP entry {} exceeds size limit", name),
        ));
    }
    Ok(out)
}

fn load_docx(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let mut archive = open_archive(path, "docx")?;
    let xml = read_zip_entry(&mut archive, "word/document.xml", "docx")?;

    let mut text = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        text.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                // Paragraph boundaries become newlines so chunking does not
                // glue unrelated paragraphs together mid-word.
                if e.local_name().as_ref() == b"p" && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(loader_err("docx", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(vec![TextBlock {
        text,
        metadata: Map::new(),
    }])
}

fn load_xlsx(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let mut archive = open_archive(path, "xlsx")?;
    let shared_strings = read_shared_strings(&mut archive)?;

    let mut sheet_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    sheet_names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut blocks = Vec::new();
    for (sheet, name) in sheet_names.into_iter().enumerate() {
        let xml = read_zip_entry(&mut archive, &name, "xlsx")?;
        let text = extract_sheet_cells(&xml, &shared_strings)?;
        if text.is_empty() {
            continue;
        }
        let mut metadata = Map::new();
        metadata.insert("sheet".to_string(), json!(sheet + 1));
        blocks.push(TextBlock { text, metadata });
    }
    Ok(blocks)
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>,
) -> Result<Vec<String>, Error> {
    // A workbook with only inline or numeric cells has no shared strings part.
    let xml = match read_zip_entry(archive, "xl/sharedStrings.xml", "xlsx") {
        Ok(xml) => xml,
        Err(_) => return Ok(Vec::new()),
    };

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = true;
                } else if in_si && e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        strings.push(te.unescape().unwrap_or_default().into_owned());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(loader_err("xlsx", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn extract_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, Error> {
    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if !s.is_empty() {
                    if cell_is_shared_str {
                        if let Ok(i) = s.parse::<usize>() {
                            if let Some(shared) = shared_strings.get(i) {
                                cells.push(shared.clone());
                            }
                        }
                    } else {
                        cells.push(s.to_string());
                    }
                }
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(loader_err("xlsx", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}

// ============ HTML / XML ============

fn load_markup(path: &Path) -> Result<Vec<TextBlock>, Error> {
    let bytes = std::fs::read(path).map_err(|e| loader_err("html", e))?;

    let mut text = String::new();
    let mut reader = quick_xml::Reader::from_reader(bytes.as_slice());
    let config = reader.config_mut();
    config.trim_text(true);
    // Real-world HTML is rarely well-formed XML.
    config.check_end_names = false;
    let mut buf = Vec::new();
    let mut skip_depth = 0usize;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"script" || name.as_ref() == b"style" {
                    skip_depth += 1;
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = e.local_name();
                if (name.as_ref() == b"script" || name.as_ref() == b"style") && skip_depth > 0 {
                    skip_depth -= 1;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if skip_depth == 0 => {
                let fragment = te.unescape().unwrap_or_default();
                let fragment = fragment.trim();
                if !fragment.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(fragment);
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(loader_err("html", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(vec![TextBlock {
        text,
        metadata: Map::new(),
    }])
}

//! Source loading for delimited text and spreadsheet workbooks.
//!
//! Every loader returns a raw [`Frame`] whose cells are untyped text (or the
//! native cell type a workbook provides). Parsed tables are memoized in a
//! [`LoadCache`] keyed by the SHA-256 digest of the source bytes, so repeated
//! passes over the same upload skip the parse.

use std::{collections::HashMap, io::Cursor, path::Path};

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use encoding_rs::Encoding;
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::{
    data::{Value, text_cell},
    error::DashboardError,
    frame::Frame,
    io_utils,
};

/// Bundled sample export used when no input file is supplied.
pub const SAMPLE_CSV: &str = include_str!("../assets/sample_mis.csv");

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited { delimiter: u8 },
    Workbook,
}

impl SourceFormat {
    pub fn detect(path: &Path, delimiter: Option<u8>) -> Self {
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_workbook {
            SourceFormat::Workbook
        } else {
            SourceFormat::Delimited {
                delimiter: io_utils::resolve_input_delimiter(path, delimiter),
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: encoding_rs::UTF_8,
        }
    }
}

pub fn parse_source(bytes: &[u8], format: SourceFormat, encoding: &'static Encoding) -> Result<Frame> {
    match format {
        SourceFormat::Delimited { delimiter } => parse_delimited(bytes, delimiter, encoding),
        SourceFormat::Workbook => parse_workbook(bytes),
    }
}

pub fn parse_delimited(bytes: &[u8], delimiter: u8, encoding: &'static Encoding) -> Result<Frame> {
    let text = io_utils::decode_bytes(bytes, encoding)?;
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter);
    let headers = reader
        .headers()
        .context("Reading header row")?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut frame = Frame::new(unique_headers(headers));
    let width = frame.width();

    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let mut row = record.iter().take(width).map(text_cell).collect::<Vec<_>>();
        row.resize(width, None);
        frame.push_row(row)?;
    }
    debug!(
        "Parsed delimited source with {} column(s) and {} row(s)",
        frame.width(),
        frame.len()
    );
    Ok(frame)
}

/// Reads the first sheet of a workbook; the first row supplies the headers.
pub fn parse_workbook(bytes: &[u8]) -> Result<Frame> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).context("Opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DashboardError::EmptyWorkbook)?
        .context("Reading first sheet")?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Frame::default());
    };
    let headers = header_row
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>();
    let mut frame = Frame::new(unique_headers(headers));
    for row in rows {
        frame.push_row(row.iter().map(workbook_cell).collect())?;
    }
    debug!(
        "Parsed workbook sheet with {} column(s) and {} row(s)",
        frame.width(),
        frame.len()
    );
    Ok(frame)
}

fn workbook_cell(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Float(f) => Some(Value::Number(*f)),
        Data::Int(i) => Some(Value::Number(*i as f64)),
        Data::Bool(b) => Some(Value::Text(b.to_string())),
        Data::DateTime(dt) => dt.as_datetime().map(Value::DateTime),
    }
}

/// Blank headers become `Unnamed: <idx>` and repeats gain a `.N` suffix.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                header
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

pub fn content_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Parsed tables keyed by the digest of their source bytes.
#[derive(Debug, Default)]
pub struct LoadCache {
    entries: HashMap<String, Frame>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parsed table for `bytes`, parsing only on a cache miss.
    pub fn get_or_parse(
        &mut self,
        bytes: &[u8],
        format: SourceFormat,
        encoding: &'static Encoding,
    ) -> Result<(String, Frame)> {
        let digest = content_digest(bytes);
        if let Some(frame) = self.entries.get(&digest) {
            debug!("Load cache hit for {digest}");
            return Ok((digest, frame.clone()));
        }
        let frame = parse_source(bytes, format, encoding)?;
        self.entries.insert(digest.clone(), frame.clone());
        Ok((digest, frame))
    }

    pub fn load_path(&mut self, path: &Path, options: &LoadOptions) -> Result<(String, Frame)> {
        let format = SourceFormat::detect(path, options.delimiter);
        match format {
            SourceFormat::Delimited { delimiter } => info!(
                "Loading '{}' with delimiter '{}'",
                path.display(),
                io_utils::printable_delimiter(delimiter)
            ),
            SourceFormat::Workbook => info!("Loading first sheet of workbook '{}'", path.display()),
        }
        let bytes = io_utils::read_input_bytes(path)?;
        self.get_or_parse(&bytes, format, options.encoding)
            .with_context(|| format!("Parsing {path:?}"))
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.entries.contains_key(digest)
    }

    pub fn invalidate(&mut self, digest: &str) -> bool {
        self.entries.remove(digest).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

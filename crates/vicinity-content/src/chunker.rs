//! Chunking policies.
//!
//! Two policies cover every source the engine ingests:
//!
//! - **Windowed text**: whitespace tokens are grouped greedily into windows
//!   of at most `window` tokens with no overlap; the last window may be
//!   shorter. Pre-extracted pages are joined with newlines first.
//! - **Tabular rows**: one chunk per CSV data row, each populated cell
//!   rendered as `"<Column>: <value>"` and joined with newlines. A
//!   [`TableTemplate`] may instead render each row through a sentence such
//!   as `"Bus stop '{stop_name}' is served by route(s) {Routes}."`, and may
//!   copy chosen columns into chunk metadata as typed values.
//!
//! Row handling is best-effort. A row shorter than the header omits the
//! missing fields; a record the CSV reader cannot decode, or one missing a
//! column declared required by the [`TableTemplate`], is skipped.

use crate::chunk::{Chunk, MetadataValue};

/// Default window size, in whitespace tokens.
pub const DEFAULT_WINDOW: usize = 300;

/// A raw unit of source material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUnit {
    /// Free text (plain-text or markdown file).
    Text {
        /// Source name, used as the chunk id prefix.
        source: String,
        /// Full text.
        text: String,
    },

    /// Text already split into pages by an external extractor.
    Pages {
        /// Source name, used as the chunk id prefix.
        source: String,
        /// Page texts in order.
        pages: Vec<String>,
    },

    /// A CSV document with a header row.
    Table {
        /// Source name, used as the chunk id prefix.
        source: String,
        /// Raw CSV content.
        csv: String,
    },
}

impl SourceUnit {
    /// Create a text unit.
    pub fn text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Create a pages unit.
    pub fn pages(source: impl Into<String>, pages: Vec<String>) -> Self {
        Self::Pages {
            source: source.into(),
            pages,
        }
    }

    /// Create a table unit.
    pub fn table(source: impl Into<String>, csv: impl Into<String>) -> Self {
        Self::Table {
            source: source.into(),
            csv: csv.into(),
        }
    }

    /// The source name.
    pub fn source(&self) -> &str {
        match self {
            Self::Text { source, .. } | Self::Pages { source, .. } | Self::Table { source, .. } => {
                source
            }
        }
    }
}

/// Row-level rules for tabular sources.
///
/// A row text template refers to cells as `{column}` or
/// `{column|fallback}`; column names match case-insensitively, and an
/// empty or missing cell renders as the fallback (empty when none is
/// given). Text outside braces is copied as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableTemplate {
    required: Vec<String>,
    text: Option<String>,
    metadata: Vec<String>,
}

impl TableTemplate {
    /// A template with no required columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a column that every kept row must populate.
    ///
    /// Column names are matched case-insensitively after trimming.
    pub fn require(mut self, column: impl Into<String>) -> Self {
        self.required.push(column.into().trim().to_lowercase());
        self
    }

    /// Render every row through `template` instead of `Column: value` lines.
    pub fn text(mut self, template: impl Into<String>) -> Self {
        self.text = Some(template.into());
        self
    }

    /// Copy `column` into each row's metadata, keyed by the header as
    /// written. Integers, floats, and `true`/`false` keep their type.
    pub fn metadata(mut self, column: impl Into<String>) -> Self {
        self.metadata.push(column.into().trim().to_lowercase());
        self
    }

    /// The required columns, normalized.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// The row text template, if any.
    pub fn text_template(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The metadata columns, normalized.
    pub fn metadata_columns(&self) -> &[String] {
        &self.metadata
    }
}

/// Turns [`SourceUnit`]s into [`Chunk`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    table: TableTemplate,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Chunker {
    /// Create a chunker with the given window size (clamped to at least 1).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            table: TableTemplate::default(),
        }
    }

    /// Set the template applied to tabular sources.
    pub fn with_table_template(mut self, template: TableTemplate) -> Self {
        self.table = template;
        self
    }

    /// The window size in tokens.
    pub fn window(&self) -> usize {
        self.window
    }

    /// The template applied to tabular sources.
    pub fn table_template(&self) -> &TableTemplate {
        &self.table
    }

    /// Chunk every unit, preserving unit order.
    pub fn chunk_all<I>(&self, units: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        units.into_iter().flat_map(|u| self.chunk(&u)).collect()
    }

    /// Chunk a single unit.
    pub fn chunk(&self, unit: &SourceUnit) -> Vec<Chunk> {
        match unit {
            SourceUnit::Text { source, text } => self.chunk_text(source, text, "text"),
            SourceUnit::Pages { source, pages } => {
                self.chunk_text(source, &pages.join("\n"), "pages")
            }
            SourceUnit::Table { source, csv } => self.chunk_table(source, csv),
        }
    }

    fn chunk_text(&self, source: &str, text: &str, kind: &str) -> Vec<Chunk> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        tokens
            .chunks(self.window)
            .enumerate()
            .map(|(ordinal, window)| {
                Chunk::new(format!("{source}#{ordinal}"), window.join(" "))
                    .with_metadata("source", source)
                    .with_metadata("kind", kind)
                    .with_metadata("ordinal", ordinal)
                    .with_metadata("tokens", window.len())
            })
            .collect()
    }

    fn chunk_table(&self, source: &str, csv: &str) -> Vec<Chunk> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(csv.as_bytes());

        let headers: Vec<String> = match reader.headers() {
            Ok(h) => h.iter().map(|c| c.trim().to_string()).collect(),
            Err(e) => {
                log::warn!("Skipping table {source}: unreadable header: {e}");
                return Vec::new();
            }
        };

        let normalized: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let mut required = Vec::with_capacity(self.table.required().len());
        for column in self.table.required() {
            match normalized.iter().position(|h| h == column) {
                Some(idx) => required.push(idx),
                None => {
                    log::warn!("Skipping table {source}: required column '{column}' is absent");
                    return Vec::new();
                }
            }
        }

        let labels: Vec<String> = headers.iter().map(|h| capitalize(h)).collect();
        let typed: Vec<(usize, &str)> = self
            .table
            .metadata_columns()
            .iter()
            .filter_map(|column| {
                let idx = normalized.iter().position(|h| h == column);
                if idx.is_none() {
                    log::debug!("Table {source} has no metadata column '{column}'");
                }
                idx.map(|i| (i, headers[i].as_str()))
            })
            .collect();
        let mut chunks = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("Skipping {source} row {row}: {e}");
                    continue;
                }
            };

            let missing_required = required
                .iter()
                .any(|&idx| record.get(idx).is_none_or(|v| v.trim().is_empty()));
            if missing_required {
                log::debug!("Skipping {source} row {row}: required value missing");
                continue;
            }

            let text = match self.table.text_template() {
                Some(template) => {
                    let cell = |name: &str| {
                        let name = name.trim().to_lowercase();
                        normalized
                            .iter()
                            .position(|h| *h == name)
                            .and_then(|idx| record.get(idx))
                            .map(str::trim)
                            .filter(|v| !v.is_empty())
                    };
                    render_row(template, cell)
                }
                None => labels
                    .iter()
                    .zip(record.iter())
                    .filter_map(|(label, value)| {
                        let value = value.trim();
                        (!value.is_empty()).then(|| format!("{label}: {value}"))
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            };

            if text.trim().is_empty() {
                continue;
            }

            let mut chunk = Chunk::new(format!("{source}#row-{row}"), text);
            for &(idx, key) in &typed {
                if let Some(value) = record.get(idx).map(str::trim).filter(|v| !v.is_empty()) {
                    chunk = chunk.with_metadata(key, typed_value(value));
                }
            }
            chunks.push(
                chunk
                    .with_metadata("source", source)
                    .with_metadata("kind", "table")
                    .with_metadata("row", row),
            );
        }

        chunks
    }
}

/// Substitute `{column}` and `{column|fallback}` placeholders.
fn render_row<'a>(template: &str, cell: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|c| open + c) else {
            break;
        };
        out.push_str(&rest[..open]);
        let inner = &rest[open + 1..close];
        let (column, fallback) = inner.split_once('|').unwrap_or((inner, ""));
        out.push_str(cell(column).unwrap_or(fallback));
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

/// A cell as the narrowest metadata type that holds it.
fn typed_value(value: &str) -> MetadataValue {
    if let Ok(n) = value.parse::<i64>() {
        return MetadataValue::Integer(n);
    }
    if let Some(f) = value.parse::<f64>().ok().filter(|f| f.is_finite()) {
        return MetadataValue::Float(f);
    }
    match value.to_ascii_lowercase().as_str() {
        "true" => MetadataValue::Bool(true),
        "false" => MetadataValue::Bool(false),
        _ => MetadataValue::Text(value.to_string()),
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

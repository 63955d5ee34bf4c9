#![forbid(unsafe_code)]

//! The CSV ledger (`downloads.csv`, header `Index,Title,URL`) and the error
//! ledger (`errors.csv`, header `Index,Kind,URL,Error`). Normal runs only
//! append; each appended row is flushed and fsynced before the next URL is
//! touched, so a crash mid-run leaves a prefix of whole rows and re-running
//! resumes cleanly. Maintenance passes rewrite the file wholesale after
//! taking a `.bak` copy.

use crate::links::PostKind;
use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

pub const LEDGER_HEADER: [&str; 3] = ["Index", "Title", "URL"];
pub const ERROR_HEADER: [&str; 4] = ["Index", "Kind", "URL", "Error"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub index: u32,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ErrorRow {
    pub index: u32,
    pub kind: PostKind,
    pub url: String,
    pub message: String,
}

/// What the orchestrator needs to resume: which indices and URLs exist, and
/// where numbering left off.
#[derive(Debug, Default)]
pub struct LedgerSummary {
    pub indices: HashSet<u32>,
    pub urls: HashSet<String>,
    pub max_index: u32,
}

impl LedgerSummary {
    pub fn next_index(&self) -> u32 {
        self.max_index + 1
    }
}

/// Loads the resume summary, tolerating a missing file (fresh archive) and
/// skipping rows whose index column is not numeric.
pub fn load_summary(path: &Path) -> Result<LedgerSummary> {
    let mut summary = LedgerSummary::default();
    for row in read_rows(path)? {
        summary.indices.insert(row.index);
        if !row.url.is_empty() {
            summary.urls.insert(row.url);
        }
        summary.max_index = summary.max_index.max(row.index);
    }
    Ok(summary)
}

/// Reads every well-formed row. Missing file yields an empty list; rows with
/// a non-numeric index or no columns are skipped, not fatal.
pub fn read_rows(path: &Path) -> Result<Vec<LedgerRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        let Some(raw_index) = record.get(0) else {
            continue;
        };
        let Ok(index) = raw_index.trim().parse::<u32>() else {
            continue;
        };
        rows.push(LedgerRow {
            index,
            title: record.get(1).unwrap_or("").to_string(),
            url: record.get(2).unwrap_or("").trim().to_string(),
        });
    }
    Ok(rows)
}

/// Loads an `Index -> Title` map, requiring both headers to be present
/// (case-insensitively). Header problems are input errors and fatal; bad
/// rows are merely skipped.
pub fn title_map(path: &Path) -> Result<BTreeMap<u32, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();
    let index_col = find_column(&headers, "index");
    let title_col = find_column(&headers, "title");
    let (Some(index_col), Some(title_col)) = (index_col, title_col) else {
        bail!(
            "{} must have 'Index' and 'Title' columns",
            path.display()
        );
    };

    let mut map = BTreeMap::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("reading {}", path.display()))?;
        let Some(raw_index) = record.get(index_col) else {
            continue;
        };
        let Ok(index) = raw_index.trim().parse::<u32>() else {
            continue;
        };
        let title = record.get(title_col).unwrap_or("").trim().to_string();
        map.insert(index, title);
    }
    Ok(map)
}

pub fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

/// Rewrites the whole ledger (header + rows). Used by the maintenance tools
/// after packing or merging.
pub fn write_rows(path: &Path, rows: &[LedgerRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("writing {}", path.display()))?;
    writer
        .write_record(LEDGER_HEADER)
        .context("writing ledger header")?;
    for row in rows {
        writer
            .write_record([row.index.to_string().as_str(), &row.title, &row.url])
            .with_context(|| format!("writing ledger row {}", row.index))?;
    }
    writer.flush().context("flushing ledger")?;
    Ok(())
}

/// Copies the ledger to `<name>.bak` before a destructive rewrite.
pub fn backup(path: &Path) -> Result<PathBuf> {
    let mut backup_name = path.as_os_str().to_owned();
    backup_name.push(".bak");
    let backup_path = PathBuf::from(backup_name);
    fs::copy(path, &backup_path)
        .with_context(|| format!("backing up {}", path.display()))?;
    Ok(backup_path)
}

/// Append handle for normal runs. Writes the header when creating the file
/// and fsyncs after every row.
pub struct LedgerWriter {
    file: File,
}

impl LedgerWriter {
    pub fn open_append(path: &Path) -> Result<Self> {
        let fresh = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let mut writer = Self { file };
        if fresh {
            writer.write_record(&LEDGER_HEADER)?;
        }
        Ok(writer)
    }

    pub fn append(&mut self, row: &LedgerRow) -> Result<()> {
        self.write_record(&[row.index.to_string().as_str(), &row.title, &row.url])
    }

    fn write_record(&mut self, fields: &[&str]) -> Result<()> {
        {
            let mut writer = csv::Writer::from_writer(&self.file);
            writer.write_record(fields).context("writing ledger row")?;
            writer.flush().context("flushing ledger row")?;
        }
        // Durability contract: the row is on disk before the next URL starts.
        self.file.sync_all().context("fsyncing ledger")?;
        Ok(())
    }
}

/// Appends one fully-quoted row to the error ledger, creating it (with
/// header) on first use.
pub fn append_error(path: &Path, row: &ErrorRow) -> Result<()> {
    let fresh = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(file);
    if fresh {
        writer
            .write_record(ERROR_HEADER)
            .context("writing error header")?;
    }
    writer
        .write_record([
            row.index.to_string().as_str(),
            row.kind.label(),
            &row.url,
            &row.message,
        ])
        .context("writing error row")?;
    writer.flush().context("flushing error ledger")?;
    Ok(())
}

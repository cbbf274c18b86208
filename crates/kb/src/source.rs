use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use reqwest::Client;
use tracing::debug;

use qna_core::Entry;

/// Where knowledge-base entries come from.
#[derive(Clone)]
pub enum SourceBackend {
    Sheet(SheetSource),
    File(FileSource),
    Static(Vec<Entry>),
}

/// Supplies the current ordered sequence of knowledge-base entries.
///
/// Backends share one narrow surface: `fetch` returns a fresh snapshot or an
/// error. Caching and refresh policy live in [`crate::EntryStore`], not here.
#[derive(Clone)]
pub struct EntrySource {
    backend: SourceBackend,
}

impl EntrySource {
    /// Remote sheet published as CSV over HTTP.
    pub fn sheet(url: impl Into<String>) -> Self {
        Self {
            backend: SourceBackend::Sheet(SheetSource {
                http: Client::new(),
                url: url.into(),
            }),
        }
    }

    /// Local `.json` (array of entries) or CSV file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: SourceBackend::File(FileSource { path: path.into() }),
        }
    }

    /// Fixed in-memory entries.
    pub fn fixed(entries: Vec<Entry>) -> Self {
        Self {
            backend: SourceBackend::Static(entries),
        }
    }

    /// `QNA_KB_URL` takes precedence over `QNA_KB_PATH`.
    pub fn from_env() -> Result<Self> {
        if let Ok(url) = env::var("QNA_KB_URL") {
            return Ok(Self::sheet(url));
        }
        if let Ok(path) = env::var("QNA_KB_PATH") {
            return Ok(Self::file(path));
        }
        Err(anyhow!(
            "no knowledge base configured: set QNA_KB_URL or QNA_KB_PATH"
        ))
    }

    pub async fn fetch(&self) -> Result<Vec<Entry>> {
        match &self.backend {
            SourceBackend::Sheet(source) => source.fetch().await,
            SourceBackend::File(source) => source.load(),
            SourceBackend::Static(entries) => Ok(entries.clone()),
        }
    }
}

#[derive(Clone)]
pub struct SheetSource {
    http: Client,
    url: String,
}

impl SheetSource {
    async fn fetch(&self) -> Result<Vec<Entry>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("sheet request failed: {}", self.url))?;
        if !response.status().is_success() {
            return Err(anyhow!("sheet returned status {}", response.status()));
        }
        let body = response.text().await.context("failed to read sheet body")?;
        let entries = parse_csv_entries(body.as_bytes())?;
        debug!(count = entries.len(), "fetched sheet entries");
        Ok(entries)
    }
}

#[derive(Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    fn load(&self) -> Result<Vec<Entry>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read knowledge base {}", self.path.display()))?;
        if is_json(&self.path) {
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid entry json in {}", self.path.display()))
        } else {
            parse_csv_entries(raw.as_bytes())
                .with_context(|| format!("invalid entry csv in {}", self.path.display()))
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Parse entries from CSV with `question`/`answer` columns, located by
/// header name case-insensitively. Rows missing either side are skipped.
pub fn parse_csv_entries<R: Read>(reader: R) -> Result<Vec<Entry>> {
    let mut reader = ReaderBuilder::new().from_reader(reader);
    let headers = reader.headers().context("missing csv headers")?.clone();
    let question_idx = find_column(&headers, "question")?;
    let answer_idx = find_column(&headers, "answer")?;
    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.context("invalid csv row")?;
        let question = record.get(question_idx).unwrap_or("").trim();
        let answer = record.get(answer_idx).unwrap_or("").trim();
        if question.is_empty() || answer.is_empty() {
            continue;
        }
        entries.push(Entry::new(question, answer));
    }
    Ok(entries)
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| anyhow!("csv is missing a {name} column"))
}

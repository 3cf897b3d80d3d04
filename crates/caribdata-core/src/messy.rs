//! Real-world "messy dataset" harvesting.
//!
//! Each catalog item is either a direct link to a spreadsheet or a landing
//! page to scan for one. Raw bytes are saved untouched under
//! `messy/raw/<slug>/`, then profiled for the kinds of problems teaching
//! datasets are collected for: merged cells, shifted header rows, ragged CSV
//! rows, odd delimiters. The run ends with a `_bundle.zip` that packs the
//! raw files with a README and the machine-readable report.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader, Xls, Xlsx};
use serde::Serialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::{MessyConfig, MessyItem};
use crate::error::BuildError;
use crate::http_client::RetryingClient;
use crate::model::{now_iso, Manifest, ManifestEntry};
use crate::source::{ErrorRecord, SourceError};
use crate::tidy;

/// Extensions treated as directly downloadable data files.
const FILE_EXTENSIONS: &[&str] = &[".xlsx", ".xls", ".csv"];

/// Per-sheet structure probe for Excel workbooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetProfile {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub merged_regions: usize,
    /// First row that looks like a header (mostly text cells), if any.
    pub header_row: Option<usize>,
    pub leading_blank_rows: usize,
}

/// Structure probe for delimited text files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvProfile {
    pub delimiter: String,
    pub rows: usize,
    pub min_fields: usize,
    pub max_fields: usize,
    pub blank_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileProfile {
    pub format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sheets: Vec<SheetProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<CsvProfile>,
}

/// One entry in the messy source's `_report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct MessyReportEntry {
    pub slug: String,
    pub name: String,
    pub source: String,
    pub license: String,
    pub url: String,
    pub resolved_url: String,
    pub saved_path: String,
    pub bytes: usize,
    pub sha256: String,
    pub content_type: Option<String>,
    pub expected_issues: Vec<String>,
    pub profile: FileProfile,
    pub retrieved_at: String,
}

/// Result of a full messy run; sidecars and the bundle are already on disk.
#[derive(Debug)]
pub struct MessyRun {
    pub report: Vec<MessyReportEntry>,
    pub errors: Vec<ErrorRecord>,
}

pub struct MessyFetcher<'a> {
    http: &'a RetryingClient,
    cfg: &'a MessyConfig,
    out_dir: PathBuf,
}

impl<'a> MessyFetcher<'a> {
    pub fn new(http: &'a RetryingClient, cfg: &'a MessyConfig, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            cfg,
            out_dir: out_dir.into(),
        }
    }

    /// Fetch, profile, and bundle every configured item. Item failures are
    /// recorded and skipped; only filesystem trouble aborts the run.
    pub async fn run(&self) -> Result<MessyRun, BuildError> {
        let messy_dir = self.out_dir.join("messy");
        let mut report = Vec::new();
        let mut errors = Vec::new();
        let mut saved: Vec<(String, PathBuf)> = Vec::new();

        for item in &self.cfg.items {
            match self.fetch_item(item, &messy_dir).await {
                Ok((entry, path)) => {
                    tracing::info!(slug = item.slug, bytes = entry.bytes, "messy item saved");
                    saved.push((entry.saved_path.clone(), path));
                    report.push(entry);
                }
                Err(error) => {
                    tracing::warn!(slug = item.slug, %error, "messy item failed");
                    errors.push(
                        ErrorRecord::new("messy", &error)
                            .with("slug", item.slug.clone())
                            .with("url", item.url.clone()),
                    );
                }
            }
        }

        let mut manifest = Manifest::new("messy");
        for entry in &report {
            manifest.items.push(
                ManifestEntry::new(entry.saved_path.clone(), profile_rows(&entry.profile))
                    .with("slug", entry.slug.clone())
                    .with("name", entry.name.clone())
                    .with("license", entry.license.clone())
                    .with("url", entry.url.clone())
                    .with("sha256", entry.sha256.clone()),
            );
        }

        tidy::write_json(&messy_dir.join("_report.json"), &report)?;
        tidy::write_manifest(&messy_dir, &manifest)?;
        tidy::write_errors(&messy_dir, &errors)?;
        tidy::write_dataset_card_once(&messy_dir, &dataset_card(&self.cfg.items))?;
        write_bundle(&messy_dir, &report, &manifest, &saved)?;

        Ok(MessyRun { report, errors })
    }

    async fn fetch_item(
        &self,
        item: &MessyItem,
        messy_dir: &Path,
    ) -> Result<(MessyReportEntry, PathBuf), SourceError> {
        let resolved_url = if is_file_url(&item.url) {
            item.url.clone()
        } else {
            self.discover_file_url(&item.url).await?
        };

        let response = self.http.get(&resolved_url).await?;
        let content_type = response.content_type;
        let bytes = response.body;
        if bytes.is_empty() {
            return Err(SourceError::shape(format!(
                "empty download from {resolved_url}"
            )));
        }

        let file_name = file_name_for(&resolved_url, &item.slug);
        let raw_dir = messy_dir.join("raw").join(&item.slug);
        std::fs::create_dir_all(&raw_dir)
            .map_err(|e| SourceError::io(format!("create {}: {e}", raw_dir.display())))?;
        let path = raw_dir.join(&file_name);
        std::fs::write(&path, &bytes)
            .map_err(|e| SourceError::io(format!("write {}: {e}", path.display())))?;

        let profile = profile_bytes(&file_name, &bytes);
        let entry = MessyReportEntry {
            slug: item.slug.clone(),
            name: item.name.clone(),
            source: item.source.clone(),
            license: item.license.clone(),
            url: item.url.clone(),
            resolved_url,
            saved_path: format!("raw/{}/{}", item.slug, file_name),
            bytes: bytes.len(),
            sha256: hex_digest(&bytes),
            content_type,
            expected_issues: item.expected_issues.clone(),
            profile,
            retrieved_at: now_iso(),
        };
        Ok((entry, path))
    }

    /// Fetch a landing page and take its first link to a spreadsheet file,
    /// resolved against the page URL.
    async fn discover_file_url(&self, page_url: &str) -> Result<String, SourceError> {
        let response = self.http.get(page_url).await?;
        let html = response.text();
        let href = find_spreadsheet_href(&html).ok_or_else(|| {
            SourceError::shape(format!("no spreadsheet link found on {page_url}"))
        })?;

        let base = Url::parse(page_url)
            .map_err(|e| SourceError::parse(format!("bad page url {page_url}: {e}")))?;
        let resolved = base
            .join(&href)
            .map_err(|e| SourceError::parse(format!("bad link '{href}' on {page_url}: {e}")))?;
        Ok(resolved.into())
    }
}

pub fn is_file_url(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());
    FILE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Scan raw HTML for the first `href` pointing at a data file. A character
/// scan is enough here; landing pages only need one usable link.
fn find_spreadsheet_href(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(offset) = lower[search_from..].find("href=") {
        let start = search_from + offset + "href=".len();
        let rest = &html[start..];
        let (href, consumed) = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote)?;
                (&body[..end], 1 + end)
            }
            // Bare attribute value, terminated by whitespace or tag close.
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                (&rest[..end], end)
            }
            None => return None,
        };
        let href_path = href.split(['?', '#']).next().unwrap_or(href);
        if FILE_EXTENSIONS
            .iter()
            .any(|ext| href_path.to_ascii_lowercase().ends_with(ext))
        {
            return Some(href.to_owned());
        }
        search_from = start + consumed;
    }
    None
}

/// Derive a safe local file name from the URL's last path segment.
fn file_name_for(url: &str, slug: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(str::to_owned))
        })
        .filter(|s| !s.is_empty());

    let Some(segment) = segment else {
        return format!("{slug}.dat");
    };
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);
    let sanitized: String = decoded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.trim_matches(['_', '.']).is_empty() {
        format!("{slug}.dat")
    } else {
        sanitized
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn profile_bytes(file_name: &str, bytes: &[u8]) -> FileProfile {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        profile_xlsx(bytes)
    } else if lower.ends_with(".xls") {
        profile_xls(bytes)
    } else if lower.ends_with(".csv") {
        profile_csv(bytes)
    } else {
        FileProfile {
            format: String::from("unknown"),
            sheets: Vec::new(),
            csv: None,
        }
    }
}

fn profile_xlsx(bytes: &[u8]) -> FileProfile {
    let Ok(mut workbook) = Xlsx::new(Cursor::new(bytes.to_vec())) else {
        return FileProfile {
            format: String::from("xlsx"),
            sheets: Vec::new(),
            csv: None,
        };
    };
    let _ = workbook.load_merged_regions();
    let merged: Vec<String> = workbook
        .merged_regions()
        .iter()
        .map(|region| region.0.clone())
        .collect();

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let sheets = names
        .into_iter()
        .filter_map(|name| {
            let range = workbook.worksheet_range(&name).ok()?;
            let merged_regions = merged.iter().filter(|sheet| **sheet == name).count();
            Some(sheet_profile(&name, &range, merged_regions))
        })
        .collect();

    FileProfile {
        format: String::from("xlsx"),
        sheets,
        csv: None,
    }
}

fn profile_xls(bytes: &[u8]) -> FileProfile {
    let Ok(mut workbook) = Xls::new(Cursor::new(bytes.to_vec())) else {
        return FileProfile {
            format: String::from("xls"),
            sheets: Vec::new(),
            csv: None,
        };
    };
    let names: Vec<String> = workbook.sheet_names().to_vec();
    let sheets = names
        .into_iter()
        .filter_map(|name| {
            let range = workbook.worksheet_range(&name).ok()?;
            // Merged regions are not exposed for the legacy binary format.
            Some(sheet_profile(&name, &range, 0))
        })
        .collect();

    FileProfile {
        format: String::from("xls"),
        sheets,
        csv: None,
    }
}

fn sheet_profile(name: &str, range: &Range<Data>, merged_regions: usize) -> SheetProfile {
    let rows: Vec<_> = range.rows().collect();
    let leading_blank_rows = rows
        .iter()
        .take_while(|row| row.iter().all(|cell| matches!(cell, Data::Empty)))
        .count();

    // The header is the first early row that is mostly text.
    let header_row = rows.iter().enumerate().take(10).find_map(|(index, row)| {
        let filled: Vec<_> = row
            .iter()
            .filter(|cell| !matches!(cell, Data::Empty))
            .collect();
        if filled.len() < 2 {
            return None;
        }
        let text = filled
            .iter()
            .filter(|cell| matches!(cell, Data::String(_)))
            .count();
        (text * 10 >= filled.len() * 6).then_some(index)
    });

    SheetProfile {
        name: name.to_owned(),
        rows: range.height(),
        cols: range.width(),
        merged_regions,
        header_row,
        leading_blank_rows,
    }
}

fn profile_csv(bytes: &[u8]) -> FileProfile {
    let text = String::from_utf8_lossy(bytes);
    let delimiter = sniff_delimiter(&text);
    let blank_lines = text.lines().filter(|line| line.trim().is_empty()).count();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(false)
        .from_reader(text.as_bytes());

    let mut rows = 0;
    let mut min_fields = usize::MAX;
    let mut max_fields = 0;
    // Variability over the head of the file is enough for a probe.
    for record in reader.records().take(200).flatten() {
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows += 1;
        min_fields = min_fields.min(record.len());
        max_fields = max_fields.max(record.len());
    }
    if rows == 0 {
        min_fields = 0;
    }

    FileProfile {
        format: String::from("csv"),
        sheets: Vec::new(),
        csv: Some(CsvProfile {
            delimiter: (delimiter as char).to_string(),
            rows,
            min_fields,
            max_fields,
            blank_lines,
        }),
    }
}

/// Pick the candidate delimiter that appears most often in the first
/// non-empty line.
fn sniff_delimiter(text: &str) -> u8 {
    let Some(line) = text.lines().find(|line| !line.trim().is_empty()) else {
        return b',';
    };
    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|candidate| line.bytes().filter(|b| b == candidate).count())
        .unwrap_or(b',')
}

fn dataset_card(items: &[MessyItem]) -> String {
    let mut card = String::from(
        "# Messy datasets\n\nReal-world spreadsheets collected for data-cleaning \
         practice. Files under `raw/` are byte-for-byte as published; see \
         `_report.json` for structure probes and checksums.\n\n",
    );
    for item in items {
        card.push_str(&format!("## {}\n\n- source: {}\n- license: {}\n", item.name, item.source, item.license));
        if !item.expected_issues.is_empty() {
            card.push_str(&format!("- expected issues: {}\n", item.expected_issues.join(", ")));
        }
        card.push('\n');
    }
    card
}

/// Pack the README, both metadata sidecars, and every saved raw file into
/// `_bundle.zip`. Members come from the run's saved list, never from walking
/// the directory, so stale files from old runs cannot leak in.
fn write_bundle(
    messy_dir: &Path,
    report: &[MessyReportEntry],
    manifest: &Manifest,
    saved: &[(String, PathBuf)],
) -> Result<(), BuildError> {
    let path = messy_dir.join("_bundle.zip");
    let file = std::fs::File::create(&path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    writer
        .start_file("README.md", options)
        .map_err(zip_io_error)?;
    writer.write_all(bundle_readme(report).as_bytes())?;

    writer
        .start_file("_report.json", options)
        .map_err(zip_io_error)?;
    let mut body = serde_json::to_vec_pretty(report)?;
    body.push(b'\n');
    writer.write_all(&body)?;

    writer
        .start_file("_manifest.json", options)
        .map_err(zip_io_error)?;
    let mut body = serde_json::to_vec_pretty(manifest)?;
    body.push(b'\n');
    writer.write_all(&body)?;

    for (relative, path) in saved {
        writer
            .start_file(relative.as_str(), options)
            .map_err(zip_io_error)?;
        writer.write_all(&std::fs::read(path)?)?;
    }

    writer.finish().map_err(zip_io_error)?;
    Ok(())
}

fn bundle_readme(report: &[MessyReportEntry]) -> String {
    let mut readme = String::from(
        "# Messy dataset bundle\n\nGenerated by caribdata. Raw files are under \
         `raw/`; `_report.json` lists sizes, checksums, and structure probes.\n\n",
    );
    for entry in report {
        readme.push_str(&format!("- `{}` ({} bytes) from {}\n", entry.saved_path, entry.bytes, entry.url));
    }
    readme
}

fn zip_io_error(error: zip::result::ZipError) -> BuildError {
    BuildError::Io(std::io::Error::other(error))
}

fn profile_rows(profile: &FileProfile) -> usize {
    if let Some(csv) = &profile.csv {
        return csv.rows;
    }
    profile.sheets.iter().map(|sheet| sheet.rows).sum()
}

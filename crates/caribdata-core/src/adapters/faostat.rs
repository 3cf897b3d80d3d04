//! FAOSTAT Food Balance Sheets adapter and fallback chain.
//!
//! Per country the chain is a small state machine, terminal on the first
//! non-empty normalized result:
//!
//! 1. primary API, once per configured domain (keyed-list `{"data": [...]}`);
//! 2. bulk ZIP mirrors in catalog order (first reachable, non-empty wins);
//! 3. HDX package search for a mirror the catalog does not know about.
//!
//! Every tier records its failures but never aborts the run; a country that
//! exhausts the chain simply produces no file.

use std::io::{Cursor, Read};

use serde_json::Value;

use crate::cache::DiskCache;
use crate::config::FaostatConfig;
use crate::countries::{area_name_for_iso3, m49_for_iso3};
use crate::http_client::RetryingClient;
use crate::model::FaoRow;
use crate::source::{ErrorRecord, FetchOutcome, Provenance, SourceError};

pub struct FaostatAdapter<'a> {
    http: &'a RetryingClient,
    cache: &'a DiskCache,
    cfg: &'a FaostatConfig,
    ttl_hours: u64,
}

impl<'a> FaostatAdapter<'a> {
    pub fn new(
        http: &'a RetryingClient,
        cache: &'a DiskCache,
        cfg: &'a FaostatConfig,
        ttl_hours: u64,
    ) -> Self {
        Self {
            http,
            cache,
            cfg,
            ttl_hours,
        }
    }

    /// Run the fallback chain for one country. Returns the normalized rows
    /// (possibly none) plus every error recorded along the way.
    pub async fn fetch_country(&self, iso3: &str) -> (Vec<FaoRow>, Vec<ErrorRecord>) {
        let mut errors = Vec::new();
        let mut rows = Vec::new();

        for domain in &self.cfg.domains {
            match self.fetch_api_domain(iso3, domain).await {
                Ok(FetchOutcome::Rows(mut domain_rows)) => rows.append(&mut domain_rows),
                Ok(FetchOutcome::Empty) => {
                    tracing::info!(iso3, domain, "faostat api returned no data");
                }
                Err(error) => {
                    tracing::warn!(iso3, domain, %error, "faostat api attempt failed");
                    errors.push(
                        ErrorRecord::new("api", &error)
                            .with("country_iso3", iso3)
                            .with("domain", domain.clone()),
                    );
                }
            }
        }

        if rows.is_empty() && !self.cfg.bulk_mirrors.is_empty() {
            rows = self.fetch_bulk_tier(iso3, &mut errors).await;
        }

        if rows.is_empty() {
            if let Some(search_url) = &self.cfg.hdx_search_url {
                rows = self.fetch_hdx_tier(iso3, search_url, &mut errors).await;
            }
        }

        if rows.is_empty() {
            errors.push(
                ErrorRecord::new("chain", "no tier produced data for this country")
                    .with("country_iso3", iso3),
            );
        }

        sort_rows(&mut rows);
        (rows, errors)
    }

    async fn fetch_bulk_tier(&self, iso3: &str, errors: &mut Vec<ErrorRecord>) -> Vec<FaoRow> {
        for mirror in &self.cfg.bulk_mirrors {
            match self.fetch_zip_rows(mirror, iso3, Provenance::Bulk).await {
                Ok(FetchOutcome::Rows(rows)) => {
                    tracing::info!(iso3, mirror, rows = rows.len(), "bulk mirror satisfied country");
                    return rows;
                }
                Ok(FetchOutcome::Empty) => {
                    tracing::info!(iso3, mirror, "bulk mirror had no matching rows");
                }
                Err(error) => {
                    tracing::warn!(iso3, mirror, %error, "bulk mirror failed");
                    errors.push(
                        ErrorRecord::new("bulk", &error)
                            .with("country_iso3", iso3)
                            .with("mirror", mirror.clone()),
                    );
                }
            }
        }
        Vec::new()
    }

    async fn fetch_hdx_tier(
        &self,
        iso3: &str,
        search_url: &str,
        errors: &mut Vec<ErrorRecord>,
    ) -> Vec<FaoRow> {
        let mirror = match self.discover_hdx_mirror(search_url).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                errors.push(
                    ErrorRecord::new("hdx", "no zip resource found in package search")
                        .with("country_iso3", iso3),
                );
                return Vec::new();
            }
            Err(error) => {
                errors.push(ErrorRecord::new("hdx", &error).with("country_iso3", iso3));
                return Vec::new();
            }
        };

        match self.fetch_zip_rows(&mirror, iso3, Provenance::Hdx).await {
            Ok(FetchOutcome::Rows(rows)) => rows,
            Ok(FetchOutcome::Empty) => Vec::new(),
            Err(error) => {
                errors.push(
                    ErrorRecord::new("hdx", &error)
                        .with("country_iso3", iso3)
                        .with("mirror", mirror),
                );
                Vec::new()
            }
        }
    }

    async fn fetch_api_domain(
        &self,
        iso3: &str,
        domain: &str,
    ) -> Result<FetchOutcome<Vec<FaoRow>>, SourceError> {
        let Some(m49) = m49_for_iso3(iso3) else {
            return Err(SourceError::shape(format!(
                "no M49 area code known for '{iso3}'"
            )));
        };

        let url = format!(
            "{}/{}?area={}&per_page=50000&output_type=objects",
            self.cfg.api_base, domain, m49
        );
        let payload = self.fetch_json(&url).await?;

        let Some(data) = payload.get("data").and_then(Value::as_array) else {
            return Err(SourceError::shape(format!(
                "faostat response for {url} is missing the 'data' list"
            )));
        };

        let rows: Vec<FaoRow> = data
            .iter()
            .filter_map(|raw| self.normalize_api_row(raw, domain))
            .filter(|row| self.matches_area(row, m49, iso3))
            .filter(|row| self.matches_elements(row))
            .collect();

        if rows.is_empty() {
            Ok(FetchOutcome::Empty)
        } else {
            Ok(FetchOutcome::Rows(rows))
        }
    }

    fn normalize_api_row(&self, raw: &Value, domain: &str) -> Option<FaoRow> {
        let object = raw.as_object()?;
        let mut fields = std::collections::BTreeMap::new();
        for (key, value) in object {
            if let Some(canonical) = canonical_column(key) {
                fields.entry(canonical).or_insert_with(|| value_to_string(value));
            }
        }
        build_row(&fields, domain, Provenance::Api)
    }

    async fn fetch_zip_rows(
        &self,
        url: &str,
        iso3: &str,
        provenance: Provenance,
    ) -> Result<FetchOutcome<Vec<FaoRow>>, SourceError> {
        let bytes = match self.cache.get_bytes(url, self.ttl_hours) {
            Some(cached) => {
                tracing::debug!(url, "bulk archive cache hit");
                cached
            }
            None => {
                let response = self.http.get(url).await?;
                if let Err(error) = self.cache.set_bytes(url, &response.body) {
                    tracing::warn!(url, %error, "failed to cache bulk archive");
                }
                response.body
            }
        };

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| SourceError::parse(format!("bulk archive {url}: {e}")))?;
        let member = select_data_member(&mut archive).ok_or_else(|| {
            SourceError::parse(format!("bulk archive {url} has no CSV member"))
        })?;

        let mut text = Vec::new();
        archive
            .by_name(&member)
            .map_err(|e| SourceError::parse(format!("bulk member '{member}': {e}")))?
            .read_to_end(&mut text)
            .map_err(|e| SourceError::parse(format!("bulk member '{member}': {e}")))?;
        let text = String::from_utf8_lossy(&text).into_owned();

        let m49 = m49_for_iso3(iso3);
        let domain = self
            .cfg
            .domains
            .first()
            .cloned()
            .unwrap_or_else(|| String::from("FBS"));

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers: Vec<Option<&'static str>> = reader
            .headers()
            .map_err(|e| SourceError::parse(format!("bulk member '{member}' headers: {e}")))?
            .iter()
            .map(canonical_column)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| SourceError::parse(format!("bulk member '{member}': {e}")))?;
            let mut fields = std::collections::BTreeMap::new();
            for (index, canonical) in headers.iter().enumerate() {
                if let (Some(canonical), Some(value)) = (canonical, record.get(index)) {
                    fields.entry(*canonical).or_insert_with(|| value.to_owned());
                }
            }
            let Some(row) = build_row(&fields, &domain, provenance) else {
                continue;
            };
            let matches = match m49 {
                Some(code) => self.matches_area(&row, code, iso3),
                // No numeric code known; fall back to the area name alone.
                None => area_matches_name(&row.area, iso3),
            };
            if matches && self.matches_elements(&row) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            Ok(FetchOutcome::Empty)
        } else {
            Ok(FetchOutcome::Rows(rows))
        }
    }

    /// Query the HDX CKAN package-search API and take the first `.zip`
    /// resource URL from the results.
    async fn discover_hdx_mirror(&self, search_url: &str) -> Result<Option<String>, SourceError> {
        let url = format!(
            "{}?q={}&rows=10",
            search_url,
            urlencoding::encode("faostat food balance sheets")
        );
        let payload = self.fetch_json(&url).await?;

        let results = payload
            .get("result")
            .and_then(|r| r.get("results"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SourceError::shape(format!("hdx response for {url} has no result list"))
            })?;

        for package in results {
            let Some(resources) = package.get("resources").and_then(Value::as_array) else {
                continue;
            };
            for resource in resources {
                if let Some(resource_url) = resource.get("url").and_then(Value::as_str) {
                    if resource_url.to_ascii_lowercase().ends_with(".zip") {
                        return Ok(Some(resource_url.to_owned()));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, SourceError> {
        if let Some(cached) = self.cache.get_json(url, self.ttl_hours) {
            tracing::debug!(url, "faostat cache hit");
            return Ok(cached);
        }
        let response = self.http.get(url).await?;
        let payload: Value = serde_json::from_slice(&response.body)
            .map_err(|e| SourceError::parse(format!("faostat response for {url}: {e}")))?;
        if let Err(error) = self.cache.set_json(url, &payload) {
            tracing::warn!(url, %error, "failed to write cache entry");
        }
        Ok(payload)
    }

    fn matches_area(&self, row: &FaoRow, m49: u32, iso3: &str) -> bool {
        match row.area_code {
            Some(code) => code == m49,
            None => area_matches_name(&row.area, iso3),
        }
    }

    fn matches_elements(&self, row: &FaoRow) -> bool {
        self.cfg.elements.is_empty()
            || self
                .cfg
                .elements
                .iter()
                .any(|element| element.eq_ignore_ascii_case(&row.element))
    }
}

fn area_matches_name(area: &str, iso3: &str) -> bool {
    area_name_for_iso3(iso3).is_some_and(|name| name.eq_ignore_ascii_case(area.trim()))
}

/// Map an idiosyncratic column name onto the canonical schema, ignoring
/// case, spacing, and decorations like `(M49)`. Code-qualified element and
/// year columns are dropped so the plain labels win.
pub fn canonical_column(name: &str) -> Option<&'static str> {
    let normalized = normalize_key(name);
    let has_code = normalized.contains("code");

    if normalized.contains("area") || normalized.contains("country") {
        return Some(if has_code { "area_code" } else { "area" });
    }
    if normalized.contains("item") {
        return Some(if has_code { "item_code" } else { "item" });
    }
    if normalized.contains("element") {
        return if has_code { None } else { Some("element") };
    }
    if normalized.contains("year") {
        return if has_code { None } else { Some("year") };
    }
    if normalized == "value" {
        return Some("value");
    }
    if normalized == "unit" {
        return Some("unit");
    }
    None
}

fn normalize_key(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            normalized.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            normalized.push('_');
            last_was_sep = true;
        }
    }
    normalized.trim_end_matches('_').to_owned()
}

fn build_row(
    fields: &std::collections::BTreeMap<&'static str, String>,
    domain: &str,
    source: Provenance,
) -> Option<FaoRow> {
    // A row without at least an item or an element is structural noise.
    if !fields.contains_key("item") && !fields.contains_key("element") {
        return None;
    }
    let get = |key: &str| fields.get(key).map(|v| v.trim().to_owned()).unwrap_or_default();

    Some(FaoRow {
        area_code: fields
            .get("area_code")
            .and_then(|v| v.trim().trim_start_matches('\'').parse::<u32>().ok()),
        area: get("area"),
        item_code: get("item_code"),
        item: get("item"),
        element: get("element"),
        year: get("year"),
        value: fields.get("value").and_then(|v| v.trim().parse::<f64>().ok()),
        unit: get("unit"),
        source,
        domain: domain.to_owned(),
    })
}

/// Pick the archive member that carries the full dataset: prefer a name
/// containing "all_data", otherwise the shortest CSV name.
fn select_data_member<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>) -> Option<String> {
    let names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    let csvs: Vec<&String> = names
        .iter()
        .filter(|name| name.to_ascii_lowercase().ends_with(".csv"))
        .collect();

    csvs.iter()
        .find(|name| normalize_key(name).contains("all_data"))
        .map(|name| (*name).clone())
        .or_else(|| csvs.iter().min_by_key(|name| name.len()).map(|name| (*name).clone()))
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn sort_rows(rows: &mut [FaoRow]) {
    rows.sort_by(|a, b| {
        a.domain
            .cmp(&b.domain)
            .then_with(|| a.item.cmp(&b.item))
            .then_with(|| a.element.cmp(&b.element))
            .then_with(|| a.year.cmp(&b.year))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse, ScriptedHttpClient};
    use crate::retry::{Backoff, RetryConfig};
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> FaostatConfig {
        FaostatConfig {
            enabled: true,
            api_base: String::from("https://fao.test/api/v1/en/data"),
            out_folder: String::from("faostat_fbs"),
            countries_iso3: vec![String::from("JAM")],
            domains: vec![String::from("FBS")],
            elements: vec![String::from("Production")],
            bulk_mirrors: vec![String::from("https://mirror.test/FoodBalanceSheets_E_All_Data_(Normalized).zip")],
            hdx_search_url: None,
        }
    }

    fn client(transport: Arc<ScriptedHttpClient>) -> RetryingClient {
        RetryingClient::new(
            transport,
            RetryConfig {
                max_retries: 0,
                backoff: Backoff::Fixed {
                    delay: Duration::from_millis(1),
                },
                request_jitter: false,
                ..RetryConfig::default()
            },
        )
    }

    pub(crate) fn zip_with_csv(member: &str, csv: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file(member, zip::write::SimpleFileOptions::default())
                .expect("start member");
            writer.write_all(csv.as_bytes()).expect("write member");
            writer.finish().expect("finish archive");
        }
        buffer.into_inner()
    }

    const BULK_CSV: &str = "\
Area Code,Area,Item Code,Item,Element Code,Element,Year,Unit,Value
388,Jamaica,2511,Wheat and products,5511,Production,2020,1000 t,12.5
388,Jamaica,2511,Wheat and products,5301,Domestic supply,2020,1000 t,40.0
84,Belize,2511,Wheat and products,5511,Production,2020,1000 t,3.0
";

    #[test]
    fn column_names_normalize_case_and_spacing() {
        assert_eq!(canonical_column("Area Code"), Some("area_code"));
        assert_eq!(canonical_column("Area Code (M49)"), Some("area_code"));
        assert_eq!(canonical_column("area"), Some("area"));
        assert_eq!(canonical_column("ITEM"), Some("item"));
        assert_eq!(canonical_column("Item Code (FBS)"), Some("item_code"));
        assert_eq!(canonical_column("Element"), Some("element"));
        assert_eq!(canonical_column("Element Code"), None);
        assert_eq!(canonical_column("Year Code"), None);
        assert_eq!(canonical_column("Year"), Some("year"));
        assert_eq!(canonical_column("Unit"), Some("unit"));
        assert_eq!(canonical_column("Value"), Some("value"));
        assert_eq!(canonical_column("Flag"), None);
    }

    #[tokio::test]
    async fn api_rows_normalize_and_filter_elements() {
        let body = r#"{"data": [
            {"Area Code (M49)": "388", "Area": "Jamaica", "Item Code": "2511",
             "Item": "Wheat and products", "Element": "Production", "Year": "2020",
             "Unit": "1000 t", "Value": 12.5},
            {"Area Code (M49)": "388", "Area": "Jamaica", "Item Code": "2511",
             "Item": "Wheat and products", "Element": "Losses", "Year": "2020",
             "Unit": "1000 t", "Value": 1.0}
        ]}"#;
        let transport = Arc::new(
            ScriptedHttpClient::new().route("fao.test/api", Ok(HttpResponse::ok(body))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, errors) = adapter.fetch_country("JAM").await;
        assert!(errors.is_empty());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].element, "Production");
        assert_eq!(rows[0].area_code, Some(388));
        assert_eq!(rows[0].source, Provenance::Api);
        assert_eq!(rows[0].domain, "FBS");
    }

    #[tokio::test]
    async fn empty_api_falls_back_to_bulk_mirror() {
        let archive = zip_with_csv("FoodBalanceSheets_E_All_Data_(Normalized).csv", BULK_CSV);
        let transport = Arc::new(
            ScriptedHttpClient::new()
                .route("fao.test/api", Ok(HttpResponse::ok(r#"{"data": []}"#)))
                .route("mirror.test", Ok(HttpResponse::ok(archive))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, errors) = adapter.fetch_country("JAM").await;
        assert!(errors.is_empty(), "empty api is not an error: {errors:?}");
        // Only the Jamaica Production row survives area + element filtering.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].area, "Jamaica");
        assert_eq!(rows[0].area_code, Some(388));
        assert_eq!(rows[0].source, Provenance::Bulk);
    }

    #[tokio::test]
    async fn failed_api_records_error_and_bulk_still_wins() {
        let archive = zip_with_csv("FoodBalanceSheets_E_All_Data_(Normalized).csv", BULK_CSV);
        let transport = Arc::new(
            ScriptedHttpClient::new()
                .route("fao.test/api", Err(HttpError::new("connection refused")))
                .route("mirror.test", Ok(HttpResponse::ok(archive))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, errors) = adapter.fetch_country("JAM").await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].stage, "api");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, Provenance::Bulk);
    }

    #[tokio::test]
    async fn second_mirror_wins_when_first_is_unreachable() {
        let archive = zip_with_csv("FoodBalanceSheets_E_All_Data_(Normalized).csv", BULK_CSV);
        let transport = Arc::new(
            ScriptedHttpClient::new()
                .route("fao.test/api", Ok(HttpResponse::ok(r#"{"data": []}"#)))
                .route("mirror-a.test", Err(HttpError::new("dns failure")))
                .route("mirror-b.test", Ok(HttpResponse::ok(archive))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let mut cfg = test_config();
        cfg.bulk_mirrors = vec![
            String::from("https://mirror-a.test/fbs.zip"),
            String::from("https://mirror-b.test/fbs.zip"),
        ];
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, errors) = adapter.fetch_country("JAM").await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].stage, "bulk");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn hdx_tier_discovers_and_uses_a_mirror() {
        let archive = zip_with_csv("FoodBalanceSheets_E_All_Data_(Normalized).csv", BULK_CSV);
        let search_body = r#"{"result": {"results": [
            {"resources": [
                {"url": "https://hdx.test/files/notes.pdf"},
                {"url": "https://hdx.test/files/FoodBalanceSheets.zip"}
            ]}
        ]}}"#;
        let transport = Arc::new(
            ScriptedHttpClient::new()
                .route("fao.test/api", Ok(HttpResponse::ok(r#"{"data": []}"#)))
                .route("mirror.test", Err(HttpError::new("mirror down")))
                .route("package_search", Ok(HttpResponse::ok(search_body)))
                .route("hdx.test/files", Ok(HttpResponse::ok(archive))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let mut cfg = test_config();
        cfg.hdx_search_url = Some(String::from("https://hdx.test/api/3/action/package_search"));
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, errors) = adapter.fetch_country("JAM").await;
        assert_eq!(errors.len(), 1, "the dead catalog mirror is recorded");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, Provenance::Hdx);
    }

    #[tokio::test]
    async fn exhausted_chain_yields_no_rows_and_recorded_errors() {
        let transport = Arc::new(
            ScriptedHttpClient::new()
                .route("fao.test/api", Err(HttpError::new("api down")))
                .route("mirror.test", Err(HttpError::new("mirror down"))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, errors) = adapter.fetch_country("JAM").await;
        assert!(rows.is_empty());
        // One api failure, one bulk failure, one aggregate record.
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[2].stage, "chain");
    }

    #[tokio::test]
    async fn rows_sort_by_domain_item_element_year() {
        let body = r#"{"data": [
            {"Area Code": 388, "Area": "Jamaica", "Item": "Wheat", "Element": "Production", "Year": "2021", "Value": 2},
            {"Area Code": 388, "Area": "Jamaica", "Item": "Maize", "Element": "Production", "Year": "2020", "Value": 1},
            {"Area Code": 388, "Area": "Jamaica", "Item": "Wheat", "Element": "Production", "Year": "2019", "Value": 3}
        ]}"#;
        let transport = Arc::new(
            ScriptedHttpClient::new().route("fao.test/api", Ok(HttpResponse::ok(body))),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let mut cfg = test_config();
        cfg.elements.clear();
        let http = client(transport);
        let adapter = FaostatAdapter::new(&http, &cache, &cfg, 24);

        let (rows, _) = adapter.fetch_country("JAM").await;
        let keys: Vec<(&str, &str)> = rows.iter().map(|r| (r.item.as_str(), r.year.as_str())).collect();
        assert_eq!(keys, vec![("Maize", "2020"), ("Wheat", "2019"), ("Wheat", "2021")]);
    }

    #[test]
    fn all_data_member_is_preferred_over_shorter_names() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for name in ["notes.csv", "FoodBalanceSheets_E_All_Data_(Normalized).csv", "readme.txt"] {
                writer
                    .start_file(name, zip::write::SimpleFileOptions::default())
                    .expect("start member");
                writer.write_all(b"x").expect("write");
            }
            writer.finish().expect("finish");
        }
        let mut archive = zip::ZipArchive::new(Cursor::new(buffer.into_inner())).expect("archive");
        assert_eq!(
            select_data_member(&mut archive).as_deref(),
            Some("FoodBalanceSheets_E_All_Data_(Normalized).csv")
        );
    }
}

//! World Bank Open Data adapter.
//!
//! The API wraps every answer as a two-element array `[metadata, rows]`.
//! A short or malformed wrapper, or an empty row list, is "no data" rather
//! than an error; only transport failures and unparseable bodies are
//! reported upward.

use serde_json::Value;

use crate::cache::DiskCache;
use crate::config::WorldBankConfig;
use crate::http_client::RetryingClient;
use crate::model::WbRow;
use crate::source::{FetchOutcome, SourceError};

/// Indicator display metadata from the World Bank dictionary endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorMeta {
    pub name: String,
    pub source_note: String,
}

pub struct WorldBankAdapter<'a> {
    http: &'a RetryingClient,
    cache: &'a DiskCache,
    cfg: &'a WorldBankConfig,
    ttl_hours: u64,
}

impl<'a> WorldBankAdapter<'a> {
    pub fn new(
        http: &'a RetryingClient,
        cache: &'a DiskCache,
        cfg: &'a WorldBankConfig,
        ttl_hours: u64,
    ) -> Self {
        Self {
            http,
            cache,
            cfg,
            ttl_hours,
        }
    }

    /// Fetch and normalize the time series for one (country, indicator).
    ///
    /// Rows come back sorted ascending by year. The ISO2 code is taken from
    /// the catalog, not re-derived from the API response, and the unit is
    /// the catalog override (the API does not report one).
    pub async fn fetch_series(
        &self,
        country_iso2: &str,
        indicator: &str,
        unit: &str,
    ) -> Result<FetchOutcome<Vec<WbRow>>, SourceError> {
        let url = format!(
            "{}/country/{}/indicator/{}?format=json&per_page={}",
            self.cfg.api_base, country_iso2, indicator, self.cfg.per_page
        );
        let payload = self.fetch_json(&url).await?;

        let Some(wrapper) = payload.as_array() else {
            return Ok(FetchOutcome::Empty);
        };
        if wrapper.len() < 2 {
            return Ok(FetchOutcome::Empty);
        }
        let Some(raw_rows) = wrapper[1].as_array() else {
            return Ok(FetchOutcome::Empty);
        };

        let mut rows: Vec<WbRow> = raw_rows
            .iter()
            .filter_map(|raw| normalize_row(raw, country_iso2, indicator, unit))
            .collect();
        if rows.is_empty() {
            return Ok(FetchOutcome::Empty);
        }
        rows.sort_by_key(|row| row.year);
        Ok(FetchOutcome::Rows(rows))
    }

    /// Fetch indicator display metadata; malformed metadata degrades to
    /// empty strings and never fails the build.
    pub async fn fetch_indicator_meta(&self, indicator: &str) -> Result<IndicatorMeta, SourceError> {
        let url = format!(
            "{}/indicator/{}?format=json&per_page=50",
            self.cfg.api_base, indicator
        );
        let payload = self.fetch_json(&url).await?;

        let meta = payload
            .as_array()
            .filter(|wrapper| wrapper.len() >= 2)
            .and_then(|wrapper| wrapper[1].as_array())
            .and_then(|rows| rows.first())
            .map(|first| IndicatorMeta {
                name: string_field(first, "name"),
                source_note: string_field(first, "sourceNote").replace('\n', " ").trim().to_owned(),
            })
            .unwrap_or_default();
        Ok(meta)
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, SourceError> {
        if let Some(cached) = self.cache.get_json(url, self.ttl_hours) {
            tracing::debug!(url, "world bank cache hit");
            return Ok(cached);
        }
        let response = self.http.get(url).await?;
        let payload: Value = serde_json::from_slice(&response.body)
            .map_err(|e| SourceError::parse(format!("world bank response for {url}: {e}")))?;
        if let Err(error) = self.cache.set_json(url, &payload) {
            tracing::warn!(url, %error, "failed to write cache entry");
        }
        Ok(payload)
    }
}

fn normalize_row(raw: &Value, iso2: &str, indicator: &str, unit: &str) -> Option<WbRow> {
    let year = raw.get("date")?.as_str()?.parse::<i32>().ok()?;
    Some(WbRow {
        country: raw
            .get("country")
            .and_then(|c| c.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        iso2c: iso2.to_owned(),
        year,
        indicator: indicator.to_owned(),
        value: raw.get("value").and_then(Value::as_f64),
        unit: unit.to_owned(),
    })
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};
    use crate::retry::{Backoff, RetryConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> WorldBankConfig {
        WorldBankConfig {
            enabled: true,
            api_base: String::from("https://api.test/v2"),
            per_page: 20_000,
            indicators: Default::default(),
        }
    }

    fn client(transport: ScriptedHttpClient) -> RetryingClient {
        RetryingClient::new(
            Arc::new(transport),
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

    #[tokio::test]
    async fn series_response_normalizes_to_tidy_rows() {
        let body = r#"[{"page":1},[
            {"date":"2020","value":400000,"country":{"value":"Belize"},"countryiso3code":"BLZ"},
            {"date":"2019","value":398000,"country":{"value":"Belize"},"countryiso3code":"BLZ"}
        ]]"#;
        let transport =
            ScriptedHttpClient::new().route("country/BZ/indicator", Ok(HttpResponse::ok(body)));
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = WorldBankAdapter::new(&http, &cache, &cfg, 24);

        let rows = adapter
            .fetch_series("BZ", "SP.POP.TOTL", "people")
            .await
            .expect("fetch succeeds")
            .into_rows()
            .expect("two rows");

        assert_eq!(rows.len(), 2);
        // Ascending year order regardless of API order.
        assert_eq!(rows[0].year, 2019);
        assert_eq!(rows[1].year, 2020);
        assert_eq!(rows[1].country, "Belize");
        assert_eq!(rows[1].iso2c, "BZ");
        assert_eq!(rows[1].indicator, "SP.POP.TOTL");
        assert_eq!(rows[1].value, Some(400_000.0));
        assert_eq!(rows[1].unit, "people");
    }

    #[tokio::test]
    async fn short_wrapper_is_no_data_not_an_error() {
        let transport = ScriptedHttpClient::new().route(
            "country/BZ/indicator",
            Ok(HttpResponse::ok(r#"[{"message":"no such indicator"}]"#)),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = WorldBankAdapter::new(&http, &cache, &cfg, 24);

        let outcome = adapter
            .fetch_series("BZ", "BAD.CODE", "")
            .await
            .expect("degrades to empty");
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_is_a_parse_error() {
        let transport = ScriptedHttpClient::new()
            .route("country/BZ/indicator", Ok(HttpResponse::ok("<html>oops</html>")));
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = WorldBankAdapter::new(&http, &cache, &cfg, 24);

        let error = adapter
            .fetch_series("BZ", "SP.POP.TOTL", "")
            .await
            .expect_err("html body cannot parse");
        assert_eq!(error.code(), "fetch.parse");
    }

    #[tokio::test]
    async fn indicator_meta_degrades_to_empty_strings() {
        let transport = ScriptedHttpClient::new()
            .route("/indicator/", Ok(HttpResponse::ok(r#"[{"page":1}]"#)));
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let http = client(transport);
        let adapter = WorldBankAdapter::new(&http, &cache, &cfg, 24);

        let meta = adapter
            .fetch_indicator_meta("SP.POP.TOTL")
            .await
            .expect("never fails on shape");
        assert_eq!(meta, IndicatorMeta::default());
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let body = r#"[{"page":1},[{"date":"2020","value":1,"country":{"value":"Belize"}}]]"#;
        let transport =
            ScriptedHttpClient::new().route("country/BZ/indicator", Ok(HttpResponse::ok(body)));
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cfg = test_config();
        let transport = Arc::new(transport);
        let http = RetryingClient::new(
            transport.clone(),
            RetryConfig {
                request_jitter: false,
                ..RetryConfig::default()
            },
        );
        let adapter = WorldBankAdapter::new(&http, &cache, &cfg, 24);

        adapter.fetch_series("BZ", "SP.POP.TOTL", "").await.expect("first");
        adapter.fetch_series("BZ", "SP.POP.TOTL", "").await.expect("second");
        assert_eq!(transport.requests().len(), 1);
    }
}

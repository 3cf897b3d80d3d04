//! Build orchestration.
//!
//! Runs each enabled source in turn, writing tidy CSVs and sidecars under
//! the catalog's output directory. The run is fail-soft: a failed
//! (indicator, country) dimension lands in that source's `_errors.json` and
//! the rest of the run continues. Only configuration and filesystem trouble
//! abort the build.

use std::path::{Path, PathBuf};

use crate::adapters::{FaostatAdapter, WorldBankAdapter};
use crate::cache::DiskCache;
use crate::config::Catalog;
use crate::error::BuildError;
use crate::http_client::RetryingClient;
use crate::messy::MessyFetcher;
use crate::model::{now_iso, DictionaryRow, Manifest, ManifestEntry};
use crate::source::{ErrorRecord, FetchOutcome};
use crate::tidy;

/// Per-source tally reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub source: String,
    pub files: usize,
    pub rows: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub sources: Vec<SourceSummary>,
}

impl BuildSummary {
    pub fn total_errors(&self) -> usize {
        self.sources.iter().map(|s| s.errors).sum()
    }
}

pub struct Builder {
    catalog: Catalog,
    http: RetryingClient,
    cache: DiskCache,
    out_dir: PathBuf,
}

impl Builder {
    pub fn new(catalog: Catalog, http: RetryingClient) -> Self {
        let cache = DiskCache::new(&catalog.project.cache_dir);
        let out_dir = PathBuf::from(&catalog.project.out_dir);
        Self {
            catalog,
            http,
            cache,
            out_dir,
        }
    }

    /// Run every enabled API-backed source and stamp `_freshness.json`.
    pub async fn build(&self) -> Result<BuildSummary, BuildError> {
        self.ensure_out_dir()?;
        let mut summary = BuildSummary::default();
        let mut freshness = tidy::read_freshness(&self.out_dir);
        freshness.generated_at = now_iso();

        if let Some(source) = self.build_world_bank().await? {
            freshness.sources.insert(source.source.clone(), now_iso());
            summary.sources.push(source);
        }
        if let Some(source) = self.build_faostat().await? {
            freshness.sources.insert(source.source.clone(), now_iso());
            summary.sources.push(source);
        }

        tidy::write_freshness(&self.out_dir, &freshness)?;
        Ok(summary)
    }

    /// Run the messy-dataset harvest on its own, layering its freshness
    /// entry onto the existing stamp so other sources keep theirs.
    pub async fn build_messy(&self) -> Result<Option<SourceSummary>, BuildError> {
        let Some(cfg) = self.catalog.messy.as_ref().filter(|c| c.enabled) else {
            return Ok(None);
        };
        self.ensure_out_dir()?;

        tracing::info!(items = cfg.items.len(), "messy harvest starting");
        let fetcher = MessyFetcher::new(&self.http, cfg, &self.out_dir);
        let run = fetcher.run().await?;

        let mut freshness = tidy::read_freshness(&self.out_dir);
        freshness.generated_at = now_iso();
        freshness
            .sources
            .insert(String::from("messy"), now_iso());
        tidy::write_freshness(&self.out_dir, &freshness)?;

        Ok(Some(SourceSummary {
            source: String::from("messy"),
            files: run.report.len(),
            rows: 0,
            errors: run.errors.len(),
        }))
    }

    async fn build_world_bank(&self) -> Result<Option<SourceSummary>, BuildError> {
        let Some(cfg) = self.catalog.world_bank.as_ref().filter(|c| c.enabled) else {
            return Ok(None);
        };

        let dir = self.out_dir.join("world_bank");
        let ttl = self.catalog.project.cache_ttl_hours;
        let adapter = WorldBankAdapter::new(&self.http, &self.cache, cfg, ttl);

        let mut manifest = Manifest::new("world_bank");
        let mut dictionary = Vec::new();
        let mut errors: Vec<ErrorRecord> = Vec::new();
        let mut total_rows = 0;

        for (code, spec) in &cfg.indicators {
            for country in &self.catalog.project.countries {
                match adapter.fetch_series(country, code, &spec.unit).await {
                    Ok(FetchOutcome::Rows(rows)) => {
                        let relative = format!("world_bank/{country}/{code}.csv");
                        tidy::write_csv(&dir.join(country).join(format!("{code}.csv")), &rows)?;
                        tracing::info!(
                            indicator = code.as_str(),
                            country = country.as_str(),
                            rows = rows.len(),
                            "series written"
                        );
                        manifest.items.push(
                            ManifestEntry::new(relative, rows.len())
                                .with("country", country.clone())
                                .with("indicator", code.clone())
                                .with("unit", spec.unit.clone()),
                        );
                        total_rows += rows.len();
                    }
                    Ok(FetchOutcome::Empty) => {
                        tracing::info!(indicator = code.as_str(), country = country.as_str(), "no data");
                    }
                    Err(error) => {
                        tracing::warn!(
                            indicator = code.as_str(),
                            country = country.as_str(),
                            %error,
                            "indicator fetch failed"
                        );
                        errors.push(
                            ErrorRecord::new("fetch", &error)
                                .with("indicator", code.clone())
                                .with("country", country.clone()),
                        );
                    }
                }
            }

            let meta = adapter.fetch_indicator_meta(code).await.unwrap_or_default();
            // Catalog names win; a blank one falls back to what the API calls
            // the indicator.
            let name = if spec.name.is_empty() {
                meta.name.clone()
            } else {
                spec.name.clone()
            };
            dictionary.push(DictionaryRow {
                indicator_code: code.clone(),
                name,
                unit: spec.unit.clone(),
                group: spec.group.clone(),
                wb_name: meta.name,
                wb_source_note: meta.source_note,
            });
        }

        let files = manifest.items.len();
        tidy::write_manifest(&dir, &manifest)?;
        tidy::write_dictionary(&dir, &dictionary)?;
        tidy::write_errors(&dir, &errors)?;
        tidy::write_dataset_card_once(&dir, &world_bank_card(&dictionary))?;

        Ok(Some(SourceSummary {
            source: String::from("world_bank"),
            files,
            rows: total_rows,
            errors: errors.len(),
        }))
    }

    async fn build_faostat(&self) -> Result<Option<SourceSummary>, BuildError> {
        let Some(cfg) = self.catalog.faostat_fbs.as_ref().filter(|c| c.enabled) else {
            return Ok(None);
        };

        let dir = self.out_dir.join(&cfg.out_folder);
        let ttl = self.catalog.project.cache_ttl_hours;
        let adapter = FaostatAdapter::new(&self.http, &self.cache, cfg, ttl);

        let mut manifest = Manifest::new("faostat_fbs");
        let mut errors = Vec::new();
        let mut total_rows = 0;

        for iso3 in &cfg.countries_iso3 {
            let (rows, mut country_errors) = adapter.fetch_country(iso3).await;
            errors.append(&mut country_errors);
            if rows.is_empty() {
                tracing::info!(iso3 = iso3.as_str(), "no food balance data");
                continue;
            }

            let provenance = rows[0].source;
            let file_name = format!("{iso3}_fbs.csv");
            tidy::write_csv(&dir.join(&file_name), &rows)?;
            tracing::info!(
                iso3 = iso3.as_str(),
                rows = rows.len(),
                source = provenance.as_str(),
                "country written"
            );
            manifest.items.push(
                ManifestEntry::new(format!("{}/{file_name}", cfg.out_folder), rows.len())
                    .with("country_iso3", iso3.clone())
                    .with("source", provenance.as_str()),
            );
            total_rows += rows.len();
        }

        let files = manifest.items.len();
        tidy::write_manifest(&dir, &manifest)?;
        tidy::write_errors(&dir, &errors)?;
        tidy::write_dataset_card_once(&dir, &faostat_card(cfg))?;

        Ok(Some(SourceSummary {
            source: String::from("faostat_fbs"),
            files,
            rows: total_rows,
            errors: errors.len(),
        }))
    }

    fn ensure_out_dir(&self) -> Result<(), BuildError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| BuildError::OutputDir {
            path: self.out_dir.clone(),
            source,
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

fn world_bank_card(dictionary: &[DictionaryRow]) -> String {
    let mut card = String::from(
        "# World Bank indicators\n\nTidy per-indicator CSVs pulled from the \
         World Development Indicators API. See `_dictionary.csv` for names \
         and units, `_manifest.json` for what this run wrote.\n\n## Indicators\n\n",
    );
    for row in dictionary {
        card.push_str(&format!("- `{}`: {} ({})\n", row.indicator_code, row.name, row.unit));
    }
    card
}

fn faostat_card(cfg: &crate::config::FaostatConfig) -> String {
    format!(
        "# FAOSTAT food balance sheets\n\nPer-country CSVs for the {} domain(s). \
         Each row carries `_source` (api, bulk, or hdx) saying which tier of \
         the fallback chain produced it.\n",
        cfg.domains.join(", ")
    )
}

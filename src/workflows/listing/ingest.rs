use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalog::{BiasEntry, MarketingCatalog, ServiceEntry};

/// Where the active catalog snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrigin {
    SourceFiles,
    Builtin,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogImportError {
    #[error("failed to read catalog source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Builds a `MarketingCatalog` from the exported CSV sheets the production
/// team maintains (`services.csv` + `biases.csv`, list cells separated by
/// semicolons).
pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_paths<P: AsRef<Path>>(
        services_path: P,
        biases_path: P,
    ) -> Result<MarketingCatalog, CatalogImportError> {
        let services = std::fs::File::open(services_path)?;
        let biases = std::fs::File::open(biases_path)?;
        Self::from_readers(services, biases)
    }

    pub fn from_readers<S: Read, B: Read>(
        services: S,
        biases: B,
    ) -> Result<MarketingCatalog, CatalogImportError> {
        Ok(MarketingCatalog::new(
            parse_services(services)?,
            parse_biases(biases)?,
        ))
    }
}

/// Load the catalog from `dir` when both source sheets exist, otherwise fall
/// back to the built-in default catalog.
pub fn load_catalog(dir: &Path) -> Result<(MarketingCatalog, CatalogOrigin), CatalogImportError> {
    let services_path = dir.join("services.csv");
    let biases_path = dir.join("biases.csv");

    if services_path.is_file() && biases_path.is_file() {
        let catalog = CatalogImporter::from_paths(&services_path, &biases_path)?;
        Ok((catalog, CatalogOrigin::SourceFiles))
    } else {
        Ok((MarketingCatalog::builtin(), CatalogOrigin::Builtin))
    }
}

fn parse_services<R: Read>(reader: R) -> Result<Vec<ServiceEntry>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for record in csv_reader.deserialize::<ServiceRow>() {
        let row = record?;
        entries.push(ServiceEntry {
            service_id: row.service_id,
            name: row.name,
            deliverables: split_list(&row.deliverables),
            constraints: split_list(&row.constraints),
            compatible_biases: split_list(&row.compatible_biases),
            price_band: if row.price_band.is_empty() {
                "unknown".to_string()
            } else {
                row.price_band
            },
        });
    }

    Ok(entries)
}

fn parse_biases<R: Read>(reader: R) -> Result<Vec<BiasEntry>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for record in csv_reader.deserialize::<BiasRow>() {
        let row = record?;
        entries.push(BiasEntry {
            key: row.key,
            name: row.name,
            definition: row.definition,
            copy_patterns: split_list(&row.copy_patterns),
            cadence_patterns: split_list(&row.cadence_patterns),
            compatible_services: split_list(&row.compatible_services),
        });
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    service_id: String,
    name: String,
    #[serde(default)]
    deliverables: String,
    #[serde(default)]
    constraints: String,
    #[serde(default)]
    compatible_biases: String,
    #[serde(default)]
    price_band: String,
}

#[derive(Debug, Deserialize)]
struct BiasRow {
    key: String,
    name: String,
    #[serde(default)]
    definition: String,
    #[serde(default)]
    copy_patterns: String,
    #[serde(default)]
    cadence_patterns: String,
    #[serde(default)]
    compatible_services: String,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

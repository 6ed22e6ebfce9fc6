//! Nomisweb metadata client
//!
//! Scrapes the Nomis dataset definitions once per client and builds
//! parameterised CSV download URLs for individual datasets.

use crate::config::{LinkerConfig, MatchPolicy};
use crate::constants::{NOMIS_DEFINITIONS_PAGE, dimensions};
use crate::error::Result;
use crate::fetch::Fetch;
use crate::models::{CodeList, DatasetDefinition};
use crate::table::{CsvSource, read_csv_bytes};
use polars::prelude::DataFrame;
use tracing::{debug, info};

pub mod page;
pub mod query;
pub mod reshape;

#[cfg(test)]
pub mod tests;

pub use page::{DatasetIndex, DefinitionLayout};
pub use query::QueryPlan;

/// Client for the Nomis dataset API
#[derive(Debug)]
pub struct NomisClient<F> {
    fetcher: F,
    root: String,
    api_key: String,
    policy: MatchPolicy,
    layout: DefinitionLayout,
    catalogue: DatasetIndex,
}

impl<F: Fetch> NomisClient<F> {
    /// Create a client and scrape the dataset catalogue.
    ///
    /// Fails when the definitions page cannot be fetched or does not list
    /// any dataset, since every later lookup depends on it.
    pub async fn connect(
        fetcher: F,
        config: &LinkerConfig,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let mut client = Self {
            fetcher,
            root: config.nomis_root.clone(),
            api_key: api_key.into(),
            policy: config.match_policy,
            layout: DefinitionLayout::default(),
            catalogue: DatasetIndex::default(),
        };
        client.catalogue = client.build_catalogue().await?;
        info!("Nomis catalogue lists {} datasets", client.catalogue.len());
        Ok(client)
    }

    pub fn catalogue(&self) -> &DatasetIndex {
        &self.catalogue
    }

    /// Fetch and parse the root definitions page
    pub async fn build_catalogue(&self) -> Result<DatasetIndex> {
        let url = format!("{}{}", self.root, NOMIS_DEFINITIONS_PAGE);
        let html = self.fetcher.get(&url).await?.into_text(&url)?;
        page::parse_dataset_index(&html, &url, &self.layout)
    }

    /// Resolve a dataset code against catalogue names
    pub fn resolve_dataset(&self, pattern: &str) -> Result<&DatasetDefinition> {
        self.catalogue.resolve(pattern, self.policy)
    }

    /// Fetch the code list of one dimension of a dataset
    pub async fn fetch_dimension_codes(
        &self,
        dataset_id: &str,
        dimension: &str,
    ) -> Result<CodeList> {
        let url = format!("{}{}/{}.def.htm", self.root, dataset_id, dimension);
        let html = self.fetcher.get(&url).await?.into_text(&url)?;
        page::parse_codelist(&html, &url, &self.layout)
    }

    /// Build the download URL and decode mappings for a dataset code
    pub async fn build_url(&self, code: &str) -> Result<QueryPlan> {
        let dataset = self.resolve_dataset(code)?;
        debug!("'{}' resolved to {} ({})", code, dataset.name, dataset.id);

        if !dataset.has_dimension(dimensions::GEOGRAPHY) {
            return Err(query::missing_geography(code, dataset));
        }

        let mut codelists = Vec::with_capacity(dataset.dimensions.len());
        for dimension in &dataset.dimensions {
            let codes = self.fetch_dimension_codes(&dataset.id, &dimension.name).await?;
            codelists.push((dimension.name.clone(), codes));
        }

        query::build_query(code, dataset, codelists, &self.root, &self.api_key)
    }

    /// Download a query result and add label columns for its coded dimensions
    pub async fn download(&self, plan: &QueryPlan) -> Result<DataFrame> {
        let bytes = self.fetcher.get(&plan.url).await?.into_success(&plan.url)?;
        let mut frame = read_csv_bytes(bytes, CsvSource::default())?;
        let decoded = plan.decode_frame(&mut frame)?;
        info!(
            "Downloaded {} rows of {}, decoded {} columns",
            frame.height(),
            plan.dataset_id,
            decoded
        );
        Ok(frame)
    }
}

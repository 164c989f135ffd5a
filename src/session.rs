//! Explicit dashboard state.
//!
//! A [`Session`] owns the active mapping table, the raw table it was loaded
//! from, the standardized dataset and the load cache. Changing the mapping
//! re-derives the dataset from the raw table. Every render pass works from
//! an immutable [`Snapshot`], so nothing a pass computes leaks back into the
//! session.

use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::UTF_8;
use log::{debug, info};
use serde::Serialize;

use crate::{
    breakdown::{ChartSet, SCREEN_TOP_N, build_charts},
    cli::DataArgs,
    coerce::coerce_types,
    error::{DashboardError, DashboardResult},
    filter::{DateRange, FilterSelection, apply_filters, parse_date_arg, parse_selection},
    frame::Frame,
    io_utils,
    kpi::KpiSet,
    loader::{LoadCache, LoadOptions, SAMPLE_CSV, SourceFormat},
    mapping::{ColumnMapping, MappingTable, StandardField, map_columns},
    validate::{Issue, validate},
};

#[derive(Debug, Default)]
pub struct Session {
    mapping: MappingTable,
    raw: Frame,
    dataset: Frame,
    column_mapping: ColumnMapping,
    cache: LoadCache,
    digest: Option<String>,
}

/// Read-only view of the session used by one render pass.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub dataset: &'a Frame,
    pub column_mapping: &'a ColumnMapping,
}

/// Everything one dashboard pass displays.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPass {
    #[serde(skip)]
    pub view: Frame,
    pub rows: usize,
    pub issues: Vec<Issue>,
    pub kpis: KpiSet,
    pub charts: ChartSet,
}

impl Session {
    pub fn new(mapping: MappingTable) -> Self {
        Self {
            mapping,
            ..Self::default()
        }
    }

    /// Builds a session from command-line data arguments: mapping file,
    /// input (or the bundled sample) and decoding options.
    pub fn from_args(args: &DataArgs) -> Result<Self> {
        let mapping = match &args.mapping {
            Some(path) => MappingTable::load(path)?,
            None => MappingTable::default(),
        };
        let mut session = Self::new(mapping);
        match &args.input {
            Some(path) => {
                let options = LoadOptions {
                    delimiter: args.delimiter,
                    encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
                };
                session.load_path(path, &options)?;
            }
            None => {
                info!("No input given; using the bundled sample dataset");
                session.load_sample()?;
            }
        }
        Ok(session)
    }

    pub fn load_path(&mut self, path: &Path, options: &LoadOptions) -> Result<()> {
        let (digest, raw) = self
            .cache
            .load_path(path, options)
            .with_context(|| format!("Loading {path:?}"))?;
        self.install(digest, raw);
        Ok(())
    }

    pub fn load_sample(&mut self) -> Result<()> {
        let format = SourceFormat::Delimited {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
        };
        let (digest, raw) = self
            .cache
            .get_or_parse(SAMPLE_CSV.as_bytes(), format, UTF_8)
            .context("Parsing bundled sample dataset")?;
        self.install(digest, raw);
        Ok(())
    }

    fn install(&mut self, digest: String, raw: Frame) {
        info!(
            "Loaded {} row(s) across {} column(s)",
            raw.len(),
            raw.width()
        );
        self.digest = Some(digest);
        self.raw = raw;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let (mapped, column_mapping) = map_columns(self.raw.clone(), &self.mapping);
        self.dataset = coerce_types(mapped);
        self.column_mapping = column_mapping;
        debug!(
            "Dataset rebuilt with columns {:?}",
            self.dataset.columns()
        );
    }

    pub fn set_mapping(&mut self, mapping: MappingTable) {
        self.mapping = mapping;
        self.rebuild();
    }

    /// Replaces the mapping from a JSON document. On a parse error the
    /// current mapping and dataset are left untouched.
    pub fn apply_mapping_json(&mut self, raw: &str) -> DashboardResult<()> {
        let mapping = MappingTable::from_json_str(raw)?;
        self.set_mapping(mapping);
        Ok(())
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn dataset(&self) -> &Frame {
        &self.dataset
    }

    pub fn column_mapping(&self) -> &ColumnMapping {
        &self.column_mapping
    }

    /// SHA-256 of the bytes the current dataset was loaded from.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    pub fn cache(&self) -> &LoadCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LoadCache {
        &mut self.cache
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            dataset: &self.dataset,
            column_mapping: &self.column_mapping,
        }
    }

    pub fn render(&self, selection: &FilterSelection) -> DashboardResult<RenderPass> {
        self.snapshot().render(selection, SCREEN_TOP_N)
    }
}

impl Snapshot<'_> {
    /// Filters the dataset and derives issues, KPIs and charts from the view.
    pub fn render(&self, selection: &FilterSelection, top: usize) -> DashboardResult<RenderPass> {
        if self.dataset.is_empty() {
            return Err(DashboardError::EmptyDataset { stage: "mapping" });
        }
        let view = apply_filters(self.dataset, selection);
        if view.is_empty() {
            return Err(DashboardError::EmptyDataset { stage: "filtering" });
        }
        Ok(RenderPass {
            rows: view.len(),
            issues: validate(&view, Some(self.column_mapping)),
            kpis: KpiSet::compute(&view),
            charts: build_charts(&view, top),
            view,
        })
    }
}

impl DataArgs {
    /// Filter selection described by `--from/--to` and the category flags.
    pub fn selection(&self) -> Result<FilterSelection> {
        let start = self.from.as_deref().map(parse_date_arg).transpose()?;
        let end = self.to.as_deref().map(parse_date_arg).transpose()?;
        let mut selection = FilterSelection::new().with_date_range(DateRange::from_endpoints(start, end));
        let categories = [
            (StandardField::Segment, &self.segment),
            (StandardField::Region, &self.region),
            (StandardField::Channel, &self.channel),
            (StandardField::Product, &self.product),
        ];
        for (field, raw) in categories {
            let values = parse_selection(raw);
            if !values.is_empty() {
                debug!("Filtering {field} to {values:?}");
                selection.select(field, values)?;
            }
        }
        Ok(selection)
    }
}

use super::{MetricCatalogue, MetricsConfig};
use crate::aggregators::AggregatorRegistry;
use anyhow::Result;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Serialize)]
struct CatalogueRow<'a> {
    category: &'a str,
    measure: &'a str,
}

/// Writes the measure catalogue as CSV, one row per measure.
pub struct CatalogueLogger {
    writer: Writer<File>,
}

impl CatalogueLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }

    pub fn log(&mut self, catalogue: &MetricCatalogue) -> Result<()> {
        for (category, names) in catalogue.categories() {
            for measure in names {
                self.writer.serialize(CatalogueRow { category, measure })?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct OutputKeyRow<'a> {
    scope: String,
    class: &'a str,
    key: String,
}

/// Writes the metric keys every configured aggregator will emit, one row
/// per key.
pub struct OutputKeysLogger {
    writer: Writer<File>,
}

impl OutputKeysLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }

    pub fn log(&mut self, metrics: &MetricsConfig) -> Result<()> {
        let registry = AggregatorRegistry::global();
        let specs = metrics
            .aggregators_lifespan
            .iter()
            .chain(&metrics.aggregators_population);
        for spec in specs {
            let Some(class) = registry.resolve(&spec.class_string) else {
                continue;
            };
            for key in class.output_keys(&spec.config) {
                self.writer.serialize(OutputKeyRow {
                    scope: class.scope().to_string(),
                    class: class.name(),
                    key,
                })?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

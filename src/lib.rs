pub mod aggregators;
pub mod compose;
pub mod config;
pub mod metrics;
pub mod resolve;
pub mod schedule;
pub mod validate;

pub use aggregators::{AggregatorClass, AggregatorRegistry};
pub use config::ExperimentConfig;
pub use metrics::{AggregatorSpec, MetricCatalogue, MetricsConfig};
pub use schedule::SchedulePlan;
pub use validate::ValidationReport;

pub mod prelude {
    pub use crate::aggregators::{AggregatorClass, AggregatorRegistry, AggregatorScope};
    pub use crate::compose::{apply_override, compose, deep_merge};
    pub use crate::config::{ExperimentConfig, NamedSection};
    pub use crate::metrics::{AggregatorSpec, MetricCatalogue, MetricsConfig, VideoConfig};
    pub use crate::resolve::resolve_document;
    pub use crate::schedule::{SchedulePlan, TimestepEvent};
    pub use crate::validate::{validate_experiment, ValidationReport};
}

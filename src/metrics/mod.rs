pub mod logger;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// The `metrics` block of the environment section: which measures the
/// engine records, and how they are reduced over lifespans and over the
/// living population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub measures: MetricCatalogue,
    pub aggregators_lifespan: Vec<AggregatorSpec>,
    pub aggregators_population: Vec<AggregatorSpec>,
    pub config_video: VideoConfig,
}

/// Measure names by category. The order within each list is the order the
/// engine computes them in, so it is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCatalogue {
    #[serde(default)]
    pub environmental: Vec<String>,
    #[serde(default)]
    pub immediate: Vec<String>,
    #[serde(default)]
    pub state: Vec<String>,
    #[serde(default)]
    pub behavior: Vec<String>,
}

impl MetricCatalogue {
    pub fn categories(&self) -> [(&'static str, &[String]); 4] {
        [
            ("environmental", &self.environmental),
            ("immediate", &self.immediate),
            ("state", &self.state),
            ("behavior", &self.behavior),
        ]
    }

    /// All measure names, flattened in category order.
    pub fn all_names(&self) -> Vec<&str> {
        self.categories()
            .into_iter()
            .flat_map(|(_, names)| names.iter().map(String::as_str))
            .collect()
    }

    pub fn category_of(&self, name: &str) -> Option<&'static str> {
        self.categories()
            .into_iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(category, _)| category)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.category_of(name).is_some()
    }

    /// Measure names that appear in more than one category (or twice in the
    /// same one).
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut dupes = Vec::new();
        for name in self.all_names() {
            if !seen.insert(name) && !dupes.contains(&name) {
                dupes.push(name);
            }
        }
        dupes
    }

    pub fn len(&self) -> usize {
        self.categories()
            .into_iter()
            .map(|(_, names)| names.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single aggregator to instantiate: the class to use and the value
/// record handed to it. Loaded once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSpec {
    pub class_string: String,
    pub config: AggregatorConfig,
}

impl AggregatorSpec {
    /// The bare class name: text after the last `:` or `.` of
    /// `class_string`, e.g. `metrics.aggregators:AggregatorPopulationMean`
    /// gives `AggregatorPopulationMean`.
    pub fn class_name(&self) -> &str {
        let tail = self
            .class_string
            .rsplit(':')
            .next()
            .unwrap_or(&self.class_string);
        tail.rsplit('.').next().unwrap_or(tail)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Measure names this aggregator pulls from the catalogue.
    pub keys_measures: Vec<String>,
    /// Population cap the aggregator sizes its buffers for. Must match the
    /// experiment's `n_agents_max`.
    pub n_agents: u32,
    /// Prefix appended to each emitted metric key.
    pub prefix_metric: String,
    /// Class-specific knobs pass through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub do_video: bool,
    pub n_steps_per_video: u64,
    pub fps_video: u32,
    pub dir_videos: String,
    pub height_max_video: u32,
    pub width_max_video: u32,
    #[serde(default)]
    pub dict_name_channel_to_color_tag: BTreeMap<String, String>,
}

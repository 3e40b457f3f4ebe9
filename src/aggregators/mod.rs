//! Registry of aggregator classes referenced by `class_string` in the
//! configuration. The registry knows each class's scope and the metric keys
//! it will emit; the reductions themselves run inside the simulation engine.

pub mod lifespan;
pub mod population;

use crate::metrics::AggregatorConfig;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorScope {
    /// Summarizes over a single agent's lifetime.
    Lifespan,
    /// Summarizes across all currently-alive agents.
    Population,
}

impl fmt::Display for AggregatorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorScope::Lifespan => write!(f, "lifespan"),
            AggregatorScope::Population => write!(f, "population"),
        }
    }
}

pub trait AggregatorClass: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn scope(&self) -> AggregatorScope;

    /// The metric keys this class emits for a given config, one per pulled
    /// measure, as `{measure}/{prefix_metric}`.
    fn output_keys(&self, config: &AggregatorConfig) -> Vec<String> {
        config
            .keys_measures
            .iter()
            .map(|measure| format!("{}/{}", measure, config.prefix_metric))
            .collect()
    }

    /// Class-independent config sanity shared by the builtins.
    fn check(&self, config: &AggregatorConfig) -> Result<()> {
        if config.keys_measures.is_empty() {
            bail!("{}: keys_measures must be non-empty", self.name());
        }
        if config.n_agents == 0 {
            bail!("{}: n_agents must be at least 1", self.name());
        }
        if config.prefix_metric.is_empty() {
            bail!("{}: prefix_metric must be non-empty", self.name());
        }
        Ok(())
    }
}

pub struct AggregatorRegistry {
    classes: HashMap<String, Box<dyn AggregatorClass>>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            classes: HashMap::new(),
        };
        registry.register_builtin();
        registry
    }

    fn register_builtin(&mut self) {
        self.register(Box::new(lifespan::LifespanCumulative));
        self.register(Box::new(lifespan::LifespanAverage));
        self.register(Box::new(lifespan::LifespanVariation));
        self.register(Box::new(population::PopulationMean));
        self.register(Box::new(population::PopulationStd));
    }

    pub fn register(&mut self, class: Box<dyn AggregatorClass>) {
        self.classes.insert(class.name().to_string(), class);
    }

    pub fn get(&self, class_name: &str) -> Option<&dyn AggregatorClass> {
        self.classes.get(class_name).map(|c| c.as_ref())
    }

    /// Resolve a full `class_string` such as
    /// `metrics.aggregators:AggregatorPopulationMean` down to its bare class
    /// name and look it up.
    pub fn resolve(&self, class_string: &str) -> Option<&dyn AggregatorClass> {
        let tail = class_string.rsplit(':').next().unwrap_or(class_string);
        let tail = tail.rsplit('.').next().unwrap_or(tail);
        self.get(tail)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static AggregatorRegistry {
        use std::sync::OnceLock;
        static REGISTRY: OnceLock<AggregatorRegistry> = OnceLock::new();
        REGISTRY.get_or_init(AggregatorRegistry::new)
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

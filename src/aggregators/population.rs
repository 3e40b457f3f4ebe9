use super::{AggregatorClass, AggregatorScope};

/// Mean of each pulled measure across the currently-alive agents.
#[derive(Debug, Clone, Copy)]
pub struct PopulationMean;

impl AggregatorClass for PopulationMean {
    fn name(&self) -> &str {
        "AggregatorPopulationMean"
    }

    fn scope(&self) -> AggregatorScope {
        AggregatorScope::Population
    }
}

/// Standard deviation of each pulled measure across the currently-alive
/// agents.
#[derive(Debug, Clone, Copy)]
pub struct PopulationStd;

impl AggregatorClass for PopulationStd {
    fn name(&self) -> &str {
        "AggregatorPopulationStd"
    }

    fn scope(&self) -> AggregatorScope {
        AggregatorScope::Population
    }
}

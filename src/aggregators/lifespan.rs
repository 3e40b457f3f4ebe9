use super::{AggregatorClass, AggregatorScope};

/// Running sum of each pulled measure over an agent's lifetime, emitted when
/// the agent dies.
#[derive(Debug, Clone, Copy)]
pub struct LifespanCumulative;

impl AggregatorClass for LifespanCumulative {
    fn name(&self) -> &str {
        "AggregatorLifespanCumulative"
    }

    fn scope(&self) -> AggregatorScope {
        AggregatorScope::Lifespan
    }
}

/// Lifetime sum divided by the agent's age at death.
#[derive(Debug, Clone, Copy)]
pub struct LifespanAverage;

impl AggregatorClass for LifespanAverage {
    fn name(&self) -> &str {
        "AggregatorLifespanAverage"
    }

    fn scope(&self) -> AggregatorScope {
        AggregatorScope::Lifespan
    }
}

/// Spread of each pulled measure over an agent's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct LifespanVariation;

impl AggregatorClass for LifespanVariation {
    fn name(&self) -> &str {
        "AggregatorLifespanVariation"
    }

    fn scope(&self) -> AggregatorScope {
        AggregatorScope::Lifespan
    }
}

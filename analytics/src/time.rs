use chrono::TimeDelta;

/// A time interval that a metric (e.g. [`SharpeRatio`](crate::metric::sharpe::SharpeRatio))
/// was measured over, or can be rescaled to.
///
/// Implementations only need to report their length as a [`TimeDelta`] — scaling between
/// intervals (eg/ daily Sharpe -> annualized Sharpe) is done assuming IID returns, via
/// `sqrt(target_seconds / current_seconds)`.
pub trait TimeInterval: Copy + Clone + std::fmt::Debug + PartialEq {
    fn interval(&self) -> TimeDelta;
}

impl TimeInterval for TimeDelta {
    fn interval(&self) -> TimeDelta {
        *self
    }
}

/// One trading day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub struct Daily;

impl TimeInterval for Daily {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(1)
    }
}

/// A calendar year of 365 days.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub struct Annual365;

impl TimeInterval for Annual365 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(365)
    }
}

/// A trading year of 252 business days, the convention used by
/// [`MetricsAccumulator::finalize`](crate::accumulator::MetricsAccumulator::finalize) for
/// `volatility`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
pub struct Annual252;

impl TimeInterval for Annual252 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(252)
    }
}

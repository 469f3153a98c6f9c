//! Builder pattern for configuring scans

use crate::models::{FilterRule, FilterThresholds};
use crate::services::{HistoryProvider, LoggingObserver, ScanConfig, ScanObserver, ScanService};
use std::sync::Arc;

/// Fluent setup for a [`ScanService`].
///
/// # Example
/// ```rust
/// use bullish_scanner::api::ScanBuilder;
/// use bullish_scanner::services::InMemoryProvider;
///
/// let service = ScanBuilder::new(InMemoryProvider::new())
///     .with_max_results(10)
///     .with_concurrency(8)
///     .scored(4)
///     .build();
/// assert_eq!(service.config().max_results, 10);
/// ```
pub struct ScanBuilder {
    provider: Arc<dyn HistoryProvider>,
    config: ScanConfig,
    observer: Option<Arc<dyn ScanObserver>>,
    log_progress: bool,
}

impl ScanBuilder {
    pub fn new(provider: impl HistoryProvider + 'static) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    pub fn from_shared(provider: Arc<dyn HistoryProvider>) -> Self {
        Self {
            provider,
            config: ScanConfig::default(),
            observer: None,
            log_progress: false,
        }
    }

    pub fn with_rule(mut self, rule: FilterRule) -> Self {
        self.config.rule = rule;
        self
    }

    /// Use the four-condition filter with custom thresholds
    pub fn with_thresholds(self, thresholds: FilterThresholds) -> Self {
        self.with_rule(FilterRule::Conditions(thresholds))
    }

    /// Use the weighted-points rule set
    pub fn scored(self, min_score: u8) -> Self {
        self.with_rule(FilterRule::Scored { min_score })
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.config.max_results = max_results;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Log progress for a scan of `total` symbols unless a custom observer is set
    pub fn log_progress(mut self, enabled: bool) -> Self {
        self.log_progress = enabled;
        self
    }

    pub fn build_for(self, total: usize) -> ScanService {
        let observer = match (self.observer, self.log_progress) {
            (Some(observer), _) => Some(observer),
            (None, true) => Some(Arc::new(LoggingObserver::new(total)) as Arc<dyn ScanObserver>),
            (None, false) => None,
        };

        let service = ScanService::new(self.provider, self.config);
        match observer {
            Some(observer) => service.with_observer(observer),
            None => service,
        }
    }

    pub fn build(self) -> ScanService {
        self.build_for(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanResult;
    use crate::services::InMemoryProvider;

    #[test]
    fn defaults_match_canonical_scan() {
        let service = ScanBuilder::new(InMemoryProvider::new()).build();
        let config = service.config();
        assert_eq!(config.rule, FilterRule::default());
        assert_eq!(config.max_results, ScanResult::DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn overrides_are_applied() {
        let service = ScanBuilder::new(InMemoryProvider::new())
            .with_thresholds(FilterThresholds {
                rsi_max: 65.0,
                ..FilterThresholds::default()
            })
            .with_max_results(5)
            .with_concurrency(0)
            .log_progress(true)
            .build_for(100);

        let config = service.config();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.concurrency, 1);
        match &config.rule {
            FilterRule::Conditions(t) => assert_eq!(t.rsi_max, 65.0),
            other => panic!("unexpected rule {:?}", other),
        }
    }
}

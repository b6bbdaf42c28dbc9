// src/pipeline/aggregate.rs

//! Court-wide aggregation.
//!
//! Every (court, source) pair runs fetch, detection, extraction as its own
//! task under a per-source timeout, at most `max_concurrent` at a time.
//! Results are collected by source position, so the merge (sequence
//! numbering, normalization, windowing, sorting) never depends on the
//! order tasks happened to finish.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};

use super::cancel::CancelToken;
use crate::error::{AppError, Result};
use crate::models::{AggregateOutcome, Config, CourtSource, CourtStatus, DraftRecord, SourceFailure};
use crate::services::{DefaultFetcher, ExtractorRegistry, FormatDetector, Normalizer, SourceFetcher};
use crate::utils::subtract_business_days;

/// Runs the ingestion pipeline over many sources and merges the results.
pub struct Aggregator {
    fetcher: Arc<dyn SourceFetcher>,
    detector: FormatDetector,
    registry: ExtractorRegistry,
    normalizer: Normalizer,
    timeout: Duration,
    max_concurrent: usize,
    delay: Duration,
}

impl Aggregator {
    /// Aggregator with the HTTP/file fetcher and built-in extractors.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(DefaultFetcher::from_config(&config.fetch)?);
        let registry = ExtractorRegistry::from_config(&config.extraction)?;
        Ok(Self::new(config, fetcher, registry))
    }

    pub fn new(config: &Config, fetcher: Arc<dyn SourceFetcher>, registry: ExtractorRegistry) -> Self {
        Self {
            fetcher,
            detector: FormatDetector::new(),
            registry,
            normalizer: Normalizer::from_config(config),
            timeout: config.fetch.timeout(),
            max_concurrent: config.fetch.max_concurrent.max(1),
            delay: Duration::from_millis(config.fetch.request_delay_ms),
        }
    }

    /// Override the per-source budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Aggregate records from the last `window_days` business days, counted
    /// back from the local date.
    pub async fn aggregate(
        &self,
        sources: &[CourtSource],
        window_days: u32,
        cancel: &CancelToken,
    ) -> Result<AggregateOutcome> {
        let today = Local::now().date_naive();
        self.aggregate_at(sources, window_days, today, cancel).await
    }

    /// Same as `aggregate` with an explicit reference date.
    ///
    /// Fails only with `Cancelled`; per-source errors land in the outcome.
    /// A cancelled run drops every in-flight task and returns nothing.
    pub async fn aggregate_at(
        &self,
        sources: &[CourtSource],
        window_days: u32,
        today: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<AggregateOutcome> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let runs = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::warn!("Aggregation cancelled, discarding partial results");
                return Err(AppError::Cancelled);
            }
            runs = self.run_all(sources) => runs,
        };

        Ok(self.merge(sources, runs, window_days, today))
    }

    /// Run every source concurrently; results come back in source order.
    async fn run_all(&self, sources: &[CourtSource]) -> Vec<Result<Vec<DraftRecord>>> {
        let mut runs: Vec<(usize, Result<Vec<DraftRecord>>)> = stream::iter(sources.iter().enumerate())
            .map(|(idx, source)| async move { (idx, self.run_source(source).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        runs.sort_by_key(|(idx, _)| *idx);
        runs.into_iter().map(|(_, run)| run).collect()
    }

    async fn run_source(&self, source: &CourtSource) -> Result<Vec<DraftRecord>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match tokio::time::timeout(self.timeout, self.process(source)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.timeout)),
        }
    }

    async fn process(&self, source: &CourtSource) -> Result<Vec<DraftRecord>> {
        let raw = self.fetcher.fetch(&source.url).await?;
        let format = self.detector.detect(&raw)?;
        let drafts = self.registry.extract(format, &raw).await?;
        log::debug!(
            "Court {}: {} drafts from {} ({})",
            source.court_id,
            drafts.len(),
            source.url,
            format
        );
        Ok(drafts)
    }

    fn merge(
        &self,
        sources: &[CourtSource],
        runs: Vec<Result<Vec<DraftRecord>>>,
        window_days: u32,
        today: NaiveDate,
    ) -> AggregateOutcome {
        let since = subtract_business_days(today, window_days);
        let mut outcome = AggregateOutcome {
            source_total: sources.len(),
            ..AggregateOutcome::default()
        };

        // Sequences run per court across its sources, in configured order
        let mut next_sequence: HashMap<u32, usize> = HashMap::new();
        let mut seen_ids = HashSet::new();

        for (source, run) in sources.iter().zip(runs) {
            let drafts = match run {
                Ok(drafts) => drafts,
                Err(error) => {
                    log::warn!(
                        "Court {} source {} failed: {}",
                        source.court_id,
                        source.url,
                        error
                    );
                    outcome.failures.push(SourceFailure {
                        court_id: source.court_id,
                        source_url: source.url.clone(),
                        kind: error.failure_kind(),
                        message: error.to_string(),
                    });
                    continue;
                }
            };

            for mut draft in drafts {
                let sequence = next_sequence.entry(source.court_id).or_default();
                draft.sequence = *sequence;
                *sequence += 1;

                let status = match self.normalizer.normalize(&draft, source.court_id) {
                    Ok(status) => status,
                    Err(reason) => {
                        log::debug!(
                            "Rejected draft {} from {}: {}",
                            draft.sequence,
                            source.url,
                            reason
                        );
                        outcome.rejected += 1;
                        continue;
                    }
                };

                if status.date < since {
                    outcome.out_of_window += 1;
                    continue;
                }
                if !seen_ids.insert(status.id.clone()) {
                    log::debug!("Duplicate id {} from {}, keeping the first", status.id, source.url);
                    continue;
                }
                outcome.records.push(status);
            }
        }

        outcome.records.sort_by(compare_records);
        outcome
            .failures
            .sort_by(|a, b| (a.court_id, &a.source_url).cmp(&(b.court_id, &b.source_url)));
        outcome
    }
}

/// Date descending, then court ascending, then case number ascending.
pub fn compare_records(a: &CourtStatus, b: &CourtStatus) -> Ordering {
    b.date
        .cmp(&a.date)
        .then(a.court_id.cmp(&b.court_id))
        .then_with(|| a.case_number.cmp(&b.case_number))
}

/// Aggregate every configured source and log a summary.
pub async fn run_aggregator(
    config: &Config,
    window_days: u32,
    cancel: &CancelToken,
) -> Result<AggregateOutcome> {
    let sources = config.sources();
    log::info!(
        "Aggregating {} sources from {} courts, last {} business days",
        sources.len(),
        config.courts.len(),
        window_days
    );

    let aggregator = Aggregator::from_config(config)?;
    let outcome = aggregator.aggregate(&sources, window_days, cancel).await?;

    log::info!(
        "{} records, {} of {} sources failed, {} drafts rejected, {} outside the window",
        outcome.records.len(),
        outcome.failures.len(),
        outcome.source_total,
        outcome.rejected,
        outcome.out_of_window
    );
    let review = outcome.low_confidence();
    if review > 0 {
        log::warn!("{} records need manual review", review);
    }

    Ok(outcome)
}

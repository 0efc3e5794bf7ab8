//! Crawl orchestration.
//!
//! `Orchestrator` drives the per-carrier loop: fetch the listing page,
//! extract candidates, optionally filter them by model, then fetch and
//! resolve each detail page and hand the record to a sink. Per-candidate
//! failures are logged and counted; they never stop the loop.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::CrawlerConfig;
use crate::error::{CrawlError, CrawlResult};
use crate::extractor::Extractor;
use crate::fetcher::PageSource;
use crate::normalizer::Normalizer;
use crate::registry::Registry;
use crate::storage::RecordSink;
use crate::types::{
    AircraftLinkCandidate, CarrierRecord, CarrierReport, CrawlPhase, CrawlRecord, CrawlStatistics,
    CrawlSummary,
};

enum CandidateOutcome {
    Recorded,
    NoImage,
}

/// Drives a crawl session over a page source and a record sink.
///
/// The visited set is scoped to the session: a detail URL that produced a
/// record is never processed again until [`Orchestrator::reset_session`].
pub struct Orchestrator<S, K> {
    config: CrawlerConfig,
    registry: Arc<Registry>,
    normalizer: Normalizer,
    extractor: Extractor,
    source: S,
    sink: K,
    visited: HashSet<String>,
    phase: CrawlPhase,
    records_written: usize,
}

impl<S: PageSource, K: RecordSink> Orchestrator<S, K> {
    pub fn new(config: CrawlerConfig, registry: Arc<Registry>, source: S, sink: K) -> Self {
        let extractor = Extractor::from_config(&config);
        Self {
            config,
            registry,
            normalizer: Normalizer::default(),
            extractor,
            source,
            sink,
            visited: HashSet::new(),
            phase: CrawlPhase::Idle,
            records_written: 0,
        }
    }

    /// Replace the keyword table used for filtering and labelling.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn is_visited(&self, detail_url: &str) -> bool {
        self.visited.contains(detail_url)
    }

    /// Forget visited URLs and session counters.
    pub fn reset_session(&mut self) {
        self.visited.clear();
        self.records_written = 0;
        self.phase = CrawlPhase::Idle;
    }

    pub fn statistics(&self) -> CrawlStatistics {
        CrawlStatistics {
            total_carriers: self.registry.len(),
            processed_urls: self.visited.len(),
            records_written: self.records_written,
        }
    }

    /// Crawl one carrier.
    ///
    /// Fails with `UnsupportedCarrier` before any request when `code` is not
    /// registered, and with `Fetch` when the listing page cannot be loaded.
    pub async fn crawl_carrier(
        &mut self,
        code: &str,
        model_filter: Option<&str>,
    ) -> CrawlResult<CarrierReport> {
        self.crawl_carrier_until(code, model_filter, &CancellationToken::new())
            .await
    }

    /// Crawl one carrier, stopping between candidates once `cancel` fires.
    pub async fn crawl_carrier_until(
        &mut self,
        code: &str,
        model_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> CrawlResult<CarrierReport> {
        let carrier = self
            .registry
            .lookup(code)
            .cloned()
            .ok_or_else(|| CrawlError::UnsupportedCarrier {
                code: code.trim().to_string(),
            })?;

        let result = self.run_carrier(&carrier, model_filter, cancel).await;
        self.phase = CrawlPhase::Done;
        result
    }

    async fn run_carrier(
        &mut self,
        carrier: &CarrierRecord,
        model_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> CrawlResult<CarrierReport> {
        let mut report = CarrierReport {
            iata_code: carrier.iata_code.clone(),
            ..Default::default()
        };
        let filter = model_filter.map(str::trim).filter(|m| !m.is_empty());

        info!(
            carrier = %carrier.iata_code,
            name = %carrier.display_name_secondary,
            filter = ?filter,
            "Crawling carrier"
        );

        self.phase = CrawlPhase::FetchingListing;
        let listing_url = self.config.listing_url(&carrier.iata_code);
        let html = self.source.fetch(&listing_url).await?;

        self.phase = CrawlPhase::ExtractingCandidates;
        let candidates = self.extractor.extract_candidates(&html, &listing_url)?;
        report.candidates_found = candidates.len();
        if candidates.is_empty() {
            warn!(carrier = %carrier.iata_code, url = %listing_url, "Listing page has no aircraft links");
        }

        for candidate in candidates {
            if cancel.is_cancelled() {
                info!(carrier = %carrier.iata_code, "Crawl cancelled between candidates");
                report.interrupted = true;
                break;
            }

            if let Some(wanted) = filter {
                if !self.normalizer.label_matches(&candidate.raw_label, wanted) {
                    report.candidates_filtered += 1;
                    continue;
                }
            }

            if self.visited.contains(&candidate.detail_url) {
                debug!(url = %candidate.detail_url, "Detail page already processed");
                report.already_visited += 1;
                continue;
            }

            match self.process_candidate(carrier, &candidate).await {
                Ok(CandidateOutcome::Recorded) => report.records_written += 1,
                Ok(CandidateOutcome::NoImage) => report.pages_without_image += 1,
                Err(CrawlError::Storage(e)) => {
                    warn!(url = %candidate.detail_url, error = %e, "Failed to store record");
                    report.storage_failures += 1;
                }
                Err(e) => {
                    warn!(url = %candidate.detail_url, error = %e, "Skipping detail page");
                    report.detail_failures += 1;
                }
            }
        }

        info!(
            carrier = %carrier.iata_code,
            found = report.candidates_found,
            written = report.records_written,
            failures = report.detail_failures + report.storage_failures,
            "Carrier finished"
        );
        Ok(report)
    }

    async fn process_candidate(
        &mut self,
        carrier: &CarrierRecord,
        candidate: &AircraftLinkCandidate,
    ) -> CrawlResult<CandidateOutcome> {
        self.phase = CrawlPhase::FetchingDetail;
        let html = self.source.fetch(&candidate.detail_url).await?;

        self.phase = CrawlPhase::ExtractingImage;
        let model = self.normalizer.canonicalize(&candidate.raw_label);
        let Some(image) = self
            .extractor
            .resolve_seatmap(&html, &candidate.detail_url, &model)?
        else {
            warn!(url = %candidate.detail_url, model = %model, "No seat-map image on detail page");
            return Ok(CandidateOutcome::NoImage);
        };

        self.phase = CrawlPhase::Recording;
        let record = CrawlRecord {
            carrier: carrier.clone(),
            model,
            image,
            detail_url: candidate.detail_url.clone(),
            crawled_at: Utc::now(),
        };
        self.sink.write(&record).await?;

        self.visited.insert(record.detail_url.clone());
        self.records_written += 1;
        debug!(
            carrier = %carrier.iata_code,
            model = %record.model,
            source = %record.image.source_url,
            "Recorded seat map"
        );
        Ok(CandidateOutcome::Recorded)
    }

    /// Crawl every registered carrier in code order.
    pub async fn crawl_all(
        &mut self,
        model_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> CrawlSummary {
        let codes: Vec<String> = self.registry.supported_codes().into_iter().collect();
        self.crawl_many(&codes, model_filter, cancel).await
    }

    /// Crawl the given carriers in order, pausing the carrier gap between
    /// them. Carrier failures are counted; cancellation returns the partial
    /// summary.
    pub async fn crawl_many(
        &mut self,
        codes: &[String],
        model_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        let gap = self.config.effective_carrier_gap();

        for (index, code) in codes.iter().enumerate() {
            if index > 0 && !gap.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(gap) => {}
                }
            }
            if cancel.is_cancelled() {
                info!(completed = summary.carriers_attempted, "Crawl cancelled");
                summary.interrupted = true;
                break;
            }

            summary.carriers_attempted += 1;
            match self.crawl_carrier_until(code, model_filter, cancel).await {
                Ok(report) => {
                    summary.total_records += report.records_written;
                    let interrupted = report.interrupted;
                    summary.reports.push(report);
                    if interrupted {
                        summary.interrupted = true;
                        break;
                    }
                }
                Err(e) => {
                    error!(carrier = %code, error = %e, "Carrier crawl failed");
                    summary.carriers_failed += 1;
                }
            }
        }

        info!(
            attempted = summary.carriers_attempted,
            failed = summary.carriers_failed,
            records = summary.total_records,
            interrupted = summary.interrupted,
            "Crawl finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySink;
    use crate::testing::{FailingSink, FixtureSource};
    use reqwest::StatusCode;
    use std::time::Duration;

    const BASE: &str = "https://catalog.test";

    fn config() -> CrawlerConfig {
        CrawlerConfig::default()
            .with_base_url(BASE)
            .with_delay(Duration::ZERO)
    }

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::from_records(vec![
            CarrierRecord::new("CA", "中国国际航空", "Air China"),
            CarrierRecord::new("MU", "中国东方航空", "China Eastern Airlines"),
        ]))
    }

    fn listing(slugs: &[&str]) -> String {
        slugs
            .iter()
            .map(|slug| {
                format!(
                    r#"<a href="/{slug}"><img src="https://images.squarespace-cdn.com/content/v1/thumb-{slug}.png"></a>"#
                )
            })
            .collect()
    }

    fn detail(file: &str) -> String {
        format!(
            r#"<img class="lazy" data-src="https://images.squarespace-cdn.com/content/v1/9/{file}">"#
        )
    }

    fn source() -> FixtureSource {
        FixtureSource::new()
            .with_page(
                format!("{BASE}/airline/ca"),
                listing(&["ca-a320", "ca-b777", "ca-b737"]),
            )
            .with_page(format!("{BASE}/ca-a320"), detail("CA_A320.png"))
            .with_page(format!("{BASE}/ca-b777"), detail("CA_B777.png"))
            .with_page(format!("{BASE}/ca-b737"), "<html><body>no image</body></html>")
    }

    #[tokio::test]
    async fn test_crawl_carrier_records_each_model() {
        let mut orchestrator = Orchestrator::new(config(), registry(), source(), MemorySink::new());

        let report = orchestrator.crawl_carrier("ca", None).await.unwrap();

        assert_eq!(report.candidates_found, 3);
        assert_eq!(report.records_written, 2);
        assert_eq!(report.pages_without_image, 1);
        assert_eq!(orchestrator.phase(), CrawlPhase::Done);

        let records = orchestrator.sink().records();
        assert_eq!(records[0].model, "A320");
        assert_eq!(records[0].carrier.display_name_secondary, "Air China");
        assert_eq!(records[1].image.filename, "CA_B777.png");
        assert!(orchestrator.is_visited(&format!("{BASE}/ca-a320")));
        assert!(!orchestrator.is_visited(&format!("{BASE}/ca-b737")));
    }

    #[tokio::test]
    async fn test_unsupported_carrier_makes_no_requests() {
        let source = source();
        let mut orchestrator =
            Orchestrator::new(config(), registry(), source.clone(), MemorySink::new());

        let err = orchestrator.crawl_carrier("ZZ", None).await.unwrap_err();

        assert!(matches!(err, CrawlError::UnsupportedCarrier { ref code } if code == "ZZ"));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_filter_skips_other_models() {
        let source = source();
        let mut orchestrator =
            Orchestrator::new(config(), registry(), source.clone(), MemorySink::new());

        let report = orchestrator
            .crawl_carrier("CA", Some("Boeing 777-300ER"))
            .await
            .unwrap();

        assert_eq!(report.candidates_filtered, 2);
        assert_eq!(report.records_written, 1);
        assert_eq!(orchestrator.sink().records()[0].model, "B777");
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_model_filter_outside_keyword_table() {
        let source = FixtureSource::new()
            .with_page(format!("{BASE}/airline/ca"), listing(&["ca-e190", "ca-a320"]))
            .with_page(format!("{BASE}/ca-e190"), detail("CA_E190.png"))
            .with_page(format!("{BASE}/ca-a320"), detail("CA_A320.png"));
        let mut orchestrator = Orchestrator::new(config(), registry(), source, MemorySink::new());

        let report = orchestrator.crawl_carrier("CA", Some("E190")).await.unwrap();

        assert_eq!(report.candidates_filtered, 1);
        assert_eq!(report.records_written, 1);
        assert_eq!(orchestrator.sink().records()[0].image.filename, "CA_E190.png");
    }

    #[tokio::test]
    async fn test_same_family_pages_each_recorded() {
        let source = FixtureSource::new()
            .with_page(format!("{BASE}/airline/ca"), listing(&["ca-a319", "ca-a321"]))
            .with_page(format!("{BASE}/ca-a319"), detail("CA_A319.png"))
            .with_page(format!("{BASE}/ca-a321"), detail("CA_A321.png"));
        let mut orchestrator = Orchestrator::new(config(), registry(), source, MemorySink::new());

        let report = orchestrator.crawl_carrier("CA", None).await.unwrap();
        let records = orchestrator.sink().records();

        assert_eq!(report.records_written, 2);
        assert!(records.iter().all(|r| r.model == "A320"));
        assert_ne!(records[0].image.filename, records[1].image.filename);
    }

    #[tokio::test]
    async fn test_detail_failure_does_not_stop_carrier() {
        let source = source().with_status(format!("{BASE}/ca-a320"), StatusCode::BAD_GATEWAY);
        let mut orchestrator = Orchestrator::new(config(), registry(), source, MemorySink::new());

        let report = orchestrator.crawl_carrier("CA", None).await.unwrap();

        assert_eq!(report.detail_failures, 1);
        assert_eq!(report.records_written, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_counted() {
        let mut orchestrator = Orchestrator::new(config(), registry(), source(), FailingSink::new());

        let report = orchestrator.crawl_carrier("CA", None).await.unwrap();

        assert_eq!(report.storage_failures, 2);
        assert_eq!(report.records_written, 0);
        assert_eq!(orchestrator.sink().attempts(), 2);
        assert_eq!(orchestrator.statistics().processed_urls, 0);
    }

    #[tokio::test]
    async fn test_listing_failure_surfaces() {
        let mut orchestrator =
            Orchestrator::new(config(), registry(), FixtureSource::new(), MemorySink::new());

        let err = orchestrator.crawl_carrier("MU", None).await.unwrap_err();

        assert!(matches!(err, CrawlError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_second_pass_skips_visited_until_reset() {
        let mut orchestrator = Orchestrator::new(config(), registry(), source(), MemorySink::new());

        orchestrator.crawl_carrier("CA", None).await.unwrap();
        let again = orchestrator.crawl_carrier("CA", None).await.unwrap();
        assert_eq!(again.already_visited, 2);
        assert_eq!(again.records_written, 0);
        assert_eq!(orchestrator.statistics().records_written, 2);

        orchestrator.reset_session();
        let fresh = orchestrator.crawl_carrier("CA", None).await.unwrap();
        assert_eq!(fresh.records_written, 2);
        assert_eq!(
            orchestrator.statistics(),
            CrawlStatistics {
                total_carriers: 2,
                processed_urls: 2,
                records_written: 2
            }
        );
    }

    #[tokio::test]
    async fn test_crawl_all_counts_failed_carriers() {
        let mut orchestrator = Orchestrator::new(config(), registry(), source(), MemorySink::new());

        let summary = orchestrator.crawl_all(None, &CancellationToken::new()).await;

        assert_eq!(summary.carriers_attempted, 2);
        assert_eq!(summary.carriers_failed, 1);
        assert_eq!(summary.total_records, 2);
        assert!(!summary.interrupted);
        assert_eq!(summary.reports[0].iata_code, "CA");
    }

    #[tokio::test]
    async fn test_crawl_all_stops_when_cancelled() {
        let source = source();
        let mut orchestrator =
            Orchestrator::new(config(), registry(), source.clone(), MemorySink::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = orchestrator.crawl_all(None, &cancel).await;

        assert!(summary.interrupted);
        assert_eq!(summary.carriers_attempted, 0);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_carrier_gap() {
        let config = config().with_carrier_gap(Duration::from_secs(30));
        let mut orchestrator = Orchestrator::new(config, registry(), source(), MemorySink::new());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = std::time::Instant::now();
        let summary = orchestrator.crawl_all(None, &cancel).await;

        assert!(summary.interrupted);
        assert_eq!(summary.carriers_attempted, 1);
        assert_eq!(summary.total_records, 2);
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}

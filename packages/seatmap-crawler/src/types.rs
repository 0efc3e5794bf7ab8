//! Record types flowing through the crawl pipeline.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A supported carrier, sourced from the static registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CarrierRecord {
    /// Upper-case IATA code (2-3 alphanumerics)
    pub iata_code: String,
    pub display_name_primary: String,
    pub display_name_secondary: String,
}

impl CarrierRecord {
    pub fn new(
        iata_code: impl Into<String>,
        primary: impl Into<String>,
        secondary: impl Into<String>,
    ) -> Self {
        Self {
            iata_code: iata_code.into(),
            display_name_primary: primary.into(),
            display_name_secondary: secondary.into(),
        }
    }
}

/// An aircraft-model detail page discovered on a carrier listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AircraftLinkCandidate {
    /// Absolute URL of the detail page
    pub detail_url: String,
    /// Trailing path segment of the detail URL, percent-decoded
    pub raw_label: String,
    pub thumbnail_url: String,
}

/// The single best-resolution seat-map image chosen for a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMapImageResult {
    pub source_url: String,
    pub canonical_model: String,
    /// Always ends in a recognized image extension
    pub filename: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One discovered (carrier, model) pair handed to the record sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub carrier: CarrierRecord,
    pub model: String,
    pub image: SeatMapImageResult,
    pub detail_url: String,
    pub crawled_at: DateTime<Utc>,
}

impl CrawlRecord {
    /// Flatten into the output row shape.
    pub fn to_row(&self) -> RecordRow {
        RecordRow::from(self)
    }
}

/// Flat output row written by sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    pub iata_code: String,
    pub display_name_primary: String,
    pub display_name_secondary: String,
    pub canonical_model: String,
    pub image_source_url: String,
    pub filename: String,
    pub detail_url: String,
    /// ISO-8601, second precision, `Z` suffix
    pub crawled_at: String,
}

impl From<&CrawlRecord> for RecordRow {
    fn from(record: &CrawlRecord) -> Self {
        Self {
            iata_code: record.carrier.iata_code.clone(),
            display_name_primary: record.carrier.display_name_primary.clone(),
            display_name_secondary: record.carrier.display_name_secondary.clone(),
            canonical_model: record.image.canonical_model.clone(),
            image_source_url: record.image.source_url.clone(),
            filename: record.image.filename.clone(),
            detail_url: record.detail_url.clone(),
            crawled_at: record.crawled_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Where a `crawl_carrier` invocation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    Idle,
    FetchingListing,
    ExtractingCandidates,
    FetchingDetail,
    ExtractingImage,
    Recording,
    Done,
}

/// Outcome of crawling one carrier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CarrierReport {
    pub iata_code: String,
    pub candidates_found: usize,
    /// Dropped by the model filter
    pub candidates_filtered: usize,
    /// Skipped because the session already processed the detail URL
    pub already_visited: usize,
    pub detail_failures: usize,
    pub pages_without_image: usize,
    pub storage_failures: usize,
    pub records_written: usize,
    /// Loop stopped early on cancellation
    pub interrupted: bool,
}

/// Outcome of crawling every registered carrier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub carriers_attempted: usize,
    pub carriers_failed: usize,
    pub total_records: usize,
    pub interrupted: bool,
    pub reports: Vec<CarrierReport>,
}

/// Session-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStatistics {
    pub total_carriers: usize,
    pub processed_urls: usize,
    pub records_written: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_row_flattens_record() {
        let record = CrawlRecord {
            carrier: CarrierRecord::new("CA", "中国国际航空", "Air China"),
            model: "A320".to_string(),
            image: SeatMapImageResult {
                source_url: "https://images.example.com/a/CA_A320.png".to_string(),
                canonical_model: "A320".to_string(),
                filename: "CA_A320.png".to_string(),
                width: Some(1600),
                height: None,
            },
            detail_url: "https://www.example.com/ca/a320".to_string(),
            crawled_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        };

        let row = record.to_row();

        assert_eq!(row.iata_code, "CA");
        assert_eq!(row.display_name_secondary, "Air China");
        assert_eq!(row.canonical_model, "A320");
        assert_eq!(row.filename, "CA_A320.png");
        assert_eq!(row.crawled_at, "2024-05-01T12:30:00Z");
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&CrawlPhase::FetchingListing).unwrap();
        assert_eq!(json, "\"fetching_listing\"");
    }
}

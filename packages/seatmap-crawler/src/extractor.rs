//! Listing and detail page extraction.
//!
//! The catalog site encodes a high-resolution image in one of three ways:
//!
//! - a descriptor list (`srcset`) of `"<url> <N>w"` entries
//! - a coordinate-resize path segment `/{x},{y},{srcW},{srcH},{outW},{outH}/`
//! - a plain source URL
//!
//! Detail page resolution tries them in that order.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::ParseError;
use crate::types::{AircraftLinkCandidate, SeatMapImageResult};

/// Extensions accepted as seat-map image filenames.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// Extension used when a filename has to be synthesized.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Attributes carrying the image source, most specific first.
const SOURCE_ATTRS: &[&str] = &["data-src", "data-image", "src"];

/// Attributes carrying a descriptor list.
const DESCRIPTOR_ATTRS: &[&str] = &["srcset", "data-srcset"];

/// Attributes that mark an image as deferred-loading.
const LAZY_ATTRS: &[&str] = &["data-src", "data-image", "data-srcset"];

lazy_static! {
    // x, y, source width, source height, output width, output height
    static ref COORDINATE_SEGMENT: Regex =
        Regex::new(r"/(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)/").unwrap();

    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
}

/// One entry of a descriptor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorEntry {
    pub url: String,
    pub width: u32,
}

/// Result of rewriting a coordinate-resize URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateRewrite {
    pub url: String,
    pub source_width: Option<u32>,
    pub source_height: Option<u32>,
}

/// Split a descriptor list into entries.
///
/// Entry URLs may contain commas in their query strings, so the list is only
/// split at a comma followed by whitespace and a new `http` URL.
pub fn split_descriptor_list(list: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut search_from = 0;

    while let Some(offset) = list[search_from..].find(',') {
        let comma = search_from + offset;
        let after = &list[comma + 1..];
        let rest = after.trim_start();
        if rest.len() < after.len() && rest.starts_with("http") {
            entries.push(&list[start..comma]);
            start = comma + 1;
        }
        search_from = comma + 1;
    }
    entries.push(&list[start..]);

    entries
        .into_iter()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect()
}

/// Parse a descriptor list, keeping entries with an integer `w` descriptor.
pub fn parse_descriptor_list(list: &str) -> Vec<DescriptorEntry> {
    split_descriptor_list(list)
        .into_iter()
        .filter_map(|entry| {
            let (url, descriptor) = entry.rsplit_once(char::is_whitespace)?;
            let width = descriptor.trim().strip_suffix('w')?.parse::<u32>().ok()?;
            let url = url.trim();
            if url.is_empty() {
                return None;
            }
            Some(DescriptorEntry {
                url: url.to_string(),
                width,
            })
        })
        .collect()
}

/// Pick the widest entry. The earliest entry wins a tie.
pub fn widest_descriptor(entries: &[DescriptorEntry]) -> Option<&DescriptorEntry> {
    entries.iter().fold(None, |best, entry| match best {
        Some(b) if b.width >= entry.width => Some(b),
        _ => Some(entry),
    })
}

/// Rewrite the output size of a coordinate-resize URL to its source size.
///
/// Only the first matching segment is touched and only its last two fields
/// change; everything else in the URL is kept byte for byte.
pub fn rewrite_coordinate_url(url: &str) -> Option<CoordinateRewrite> {
    let caps = COORDINATE_SEGMENT.captures(url)?;
    let whole = caps.get(0)?;
    let (x, y, src_w, src_h) = (&caps[1], &caps[2], &caps[3], &caps[4]);

    let mut rewritten = String::with_capacity(url.len() + 8);
    rewritten.push_str(&url[..whole.start()]);
    rewritten.push_str(&format!("/{x},{y},{src_w},{src_h},{src_w},{src_h}/"));
    rewritten.push_str(&url[whole.end()..]);

    Some(CoordinateRewrite {
        url: rewritten,
        source_width: src_w.parse().ok(),
        source_height: src_h.parse().ok(),
    })
}

/// Filename from the last path segment of `source`, if it is an image.
pub fn filename_from_source(source: &str) -> Option<String> {
    let path = match Url::parse(source) {
        Ok(url) => url.path().to_string(),
        Err(_) => source
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').find(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let (_, extension) = decoded.rsplit_once('.')?;
    if !IMAGE_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
        return None;
    }

    Some(sanitize_filename(&decoded))
}

/// Filename built from a model label and the default extension.
pub fn synthesize_filename(label: &str) -> String {
    let stem = sanitize_filename(label.trim());
    let stem = stem.trim_matches(|c| c == '.' || c == '_');
    if stem.is_empty() {
        format!("seatmap.{DEFAULT_EXTENSION}")
    } else {
        format!("{stem}.{DEFAULT_EXTENSION}")
    }
}

fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

/// Resolve `raw` against the page URL.
///
/// Absolute `http(s)` URLs are returned verbatim so later pattern rewrites
/// see exactly what the page served.
fn absolutize(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(raw.to_string());
    }
    if raw.starts_with("//") {
        return Some(format!("{}:{}", base.scheme(), raw));
    }
    base.join(raw).ok().map(|u| u.to_string())
}

fn first_attr<'a>(element: &ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

fn is_lazy(element: &ElementRef<'_>) -> bool {
    let el = element.value();
    LAZY_ATTRS.iter().any(|name| el.attr(name).is_some())
        || el
            .attr("loading")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("lazy"))
        || el.classes().any(|c| c.to_ascii_lowercase().contains("lazy"))
}

/// Dimensions reported by the markup itself.
fn reported_dimensions(element: &ElementRef<'_>) -> (Option<u32>, Option<u32>) {
    let el = element.value();
    if let Some((w, h)) = el
        .attr("data-image-dimensions")
        .and_then(|d| d.trim().split_once(['x', 'X']))
    {
        if let (Ok(w), Ok(h)) = (w.trim().parse(), h.trim().parse()) {
            return (Some(w), Some(h));
        }
    }
    let width = el.attr("width").and_then(|v| v.trim().parse().ok());
    let height = el.attr("height").and_then(|v| v.trim().parse().ok());
    (width, height)
}

fn parse_base(page_url: &str) -> Result<Url, ParseError> {
    Url::parse(page_url).map_err(|source| ParseError::InvalidBaseUrl {
        url: page_url.to_string(),
        source,
    })
}

/// Extracts aircraft links from listing pages and seat-map images from
/// detail pages.
#[derive(Debug, Clone)]
pub struct Extractor {
    image_host: String,
    seatmap_markers: Vec<String>,
}

impl Extractor {
    pub fn new(image_host: impl Into<String>, seatmap_markers: Vec<String>) -> Self {
        Self {
            image_host: image_host.into(),
            seatmap_markers,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.image_host.clone(), config.seatmap_markers.clone())
    }

    fn is_hosted(&self, source: &str) -> bool {
        !self.image_host.is_empty() && source.contains(&self.image_host)
    }

    fn is_logo(source: &str) -> bool {
        source.to_ascii_lowercase().contains("logo")
    }

    fn has_marker(&self, source: &str) -> bool {
        self.seatmap_markers.iter().any(|m| source.contains(m.as_str()))
    }

    /// Aircraft detail links on a carrier listing page, in document order,
    /// one per distinct resolved URL.
    pub fn extract_candidates(
        &self,
        html: &str,
        page_url: &str,
    ) -> Result<Vec<AircraftLinkCandidate>, ParseError> {
        let base = parse_base(page_url)?;
        let document = Html::parse_document(html);
        let Ok(img_selector) = Selector::parse("img") else {
            return Ok(vec![]);
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for img in document.select(&img_selector) {
            let Some(source) = first_attr(&img, SOURCE_ATTRS) else {
                continue;
            };
            if !self.is_hosted(source) || !self.has_marker(source) || Self::is_logo(source) {
                continue;
            }

            let Some(href) = img
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "a")
                .and_then(|a| a.value().attr("href"))
            else {
                debug!(src = %source, "Seat-map thumbnail has no enclosing link");
                continue;
            };

            let href = href.trim();
            if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
                continue;
            }

            let Some(mut detail_url) = absolutize(&base, href).and_then(|u| Url::parse(&u).ok()) else {
                debug!(href = %href, "Unresolvable listing link");
                continue;
            };
            detail_url.set_fragment(None);

            let Some(segment) = detail_url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            else {
                debug!(url = %detail_url, "Listing link has no model segment");
                continue;
            };
            let raw_label = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());

            let detail_url = detail_url.to_string();
            if !seen.insert(detail_url.clone()) {
                continue;
            }

            candidates.push(AircraftLinkCandidate {
                thumbnail_url: absolutize(&base, source).unwrap_or_else(|| source.to_string()),
                detail_url,
                raw_label,
            });
        }

        debug!(page = %page_url, candidates = candidates.len(), "Listing extraction finished");
        Ok(candidates)
    }

    /// The seat-map image on an aircraft detail page.
    ///
    /// The first qualifying image wins; pages carry at most one seat map, so
    /// widths are not compared across images.
    pub fn resolve_seatmap(
        &self,
        html: &str,
        page_url: &str,
        canonical_model: &str,
    ) -> Result<Option<SeatMapImageResult>, ParseError> {
        let base = parse_base(page_url)?;
        let document = Html::parse_document(html);
        let Ok(img_selector) = Selector::parse("img") else {
            return Ok(None);
        };

        for img in document.select(&img_selector) {
            let Some(raw_source) = first_attr(&img, SOURCE_ATTRS) else {
                continue;
            };
            if !self.is_hosted(raw_source) || Self::is_logo(raw_source) || !is_lazy(&img) {
                continue;
            }
            let Some(source) = absolutize(&base, raw_source) else {
                continue;
            };

            let (source_url, width, height) = self.effective_source(&img, &base, &source);
            let filename =
                filename_from_source(&source).unwrap_or_else(|| synthesize_filename(canonical_model));

            debug!(
                page = %page_url,
                source = %source_url,
                width = ?width,
                "Resolved seat-map image"
            );

            return Ok(Some(SeatMapImageResult {
                source_url,
                canonical_model: canonical_model.to_string(),
                filename,
                width,
                height,
            }));
        }

        debug!(page = %page_url, "No qualifying seat-map image");
        Ok(None)
    }

    /// Effective URL and dimensions for a qualifying image.
    fn effective_source(
        &self,
        img: &ElementRef<'_>,
        base: &Url,
        source: &str,
    ) -> (String, Option<u32>, Option<u32>) {
        if let Some(list) = first_attr(img, DESCRIPTOR_ATTRS) {
            let entries = parse_descriptor_list(list);
            if let Some(best) = widest_descriptor(&entries) {
                let url = absolutize(base, &best.url).unwrap_or_else(|| best.url.clone());
                return (url, Some(best.width), None);
            }
        }

        if let Some(rewrite) = rewrite_coordinate_url(source) {
            return (rewrite.url, rewrite.source_width, rewrite.source_height);
        }

        let (width, height) = reported_dimensions(img);
        (source.to_string(), width, height)
    }
}

use std::sync::Arc;

use cache::FileCache;
use kernel::VersionInfo;
use tracing::{info, instrument};

use super::ports::TagLister;
use crate::image_ref::parse_image_reference;
use crate::tag_parser;

/// Drives the filter/sort pipeline described in §4.E: parse the current
/// tag, list candidates, narrow to strictly-newer ones, drop unstable and
/// platform-specific candidates unless the current tag is itself such,
/// drop compound-version-suffix and narrower-segment-count candidates,
/// then sort stable-first/non-platform-first/semantic-first/descending.
pub struct CheckVersionUseCase {
    pub(crate) cache: Arc<FileCache>,
    tag_lister: Arc<dyn TagLister>,
}

struct Candidate {
    tag: String,
    version: kernel::VersionTuple,
    is_unstable: bool,
    is_platform_specific: bool,
}

impl CheckVersionUseCase {
    pub fn new(cache: Arc<FileCache>, tag_lister: Arc<dyn TagLister>) -> Self {
        Self { cache, tag_lister }
    }

    /// Cache-only lookup; never touches the network. Used by the
    /// inventory collector's read path.
    pub async fn get_cached_version(&self, image: &str) -> Option<VersionInfo> {
        let (value, valid) = self.cache.get(image).await;
        if !valid {
            return None;
        }
        match value {
            Some(serde_json::Value::Null) | None => None,
            Some(v) => serde_json::from_value(v).ok(),
        }
    }

    #[instrument(skip(self), fields(image = %image))]
    pub async fn check_for_newer_version(&self, image: &str) -> Option<VersionInfo> {
        let (value, valid) = self.cache.get(image).await;
        if valid {
            return match value {
                Some(serde_json::Value::Null) | None => None,
                Some(v) => serde_json::from_value(v).ok(),
            };
        }

        let (registry, repository, current_tag) = parse_image_reference(image);
        let Some(current_version) = tag_parser::parse(&current_tag) else {
            return None;
        };

        let tags = self.tag_lister.list_tags(&registry, &repository).await.unwrap_or_default();
        if tags.is_empty() {
            return None;
        }

        let candidates = Self::filtered_newer_candidates(&current_tag, &current_version, &tags);
        if candidates.is_empty() {
            self.cache.set(image, serde_json::Value::Null).await;
            return None;
        }

        let best = &candidates[0];
        let result = VersionInfo {
            tag: best.tag.clone(),
            parsed: best.version.clone(),
            is_stable: !best.is_unstable && !best.is_platform_specific,
            is_newer: true,
            digest: None,
        };

        self.cache.set(image, serde_json::to_value(&result).unwrap_or(serde_json::Value::Null)).await;
        info!(image, newer_tag = %result.tag, "newer version available");
        Some(result)
    }

    /// Returns the top `limit` newer candidates (not just the head) for a
    /// UI affordance listing upgrade choices. Reuses the same filter/sort
    /// pipeline; adds no new rule.
    pub async fn get_available_versions(&self, image: &str, limit: usize) -> Vec<VersionInfo> {
        let (registry, repository, current_tag) = parse_image_reference(image);
        let current_version = tag_parser::parse(&current_tag);
        let tags = self.tag_lister.list_tags(&registry, &repository).await.unwrap_or_default();

        let mut versions: Vec<VersionInfo> = tags
            .iter()
            .filter_map(|tag| {
                let parsed = tag_parser::parse(tag)?;
                let is_newer = current_version.as_ref().map(|c| &parsed > c).unwrap_or(false);
                Some(VersionInfo {
                    tag: tag.clone(),
                    is_stable: tag_parser::is_stable(tag),
                    is_newer,
                    parsed,
                    digest: None,
                })
            })
            .collect();

        versions.sort_by(|a, b| {
            (!a.is_stable, a.parsed.is_date_based, std::cmp::Reverse(a.parsed.clone()))
                .cmp(&(!b.is_stable, b.parsed.is_date_based, std::cmp::Reverse(b.parsed.clone())))
        });

        versions.truncate(limit);
        versions
    }

    fn filtered_newer_candidates(current_tag: &str, current_version: &kernel::VersionTuple, tags: &[String]) -> Vec<Candidate> {
        let current_unstable = tag_parser::is_unstable(current_tag);
        let current_platform_specific = tag_parser::is_platform_specific(current_tag);
        let current_segments = tag_parser::count_version_segments(current_tag);

        let mut candidates: Vec<Candidate> = tags
            .iter()
            .filter_map(|tag| {
                let version = tag_parser::parse(tag)?;
                if &version <= current_version {
                    return None;
                }

                let is_unstable = tag_parser::is_unstable(tag);
                if is_unstable && !current_unstable {
                    return None;
                }

                let is_platform_specific = tag_parser::is_platform_specific(tag);
                if is_platform_specific && !current_platform_specific {
                    return None;
                }

                if let Some(suffix) = &version.suffix {
                    if tag_parser::has_compound_version_suffix(suffix) {
                        return None;
                    }
                }

                if tag_parser::count_version_segments(tag) < current_segments {
                    return None;
                }

                Some(Candidate { tag: tag.clone(), version, is_unstable, is_platform_specific })
            })
            .collect();

        candidates.sort_by(|a, b| {
            (a.is_unstable, a.is_platform_specific, a.version.is_date_based, std::cmp::Reverse(a.version.clone()))
                .cmp(&(b.is_unstable, b.is_platform_specific, b.version.is_date_based, std::cmp::Reverse(b.version.clone())))
        });

        candidates
    }
}

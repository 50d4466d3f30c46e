use std::sync::OnceLock;

use kernel::VersionTuple;
use regex::Regex;

const LITERAL_REJECTS: [&str; 7] = ["latest", "stable", "edge", "dev", "nightly", "master", "main"];

const PLATFORM_SUFFIXES: [&str; 16] = [
    "windowsservercore",
    "nanoserver",
    "windows",
    "linux",
    "alpine",
    "slim",
    "buster",
    "bullseye",
    "bookworm",
    "arm64",
    "amd64",
    "armhf",
    "arm32v7",
    "arm64v8",
    "ltsc2019",
    "ltsc2022",
    "1809",
];

const UNSTABLE_INDICATORS: &[&str] = &[
    "develop",
    "dev",
    "beta",
    "alpha",
    "rc",
    "nightly",
    "unstable",
    "test",
    "snapshot",
    "canary",
    "preview",
    "pre",
    "edge",
    "experimental",
    "trunk",
    "master",
    "main",
    "next",
    "tip",
    "draft",
    "staging",
    "ci",
    "build",
    "hotfix",
];

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?(?:-(.+))?$").expect("static regex")
    })
}

fn compound_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+\.\d+\.\d+").expect("static regex"))
}

/// Tags containing any of these (word-split on `-._`) are platform-specific.
pub fn is_platform_specific(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    PLATFORM_SUFFIXES.iter().any(|s| lower.contains(s))
}

/// Word-boundary match against the unstable vocabulary, avoiding false
/// positives like `main` matching `maintenance` or `test` matching `latest`.
pub fn is_unstable(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    let parts: Vec<&str> = lower.split(['-', '.', '_']).collect();
    UNSTABLE_INDICATORS.iter().any(|indicator| parts.contains(indicator))
}

pub fn is_stable(tag: &str) -> bool {
    !is_unstable(tag) && !is_platform_specific(tag)
}

fn is_date_based_version(major: u32, minor: u32, patch: u32) -> bool {
    (2019..=2099).contains(&major) && (1..=12).contains(&minor) && (1..=31).contains(&patch)
}

/// Parses a tag into a comparable `VersionTuple`. Returns `None` for the
/// fixed literal vocabulary, for anything the pattern doesn't match, and
/// for bare integers (major-only, e.g. `"168"`) to avoid treating build
/// numbers as versions.
pub fn parse(tag: &str) -> Option<VersionTuple> {
    if LITERAL_REJECTS.contains(&tag) {
        return None;
    }

    let captures = version_pattern().captures(tag)?;
    let minor_group = captures.get(2)?;
    let _ = minor_group;

    let major: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minor: u32 = captures.get(2).map(|m| m.as_str()).unwrap_or("0").parse().ok()?;
    let patch: u32 = captures.get(3).map(|m| m.as_str()).unwrap_or("0").parse().ok()?;
    let build: u32 = captures.get(4).map(|m| m.as_str()).unwrap_or("0").parse().ok()?;
    let suffix = captures.get(5).map(|m| m.as_str().to_string());

    Some(VersionTuple {
        is_date_based: is_date_based_version(major, minor, patch),
        major,
        minor,
        patch,
        build,
        suffix,
    })
}

pub fn has_compound_version_suffix(suffix: &str) -> bool {
    compound_version_pattern().is_match(suffix)
}

/// Dotted-segment count of the numeric portion, ignoring any `v` prefix
/// and any trailing `-suffix`.
pub fn count_version_segments(tag: &str) -> usize {
    let stripped = tag.strip_prefix('v').unwrap_or(tag);
    let version_part = stripped.split('-').next().unwrap_or(stripped);
    version_part.matches('.').count() + 1
}

pub fn is_newer(current: &str, candidate: &str) -> bool {
    match (parse(current), parse(candidate)) {
        (Some(c), Some(n)) => n > c,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_literal_floating_tags() {
        for tag in LITERAL_REJECTS {
            assert!(parse(tag).is_none(), "{tag} should not parse");
        }
    }

    #[test]
    fn rejects_bare_integers() {
        assert!(parse("168").is_none());
    }

    #[test]
    fn parses_semantic_version_with_suffix() {
        let v = parse("2.15.0-ls123").unwrap();
        assert!(!v.is_date_based);
        assert_eq!((v.major, v.minor, v.patch), (2, 15, 0));
        assert_eq!(v.suffix.as_deref(), Some("ls123"));
    }

    #[test]
    fn parses_v_prefixed_tag() {
        let v = parse("v3.5.0").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (3, 5, 0));
    }

    #[test]
    fn detects_date_based_version() {
        let v = parse("2021.12.16").unwrap();
        assert!(v.is_date_based);
    }

    #[test]
    fn semantic_outranks_date_based() {
        let date = parse("2021.12.16").unwrap();
        let semantic = parse("1.0.0").unwrap();
        assert!(semantic > date);
    }

    #[test]
    fn unstable_uses_word_boundaries() {
        assert!(!is_unstable("maintenance-2.0"));
        assert!(!is_unstable("latest-ish"));
        assert!(is_unstable("2.0.0-beta.1"));
        assert!(is_unstable("main"));
    }

    #[test]
    fn platform_suffix_detection() {
        assert!(is_platform_specific("5.14.0-alpine"));
        assert!(!is_platform_specific("5.14.0"));
    }

    #[test]
    fn segment_counting_ignores_prefix_and_suffix() {
        assert_eq!(count_version_segments("v4.0.11"), 3);
        assert_eq!(count_version_segments("5.14.0.9383-ls272"), 4);
        assert_eq!(count_version_segments("5.14"), 2);
    }

    #[test]
    fn compound_suffix_detection() {
        assert!(has_compound_version_suffix("2.0.0.5344-ls5"));
        assert!(!has_compound_version_suffix("ls123"));
    }
}

/// Floating-tag rewrite mode, configured globally and applied per check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatingTagMode {
    Disabled,
    Latest,
    Major,
    Minor,
}

impl FloatingTagMode {
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "latest" => FloatingTagMode::Latest,
            "major" => FloatingTagMode::Major,
            "minor" => FloatingTagMode::Minor,
            _ => FloatingTagMode::Disabled,
        }
    }
}

/// Rewrites a concrete tag into the rolling track it should be checked
/// against. `disabled` passes the tag through unchanged, as does any
/// mode when the tag is already `latest`; otherwise `latest` mode
/// rewrites to the literal `latest` track; `major` keeps only the first
/// numeric segment plus any suffix (`5.2.1-ls123` -> `5`); `minor` keeps
/// the first two numeric segments plus suffix (`5.2.1-ls123` -> `5.2`).
pub fn rewrite(tag: &str, mode: FloatingTagMode) -> String {
    if mode == FloatingTagMode::Disabled || tag == "latest" {
        return tag.to_string();
    }
    match mode {
        FloatingTagMode::Disabled => tag.to_string(),
        FloatingTagMode::Latest => "latest".to_string(),
        FloatingTagMode::Major => rewrite_to_segments(tag, 1),
        FloatingTagMode::Minor => rewrite_to_segments(tag, 2),
    }
}

fn rewrite_to_segments(tag: &str, segments: usize) -> String {
    let (numeric, suffix) = match tag.split_once('-') {
        Some((n, s)) => (n, Some(s)),
        None => (tag, None),
    };
    let stripped = numeric.strip_prefix('v').unwrap_or(numeric);
    let kept: Vec<&str> = stripped.splitn(segments + 1, '.').take(segments).collect();
    if kept.is_empty() || kept.iter().any(|part| part.parse::<u64>().is_err()) {
        return tag.to_string();
    }
    let base = kept.join(".");
    match suffix {
        Some(s) => format!("{base}-{s}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_passes_through() {
        assert_eq!(rewrite("5.2.1-ls123", FloatingTagMode::Disabled), "5.2.1-ls123");
    }

    #[test]
    fn latest_mode_rewrites_to_the_latest_track() {
        assert_eq!(rewrite("5.2.1-ls123", FloatingTagMode::Latest), "latest");
    }

    #[test]
    fn any_mode_passes_through_when_tag_is_already_latest() {
        assert_eq!(rewrite("latest", FloatingTagMode::Latest), "latest");
        assert_eq!(rewrite("latest", FloatingTagMode::Major), "latest");
    }

    #[test]
    fn major_keeps_first_segment_plus_suffix() {
        assert_eq!(rewrite("5.2.1-ls123", FloatingTagMode::Major), "5-ls123");
    }

    #[test]
    fn minor_keeps_first_two_segments_plus_suffix() {
        assert_eq!(rewrite("5.2.1-ls123", FloatingTagMode::Minor), "5.2-ls123");
    }

    #[test]
    fn non_numeric_tag_is_left_untouched() {
        assert_eq!(rewrite("latest", FloatingTagMode::Major), "latest");
    }

    #[test]
    fn from_str_lossy_defaults_to_disabled() {
        assert_eq!(FloatingTagMode::from_str_lossy("bogus"), FloatingTagMode::Disabled);
        assert_eq!(FloatingTagMode::from_str_lossy("minor"), FloatingTagMode::Minor);
    }
}

use regex::Regex;
use std::sync::OnceLock;

const DANGEROUS_CHARS: [char; 10] = [',', '`', '|', ';', '&', '>', '<', '\\', '\n', '\r'];
const MAX_LEN: usize = 256;

fn image_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._/-]*(?::[a-zA-Z0-9._-]+)?$").expect("static regex")
    })
}

/// Conservative image-name validation: length, a restrictive character
/// class, and an explicit blocked-character set that covers shell
/// metacharacters the pattern alone wouldn't reject unambiguously.
pub fn validate_image_name(image: &str) -> bool {
    if image.is_empty() || image.len() > MAX_LEN {
        return false;
    }
    if image.chars().any(|c| DANGEROUS_CHARS.contains(&c) || c == '\0') {
        return false;
    }
    image_name_pattern().is_match(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_image_references() {
        assert!(validate_image_name("nginx:latest"));
        assert!(validate_image_name("ghcr.io/linuxserver/sonarr:4.0.17"));
        assert!(validate_image_name("library/redis"));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(!validate_image_name("nginx; rm -rf /"));
        assert!(!validate_image_name("nginx`whoami`"));
        assert!(!validate_image_name("nginx|cat"));
    }

    #[test]
    fn rejects_overlong_and_empty_names() {
        assert!(!validate_image_name(""));
        assert!(!validate_image_name(&"a".repeat(300)));
    }
}

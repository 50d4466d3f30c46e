/// Splits a full image reference into `(registry, repository, tag)`.
///
/// `nginx:latest` -> `(docker.io, library/nginx, latest)`
/// `linuxserver/plex:1.41.3` -> `(docker.io, linuxserver/plex, 1.41.3)`
/// `ghcr.io/user/repo:v1` -> `(ghcr.io, user/repo, v1)`
pub fn parse_image_reference(image: &str) -> (String, String, String) {
    let (name, tag) = split_name_and_tag(image);

    let parts: Vec<&str> = name.split('/').collect();
    if parts.len() == 1 {
        (String::from("docker.io"), format!("library/{}", parts[0]), tag)
    } else if parts[0].contains('.') || parts[0].contains(':') {
        (parts[0].to_string(), parts[1..].join("/"), tag)
    } else {
        (String::from("docker.io"), name, tag)
    }
}

fn split_name_and_tag(image: &str) -> (String, String) {
    if let Some(last_segment) = image.split(':').last() {
        if image.contains(':') && last_segment.contains('/') {
            return (image.to_string(), "latest".to_string());
        }
    }
    match image.rsplit_once(':') {
        Some((name, tag)) => (name.to_string(), tag.to_string()),
        None => (image.to_string(), "latest".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_image_resolves_to_library_namespace() {
        assert_eq!(parse_image_reference("nginx:latest"), ("docker.io".into(), "library/nginx".into(), "latest".into()));
    }

    #[test]
    fn hub_user_image_keeps_repository_path() {
        assert_eq!(
            parse_image_reference("linuxserver/plex:1.41.3"),
            ("docker.io".into(), "linuxserver/plex".into(), "1.41.3".into())
        );
    }

    #[test]
    fn registry_prefixed_image_splits_correctly() {
        assert_eq!(
            parse_image_reference("ghcr.io/user/repo:v1"),
            ("ghcr.io".into(), "user/repo".into(), "v1".into())
        );
    }

    #[test]
    fn port_in_registry_without_tag_defaults_to_latest() {
        assert_eq!(
            parse_image_reference("localhost:5000/repo"),
            ("localhost:5000".into(), "repo".into(), "latest".into())
        );
    }

    #[test]
    fn no_tag_defaults_to_latest() {
        assert_eq!(parse_image_reference("nginx"), ("docker.io".into(), "library/nginx".into(), "latest".into()));
    }
}

const LOCALHOST_ADDRESSES: [&str; 3] = ["127.0.0.1", "0.0.0.0", "localhost"];

/// Hostname extraction for UI link rendering: a local socket yields no
/// hostname; a TCP URL yields the stripped host without scheme or port.
/// Loopback addresses and bare single-label hostnames are discarded when
/// the endpoint represents the local engine.
pub struct HostnameExtractor;

impl HostnameExtractor {
    pub fn extract(url: &str, is_local_engine: bool) -> Option<String> {
        if url.starts_with("unix://") || url.starts_with("npipe://") {
            return None;
        }
        let without_scheme = url.split("://").last().unwrap_or(url);
        let host = without_scheme.split(':').next().unwrap_or(without_scheme);
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return None;
        }
        if LOCALHOST_ADDRESSES.contains(&host) {
            return None;
        }
        if is_local_engine && !host.contains('.') && !host.contains(':') {
            // A bare single-label hostname for the local engine is an
            // internal container/VM name, not useful for link rendering.
            return None;
        }
        Some(host.to_string())
    }
}

/// Priority chain for the hostname actually used in rendered links:
/// declared public hostname, then host IP (excluding loopback/any-address),
/// then the hostname the inbound request arrived on, then a last-resort
/// "localhost".
pub struct LinkHostnameResolver;

impl LinkHostnameResolver {
    pub fn resolve(
        public_hostname: Option<&str>,
        host_ip: Option<&str>,
        is_docker_host: bool,
        request_hostname: Option<&str>,
    ) -> String {
        if let Some(h) = public_hostname {
            if !h.is_empty() {
                return h.to_string();
            }
        }
        if !is_docker_host {
            if let Some(ip) = host_ip {
                if !LOCALHOST_ADDRESSES.contains(&ip) {
                    return ip.to_string();
                }
            }
        }
        if let Some(h) = request_hostname {
            if !h.is_empty() {
                return h.to_string();
            }
        }
        "localhost".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_socket_has_no_hostname() {
        assert_eq!(HostnameExtractor::extract("unix:///var/run/docker.sock", true), None);
    }

    #[test]
    fn tcp_url_strips_scheme_and_port() {
        assert_eq!(
            HostnameExtractor::extract("tcp://10.0.0.5:2375", false),
            Some("10.0.0.5".to_string())
        );
    }

    #[test]
    fn loopback_is_discarded() {
        assert_eq!(HostnameExtractor::extract("tcp://127.0.0.1:2375", false), None);
    }

    #[test]
    fn bare_label_discarded_only_for_local_engine() {
        assert_eq!(HostnameExtractor::extract("tcp://dockerhost:2375", true), None);
        assert_eq!(
            HostnameExtractor::extract("tcp://dockerhost:2375", false),
            Some("dockerhost".to_string())
        );
    }

    #[test]
    fn resolver_prefers_public_hostname() {
        assert_eq!(
            LinkHostnameResolver::resolve(Some("fleet.example.com"), Some("10.0.0.1"), false, None),
            "fleet.example.com"
        );
    }

    #[test]
    fn resolver_falls_back_to_request_hostname_then_localhost() {
        assert_eq!(
            LinkHostnameResolver::resolve(None, None, true, Some("ui.local")),
            "ui.local"
        );
        assert_eq!(LinkHostnameResolver::resolve(None, None, true, None), "localhost");
    }
}

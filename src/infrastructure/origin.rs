//! Origin safety classification
//!
//! Decides whether a browser-originated request's declared origin may be
//! trusted to carry session cookies. The allow-set is computed once per
//! classifier from deployment configuration and memoized; tests and live
//! configuration reloads can reset it.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, RwLock};

use http::{HeaderMap, Uri, header};
use tracing::debug;

use crate::config::{Config, Environment, OriginConfig, ServerLocation};

const SCHEMES: [&str; 2] = ["http", "https"];

/// Classifies request origins against the deployment's allow-set
pub struct OriginSafetyClassifier {
    environment: Environment,
    port: u16,
    config: OriginConfig,
    allowed: RwLock<Option<Arc<HashSet<String>>>>,
}

impl OriginSafetyClassifier {
    pub fn new(environment: Environment, port: u16, config: OriginConfig) -> Self {
        Self {
            environment,
            port,
            config,
            allowed: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.server.environment,
            config.server.port,
            config.origin.clone(),
        )
    }

    /// Whether the request's declared origin is trusted for cookie auth.
    ///
    /// Outside production every origin is safe. In production the `Origin`
    /// header is consulted first, then `Referer`; a request declaring
    /// neither is unsafe.
    pub fn is_safe_origin(&self, headers: &HeaderMap) -> bool {
        if !self.environment.is_production() {
            return true;
        }

        let declared = headers
            .get(header::ORIGIN)
            .or_else(|| headers.get(header::REFERER))
            .and_then(|value| value.to_str().ok());

        let Some(declared) = declared else {
            return false;
        };

        let Some((origin, host)) = extract_origin(declared) else {
            return false;
        };

        if self.allowed_origins().contains(&origin) {
            return true;
        }

        // A co-located proxy may legitimately see RFC1918 peers.
        if self.config.location == ServerLocation::Local {
            if let Ok(address) = host.parse::<Ipv4Addr>() {
                return address.is_private();
            }
        }

        false
    }

    /// Drop the memoized allow-set so the next check recomputes it from
    /// current configuration.
    pub fn reset_cached_origins(&self) {
        *self
            .allowed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn allowed_origins(&self) -> Arc<HashSet<String>> {
        if let Some(set) = self
            .allowed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return Arc::clone(set);
        }

        let set = Arc::new(self.build_allow_set());
        debug!(origins = set.len(), "computed safe origin allow-set");

        // Recomputation is idempotent; a racing writer produces the same set.
        let mut slot = self
            .allowed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slot.get_or_insert(set))
    }

    fn build_allow_set(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        let port = self.port;

        let public_ip = self.config.public_ip.trim().to_ascii_lowercase();
        if !public_ip.is_empty() {
            for scheme in SCHEMES {
                set.insert(format!("{scheme}://{public_ip}"));
                set.insert(format!("{scheme}://{public_ip}:{port}"));
            }
        }

        for host in self.config.virtual_hosts.split(',') {
            let host = host.trim().to_ascii_lowercase();
            if host.is_empty() {
                continue;
            }
            for scheme in SCHEMES {
                set.insert(format!("{scheme}://{host}"));
                if !host.starts_with("www.") {
                    set.insert(format!("{scheme}://www.{host}"));
                }
            }
        }

        if self.config.location == ServerLocation::Local {
            for scheme in SCHEMES {
                set.insert(format!("{scheme}://localhost"));
                set.insert(format!("{scheme}://localhost:{port}"));
            }
        }

        set
    }
}

/// Reduce a declared `Origin`/`Referer` value to its scheme://host(:port)
/// component plus the bare host. Values without a scheme or host (including
/// the literal opaque-origin string `null`) yield `None`.
fn extract_origin(value: &str) -> Option<(String, String)> {
    let uri: Uri = value.trim().parse().ok()?;
    let scheme = uri.scheme_str()?.to_ascii_lowercase();
    let host = uri.host()?.to_ascii_lowercase();
    let origin = match uri.port_u16() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    };
    Some((origin, host))
}

/// Whether `value` is a syntactically valid IPv4 or IPv6 literal.
pub fn is_valid_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

/// Whether `value` is a bare domain name: two or more dot-separated DNS
/// labels, no scheme, port, or path component.
pub fn is_valid_domain(value: &str) -> bool {
    if value.is_empty() || value.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = value.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn production_classifier(location: ServerLocation) -> OriginSafetyClassifier {
        OriginSafetyClassifier::new(
            Environment::Production,
            3000,
            OriginConfig {
                public_ip: "123.69.4.20".to_string(),
                location,
                virtual_hosts: "testsite.com,www.testsite.com".to_string(),
            },
        )
    }

    #[test]
    fn development_mode_trusts_everything() {
        let classifier = OriginSafetyClassifier::new(
            Environment::Development,
            3000,
            OriginConfig::default(),
        );
        assert!(classifier.is_safe_origin(&HeaderMap::new()));
        assert!(classifier.is_safe_origin(&headers_with(
            header::ORIGIN,
            "https://anything.example"
        )));
    }

    #[test]
    fn missing_headers_are_unsafe_in_production() {
        let classifier = production_classifier(ServerLocation::Remote);
        assert!(!classifier.is_safe_origin(&HeaderMap::new()));
    }

    #[test]
    fn referer_is_consulted_when_origin_absent() {
        let classifier = production_classifier(ServerLocation::Remote);
        assert!(classifier.is_safe_origin(&headers_with(
            header::REFERER,
            "https://testsite.com/some/page?q=1"
        )));
    }

    #[test]
    fn host_comparison_is_case_insensitive() {
        let classifier = production_classifier(ServerLocation::Remote);
        assert!(classifier.is_safe_origin(&headers_with(
            header::ORIGIN,
            "https://TestSite.COM"
        )));
    }

    #[test]
    fn opaque_null_origin_is_unsafe() {
        let classifier = production_classifier(ServerLocation::Remote);
        assert!(!classifier.is_safe_origin(&headers_with(header::ORIGIN, "null")));
    }

    #[test]
    fn reset_recomputes_from_current_config() {
        let classifier = production_classifier(ServerLocation::Remote);
        assert!(classifier.is_safe_origin(&headers_with(header::ORIGIN, "https://testsite.com")));
        classifier.reset_cached_origins();
        assert!(classifier.is_safe_origin(&headers_with(header::ORIGIN, "https://testsite.com")));
    }

    #[test]
    fn valid_ip_literals() {
        assert!(is_valid_ip("192.168.0.1"));
        assert!(is_valid_ip("0.0.0.0"));
        assert!(is_valid_ip("255.255.255.255"));
        assert!(is_valid_ip("::1"));
        assert!(is_valid_ip("2001:db8::8a2e:370:7334"));
        assert!(is_valid_ip("::ffff:192.0.2.128"));
    }

    #[test]
    fn invalid_ip_literals() {
        assert!(!is_valid_ip("256.0.0.1"));
        assert!(!is_valid_ip("1.2.3"));
        assert!(!is_valid_ip("01.2.3.4"));
        assert!(!is_valid_ip("1.2.3.4.5"));
        assert!(!is_valid_ip("example.com"));
        assert!(!is_valid_ip(""));
    }

    #[test]
    fn valid_domains() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("sub.example.co.uk"));
        assert!(is_valid_domain("my-site.example"));
    }

    #[test]
    fn invalid_domains() {
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain(".example.com"));
        assert!(!is_valid_domain("example.com."));
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("https://example.com"));
        assert!(!is_valid_domain("example.com/path"));
        assert!(!is_valid_domain("-bad.example.com"));
        assert!(!is_valid_domain(""));
    }
}

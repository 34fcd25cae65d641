//! URL and endpoint-config validation for webhook destinations.
//!
//! Validates destination URLs against:
//! - Protocol requirements (HTTPS in production)
//! - SSRF protections (private/internal IP ranges, cloud metadata endpoints)
//! - HTTP method allow-list

use std::net::IpAddr;

use crate::error::WebhookError;

/// Knobs relaxing URL validation for development and test environments.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlPolicy {
    /// Permit plain `http://` destinations.
    pub allow_http: bool,
    /// Permit loopback/private destinations (wiremock, local stacks).
    pub allow_private_hosts: bool,
}

// ---------------------------------------------------------------------------
// URL validation
// ---------------------------------------------------------------------------

/// Validate a webhook destination URL.
///
/// Checks:
/// 1. URL is parseable
/// 2. Scheme is HTTPS (or HTTP if the policy allows it)
/// 3. Host is not a private/internal address (SSRF protection)
pub fn validate_destination_url(url: &str, policy: UrlPolicy) -> Result<(), WebhookError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| WebhookError::InvalidUrl(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if policy.allow_http => {}
        "http" => {
            return Err(WebhookError::InvalidUrl(
                "Webhook URLs must use HTTPS".to_string(),
            ));
        }
        scheme => {
            return Err(WebhookError::InvalidUrl(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| WebhookError::InvalidUrl("URL must have a host".to_string()))?;

    if !policy.allow_private_hosts {
        validate_host_not_internal(host)?;
    }

    Ok(())
}

/// Validate the configured HTTP method for an endpoint.
///
/// Only methods that carry a body make sense for webhook delivery.
pub fn validate_http_method(method: &str) -> Result<(), WebhookError> {
    match method.to_ascii_uppercase().as_str() {
        "POST" | "PUT" | "PATCH" => Ok(()),
        other => Err(WebhookError::Validation(format!(
            "Unsupported HTTP method: {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate that a host is not a private/internal address.
///
/// Blocks:
/// - Loopback addresses (127.0.0.0/8)
/// - Private networks (10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16)
/// - Link-local (169.254.0.0/16 — AWS/Azure/GCP metadata endpoint)
/// - CGNAT (100.64.0.0/10)
/// - IPv6 loopback and unspecified
/// - Internal hostnames (localhost, *.internal, *.local)
pub fn validate_host_not_internal(host: &str) -> Result<(), WebhookError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(WebhookError::SsrfDetected(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost"
        || lower == "metadata.google.internal"
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(WebhookError::SsrfDetected(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

/// Check if an IP address belongs to a private/internal range.
fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()                // 127.0.0.0/8
                || v4.is_private()          // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                || v4.is_link_local()       // 169.254.0.0/16
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10 (CGNAT)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> UrlPolicy {
        UrlPolicy::default()
    }

    // --- URL validation ---

    #[test]
    fn test_valid_https_url() {
        assert!(validate_destination_url("https://example.com/webhooks", strict()).is_ok());
    }

    #[test]
    fn test_valid_https_url_with_port() {
        assert!(
            validate_destination_url("https://hooks.example.com:8443/callback", strict()).is_ok()
        );
    }

    #[test]
    fn test_http_url_rejected_by_default() {
        let result = validate_destination_url("http://example.com/webhooks", strict());
        assert!(matches!(result.unwrap_err(), WebhookError::InvalidUrl(_)));
    }

    #[test]
    fn test_http_url_allowed_in_dev() {
        let policy = UrlPolicy {
            allow_http: true,
            ..UrlPolicy::default()
        };
        assert!(validate_destination_url("http://example.com/webhooks", policy).is_ok());
    }

    #[test]
    fn test_invalid_url_format() {
        assert!(validate_destination_url("not-a-url", strict()).is_err());
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(validate_destination_url("ftp://example.com/webhooks", strict()).is_err());
    }

    #[test]
    fn test_private_host_allowed_when_policy_permits() {
        let policy = UrlPolicy {
            allow_http: true,
            allow_private_hosts: true,
        };
        assert!(validate_destination_url("http://127.0.0.1:9200/hook", policy).is_ok());
    }

    // --- SSRF protection ---

    #[test]
    fn test_ssrf_blocks_loopback() {
        assert!(validate_host_not_internal("127.0.0.1").is_err());
        assert!(validate_host_not_internal("127.0.0.2").is_err());
    }

    #[test]
    fn test_ssrf_blocks_private_ranges() {
        assert!(validate_host_not_internal("10.0.0.1").is_err());
        assert!(validate_host_not_internal("172.16.0.1").is_err());
        assert!(validate_host_not_internal("192.168.0.1").is_err());
    }

    #[test]
    fn test_ssrf_blocks_link_local() {
        // AWS/Azure/GCP metadata endpoint
        assert!(validate_host_not_internal("169.254.169.254").is_err());
    }

    #[test]
    fn test_ssrf_blocks_cgnat() {
        assert!(validate_host_not_internal("100.64.0.1").is_err());
        assert!(validate_host_not_internal("100.127.255.255").is_err());
    }

    #[test]
    fn test_ssrf_blocks_ipv6_loopback_and_unspecified() {
        assert!(validate_host_not_internal("::1").is_err());
        assert!(validate_host_not_internal("::").is_err());
    }

    #[test]
    fn test_ssrf_blocks_internal_hostnames() {
        assert!(validate_host_not_internal("localhost").is_err());
        assert!(validate_host_not_internal("LOCALHOST").is_err());
        assert!(validate_host_not_internal("metadata.google.internal").is_err());
        assert!(validate_host_not_internal("service.internal").is_err());
        assert!(validate_host_not_internal("myhost.local").is_err());
    }

    #[test]
    fn test_ssrf_allows_public_hosts() {
        assert!(validate_host_not_internal("8.8.8.8").is_ok());
        assert!(validate_host_not_internal("203.0.113.50").is_ok());
        assert!(validate_host_not_internal("example.com").is_ok());
        assert!(validate_host_not_internal("hooks.myapp.io").is_ok());
    }

    #[test]
    fn test_ssrf_url_integration_private_ip() {
        let result = validate_destination_url("https://10.0.0.1/webhook", strict());
        assert!(matches!(result.unwrap_err(), WebhookError::SsrfDetected(_)));
    }

    // --- HTTP method ---

    #[test]
    fn test_http_method_allow_list() {
        assert!(validate_http_method("POST").is_ok());
        assert!(validate_http_method("put").is_ok());
        assert!(validate_http_method("PATCH").is_ok());
        assert!(validate_http_method("GET").is_err());
        assert!(validate_http_method("DELETE").is_err());
    }
}

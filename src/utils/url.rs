//! URL utilities for the Ollama server address.
//!
//! Ollama accepts the same loose host syntax everywhere (`OLLAMA_HOST`,
//! client flags): a bare `host`, `host:port`, or a full URL. Everything is
//! normalized to `scheme://host:port` without a trailing slash before API
//! paths are appended.

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use ollama_chat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
/// assert_eq!(normalize_base_url("http://localhost:11434///"), "http://localhost:11434");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use ollama_chat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434/", "/api/chat"),
///     "http://localhost:11434/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// Turn a user-supplied host into a base URL.
///
/// A missing scheme means `http`, and a bare host without a scheme gets the
/// default Ollama port. Empty input yields [`DEFAULT_OLLAMA_HOST`].
pub fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_OLLAMA_HOST.to_string();
    }

    if trimmed.contains("://") {
        return normalize_base_url(trimmed);
    }

    let (authority, path) = match trimmed.find('/') {
        Some(pos) => trimmed.split_at(pos),
        None => (trimmed, ""),
    };
    let has_port = if authority.starts_with('[') {
        authority.contains("]:")
    } else {
        authority.contains(':')
    };
    let authority = if has_port {
        authority.to_string()
    } else {
        format!("{authority}:{DEFAULT_OLLAMA_PORT}")
    };
    normalize_base_url(&format!("http://{authority}{path}"))
}

/// Pick the server address: command line, then `OLLAMA_HOST`, then the
/// config file, then the default.
pub fn resolve_host(cli: Option<&str>, env: Option<&str>, config: Option<&str>) -> String {
    [cli, env, config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(normalize_host)
        .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:11434"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_base_url("http://localhost:11434/"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_base_url("https://ollama.example.com/proxy///"),
            "https://ollama.example.com/proxy"
        );
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://localhost:11434", "api/tags"),
            "http://localhost:11434/api/tags"
        );
        assert_eq!(
            construct_api_url("https://ollama.example.com/proxy/", "/api/chat"),
            "https://ollama.example.com/proxy/api/chat"
        );
    }

    #[test]
    fn bare_hosts_get_scheme_and_default_port() {
        assert_eq!(normalize_host("0.0.0.0"), "http://0.0.0.0:11434");
        assert_eq!(normalize_host("gpu-box:8080"), "http://gpu-box:8080");
        assert_eq!(normalize_host("[::1]"), "http://[::1]:11434");
        assert_eq!(normalize_host("[::1]:9000/"), "http://[::1]:9000");
        assert_eq!(normalize_host("gpu-box/ollama"), "http://gpu-box:11434/ollama");
    }

    #[test]
    fn full_urls_are_kept() {
        assert_eq!(
            normalize_host("https://ollama.example.com/"),
            "https://ollama.example.com"
        );
        assert_eq!(normalize_host("  "), DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn resolution_order_is_cli_env_config_default() {
        assert_eq!(
            resolve_host(Some("a:1"), Some("b:2"), Some("c:3")),
            "http://a:1"
        );
        assert_eq!(resolve_host(None, Some("b:2"), Some("c:3")), "http://b:2");
        assert_eq!(resolve_host(None, Some(""), Some("c:3")), "http://c:3");
        assert_eq!(resolve_host(None, None, None), DEFAULT_OLLAMA_HOST);
    }
}

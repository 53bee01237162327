//! GitHub client configuration

use std::time::Duration;

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Per-request deadline used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// GitHub connection settings
#[derive(Clone)]
pub struct GithubConfig {
    /// REST API base URL (GitHub Enterprise installs use `https://host/api/v3`)
    pub api_url: String,
    /// Personal access or installation token
    pub token: String,
    /// Deadline for each individual request
    pub timeout: Duration,
    /// `User-Agent` header (required by GitHub)
    pub user_agent: String,
}

impl GithubConfig {
    /// Config for api.github.com with the given token
    pub fn new(token: &str) -> Self {
        GithubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            token: token.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("patchfleet/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Point at a different API base URL
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_config_new() {
        let config = GithubConfig::new("ghp_secret");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.token, "ghp_secret");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.starts_with("patchfleet/"));
    }

    #[test]
    fn test_github_config_with_api_url_trims_slash() {
        let config = GithubConfig::new("t").with_api_url("https://ghe.example.com/api/v3/");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GithubConfig::new("ghp_secret").with_timeout(Duration::from_secs(9));
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("redacted"));
    }
}

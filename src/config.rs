/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// SCRA portal credentials
    pub scra_username: String,
    pub scra_password: String,
    /// Login page URL
    pub login_url: String,
    /// Single-record verification form URL
    pub single_record_url: String,
    /// Multi-record (batch upload) form URL
    pub multi_record_url: String,
    /// Session/artifact store endpoint; None disables all store publishing
    pub session_store_url: Option<String>,
    /// API key for the session store
    pub session_store_key: String,
    /// User owning the sessions in the store
    pub store_user: Option<String>,
    /// Debug port of an already-running browser; None launches a fresh one
    pub browser_debug_port: Option<u16>,
    /// Run the launched browser headless
    pub headless: bool,
    /// Development mode keeps local artifact copies and relaxes timeouts
    pub development_mode: bool,
    /// DNS servers able to resolve the .mil domain (comma-separated)
    pub dns_servers: Option<String>,
    // --- Residential proxy for US egress ---
    pub proxy_server: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    /// Seconds to wait for a certificate download before synthesising a PDF
    pub download_timeout_secs: u64,
    /// Seconds to poll the batch results table for the uploaded file
    pub result_poll_timeout_secs: u64,
    /// User agent presented to the portal
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scra_username: String::new(),
            scra_password: String::new(),
            login_url: "https://scra.dmdc.osd.mil/scra/#/login".to_string(),
            single_record_url: "https://scra.dmdc.osd.mil/scra/#/single-record".to_string(),
            multi_record_url: "https://scra.dmdc.osd.mil/scra/#/multiple-record".to_string(),
            session_store_url: None,
            session_store_key: String::new(),
            store_user: None,
            browser_debug_port: None,
            headless: true,
            development_mode: false,
            dns_servers: None,
            proxy_server: None,
            proxy_username: None,
            proxy_password: None,
            download_timeout_secs: 30,
            result_poll_timeout_secs: 60,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            scra_username: std::env::var("SCRA_USERNAME").unwrap_or(default.scra_username),
            scra_password: std::env::var("SCRA_PASSWORD").unwrap_or(default.scra_password),
            login_url: std::env::var("SCRA_LOGIN_URL").unwrap_or(default.login_url),
            single_record_url: std::env::var("SCRA_SINGLE_RECORD_URL").unwrap_or(default.single_record_url),
            multi_record_url: std::env::var("SCRA_MULTI_RECORD_URL").unwrap_or(default.multi_record_url),
            session_store_url: std::env::var("SESSION_STORE_URL").ok().filter(|v| !v.is_empty()),
            session_store_key: std::env::var("SESSION_STORE_KEY").unwrap_or(default.session_store_key),
            store_user: std::env::var("SESSION_STORE_USER").ok().filter(|v| !v.is_empty()),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            development_mode: std::env::var("DEV_MODE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.development_mode),
            dns_servers: std::env::var("LOCAL_DNS_SERVERS").ok().filter(|v| !v.is_empty()),
            proxy_server: std::env::var("RESIDENTIAL_PROXY_SERVER").ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            proxy_username: std::env::var("RESIDENTIAL_PROXY_USERNAME").ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            proxy_password: std::env::var("RESIDENTIAL_PROXY_PASSWORD").ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            download_timeout_secs: std::env::var("DOWNLOAD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.download_timeout_secs),
            result_poll_timeout_secs: std::env::var("RESULT_POLL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.result_poll_timeout_secs),
            user_agent: std::env::var("SCRA_USER_AGENT").unwrap_or(default.user_agent),
        }
    }

    /// Credentials must exist before any browser resource is allocated.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        if self.scra_username.is_empty() {
            return Err(crate::error::AppError::missing_credentials("SCRA_USERNAME"));
        }
        if self.scra_password.is_empty() {
            return Err(crate::error::AppError::missing_credentials("SCRA_PASSWORD"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_points_at_portal() {
        let config = Config::default();
        assert!(config.login_url.contains("scra.dmdc.osd.mil"));
        assert!(config.headless);
        assert_eq!(config.download_timeout_secs, 30);
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            scra_username: "user".to_string(),
            scra_password: "pass".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}

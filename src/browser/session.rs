//! Browser session lifecycle
//!
//! One handle per verification session. The CDP event stream must be
//! drained for the connection to make progress, so the handler runs on a
//! spawned task that lives exactly as long as the handle. `shutdown`
//! consumes the handle, which makes double-close unrepresentable.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserHandle {
    /// Launch a fresh browser, or attach to a running one when a debug
    /// port is configured.
    pub async fn start(config: &Config) -> AppResult<Self> {
        match config.browser_debug_port {
            Some(port) => Self::connect(port).await,
            None => Self::launch(config).await,
        }
    }

    async fn connect(port: u16) -> AppResult<Self> {
        let url = format!("http://127.0.0.1:{}", port);
        info!("Connecting to existing browser at {}", url);
        let (browser, mut handler) = Browser::connect(&url)
            .await
            .map_err(|e| AppError::browser_connection_failed(port, e))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });
        Ok(Self { browser, handler_task })
    }

    async fn launch(config: &Config) -> AppResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1366, 768)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=en-US")
            .arg(format!("--user-agent={}", config.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(dns) = &config.dns_servers {
            builder = builder.arg(format!("--dns-servers={}", dns));
        }

        if let Some(proxy) = &config.proxy_server {
            builder = builder.arg(format!("--proxy-server={}", proxy));
            if config.proxy_username.is_some() {
                // Chrome args cannot carry proxy credentials; the proxy
                // must accept the connection by source or gateway auth.
                warn!("⚠️ Proxy credentials configured but not passed to the browser");
            }
        }

        if config.development_mode {
            builder = builder.arg("--auto-open-devtools-for-tabs");
        } else {
            builder = builder
                .arg("--disable-extensions")
                .arg("--disable-background-networking");
        }

        let browser_config = builder.build().map_err(|e| {
            AppError::browser_launch_failed(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        info!("🚀 Launching browser (headless={})", config.headless);
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(AppError::browser_launch_failed)?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        Ok(Self { browser, handler_task })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Open a blank page for the session to drive.
    pub async fn new_page(&self) -> AppResult<Page> {
        let page = self.browser.new_page("about:blank").await.map_err(|e| {
            AppError::Browser(crate::error::BrowserError::PageCreationFailed {
                source: Box::new(e),
            })
        })?;
        Ok(page)
    }

    /// Close the browser and stop the event drain. Consumes the handle so
    /// a session is closed at most once.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("⚠️ Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process wait: {}", e);
        }
        self.handler_task.abort();
        info!("✓ Browser session closed");
    }
}

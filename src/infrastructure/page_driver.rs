//! Page ownership and script execution
//!
//! The driver owns the active page for the whole session. When the portal
//! opens the certificate in a popup the driver swaps to the new page, so
//! higher layers never hold a stale handle.

use chromiumoxide::page::Page;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppResult;

pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Replace the active page, e.g. after a popup takes over the flow.
    pub fn swap_page(&mut self, page: Page) {
        self.page = page;
    }

    /// Run a script for its side effects.
    pub async fn eval(&self, js: &str) -> AppResult<()> {
        self.page.evaluate(js).await?;
        Ok(())
    }

    /// Run a script and deserialize its return value.
    pub async fn eval_as<T: DeserializeOwned>(&self, js: &str) -> AppResult<T> {
        let value = self.page.evaluate(js).await?.into_value::<T>()?;
        Ok(value)
    }

    /// Visible text of the whole page body.
    pub async fn body_text(&self) -> AppResult<String> {
        self.eval_as("document.body ? document.body.innerText : ''")
            .await
    }

    pub async fn current_url(&self) -> AppResult<String> {
        let url = self.page.url().await?.unwrap_or_default();
        Ok(url)
    }

    /// Navigate and swallow the per-call error detail into the result;
    /// strategy selection happens a layer up.
    pub async fn goto(&self, url: &str) -> AppResult<()> {
        debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        Ok(())
    }
}

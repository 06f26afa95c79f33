//! Resilient navigation
//!
//! The portal is slow and sometimes never reaches network idle, so
//! navigation walks an ordered list of wait strategies from strictest to
//! most lenient. Only when every strategy fails does navigation error,
//! and a timeout-shaped failure is reported as likely geo-restriction
//! since the portal drops non-US connections at the edge.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{AppError, AppResult, NavigationError};
use crate::infrastructure::page_driver::PageDriver;

/// How long to consider the page settled after the last resource fetch
const NETWORK_QUIET_MS: u64 = 500;

/// What "loaded" means for one navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// Document complete plus a quiet period with no new resource fetches
    NetworkIdle,
    /// DOM parsed, subresources may still be loading
    DomContentLoaded,
    /// Document readyState complete
    Load,
}

/// One navigation attempt: a wait condition and its budget
#[derive(Debug, Clone, Copy)]
pub struct NavStrategy {
    pub wait: WaitKind,
    pub timeout: Duration,
}

/// Strictest first. Later entries accept less settled pages in exchange
/// for finishing at all.
pub const NAV_STRATEGIES: [NavStrategy; 3] = [
    NavStrategy {
        wait: WaitKind::NetworkIdle,
        timeout: Duration::from_secs(45),
    },
    NavStrategy {
        wait: WaitKind::DomContentLoaded,
        timeout: Duration::from_secs(30),
    },
    NavStrategy {
        wait: WaitKind::Load,
        timeout: Duration::from_secs(20),
    },
];

/// Navigate to `url`, trying each strategy in order.
pub async fn goto_with_strategies(driver: &PageDriver, url: &str) -> AppResult<()> {
    let mut last_error = String::new();

    for (i, strategy) in NAV_STRATEGIES.iter().enumerate() {
        info!(
            "Navigation attempt {}/{} ({:?}, {}s budget)",
            i + 1,
            NAV_STRATEGIES.len(),
            strategy.wait,
            strategy.timeout.as_secs()
        );

        let attempt = async {
            driver.goto(url).await?;
            wait_ready(driver, strategy.wait).await
        };

        match tokio::time::timeout(strategy.timeout, attempt).await {
            Ok(Ok(())) => {
                info!("✓ Navigation to {} succeeded", url);
                return Ok(());
            }
            Ok(Err(e)) => {
                warn!("⚠️ Navigation attempt {} failed: {}", i + 1, e);
                last_error = e.to_string();
            }
            Err(_) => {
                warn!("⚠️ Navigation attempt {} timed out", i + 1);
                last_error = format!("timeout after {}s", strategy.timeout.as_secs());
            }
        }
    }

    if looks_geo_blocked(&last_error) {
        return Err(AppError::geo_restricted(url, last_error));
    }
    Err(AppError::Navigation(NavigationError::AllStrategiesFailed {
        url: url.to_string(),
        attempts: NAV_STRATEGIES.len(),
        last_error,
    }))
}

/// Wait for the page to satisfy the strategy's readiness condition.
/// NetworkIdle is approximated from the resource timing buffer: document
/// complete and no resource finished within the quiet window.
async fn wait_ready(driver: &PageDriver, wait: WaitKind) -> AppResult<()> {
    let ready_js = match wait {
        WaitKind::DomContentLoaded => {
            "document.readyState === 'interactive' || document.readyState === 'complete'"
        }
        WaitKind::Load | WaitKind::NetworkIdle => "document.readyState === 'complete'",
    };

    loop {
        if driver.eval_as::<bool>(ready_js).await.unwrap_or(false) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    if wait == WaitKind::NetworkIdle {
        let quiet_js = format!(
            "(() => {{ \
                const entries = performance.getEntriesByType('resource'); \
                if (entries.length === 0) return true; \
                const last = entries[entries.length - 1]; \
                return performance.now() - last.responseEnd > {NETWORK_QUIET_MS}; \
            }})()"
        );
        loop {
            if driver.eval_as::<bool>(&quiet_js).await.unwrap_or(false) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    Ok(())
}

/// Timeout-shaped failures on this portal almost always mean the edge
/// firewall dropped the connection for geographic reasons.
pub fn looks_geo_blocked(error_text: &str) -> bool {
    let text = error_text.to_lowercase();
    text.contains("timeout") || text.contains("net::err_timed_out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order_strictest_first() {
        assert_eq!(NAV_STRATEGIES[0].wait, WaitKind::NetworkIdle);
        assert_eq!(NAV_STRATEGIES[1].wait, WaitKind::DomContentLoaded);
        assert_eq!(NAV_STRATEGIES[2].wait, WaitKind::Load);
        assert_eq!(NAV_STRATEGIES[0].timeout.as_secs(), 45);
        assert_eq!(NAV_STRATEGIES[1].timeout.as_secs(), 30);
        assert_eq!(NAV_STRATEGIES[2].timeout.as_secs(), 20);
    }

    #[test]
    fn test_geo_heuristic() {
        assert!(looks_geo_blocked("Navigation timeout of 45000ms exceeded"));
        assert!(looks_geo_blocked("net::ERR_TIMED_OUT at https://..."));
        assert!(!looks_geo_blocked("net::ERR_NAME_NOT_RESOLVED"));
        assert!(!looks_geo_blocked("connection refused"));
    }
}

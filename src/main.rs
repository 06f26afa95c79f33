use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::info;

use scra_verify::utils::init_logging;
use scra_verify::{App, Config, VerificationRequest};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let usage = "usage: scra_verify single <request.json> | batch <table-file> | batch-fixed <encoded-file>";

    let (mode, path) = match (args.get(1), args.get(2)) {
        (Some(mode), Some(path)) => (mode.as_str(), path.as_str()),
        _ => bail!("{}", usage),
    };

    let config = Config::from_env();
    let app = App::initialize(config).context("configuration invalid")?;

    info!("========== SCRA verification starting ==========");

    match mode {
        "single" => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path))?;
            let request: VerificationRequest =
                serde_json::from_str(&raw).context("request JSON invalid")?;
            let response = app.verify_single(&request).await;
            let out = json!({
                "success": response.success,
                "sessionId": response.automation.session_id,
                "eligibility": response.eligibility,
                "pageUrl": response.automation.page_url,
                "screenshots": response.automation.screenshots.len(),
                "error": response.error,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            if !response.success {
                bail!("verification failed");
            }
        }
        "batch" | "batch-fixed" => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path))?;
            let response = if mode == "batch" {
                app.verify_batch_table(&raw).await
            } else {
                app.verify_batch_fixed_width(&raw).await
            };
            let out = json!({
                "success": response.success,
                "sessionId": response.automation.session_id,
                "summary": response.summary,
                "pdf": response.automation.pdf.as_ref().map(|p| &p.filename),
                "error": response.error,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            if !response.success {
                bail!("batch verification failed");
            }
        }
        other => bail!("unknown mode '{}'\n{}", other, usage),
    }

    info!("========== SCRA verification finished ==========");
    Ok(())
}

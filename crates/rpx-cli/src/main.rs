//! 🚀 rpx-cli: the front door of rpx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Loads config, sets up logging, then lets the sink do the heavy lifting.
//! Like a manager. 🦆
//!
//! ```text
//! rpx-cli [config.toml]     # default: ./rpx.toml, or RPX_* env vars alone if it is missing
//! ```

use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🚀 main(): init tracing, find the config, run the sink, print the receipt.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path_arg = std::env::args().nth(1).unwrap_or_else(|| "rpx.toml".to_string());

    // 🔒 a missing file is fine, the environment may carry everything
    let config_file = std::path::Path::new(&path_arg);
    let config_file = match config_file.try_exists().with_context(|| {
        format!(
            "💀 Couldn't check whether the configuration file exists. If it's a relative path, \
             try an absolute one. Was checking here: '{}'",
            config_file.display()
        )
    })? {
        true => Some(config_file),
        false => None,
    };

    let app_config = rpx::app_config::load_config(config_file)
        .context("💀 In rpx-cli, main, we couldn't load the configuration. Check the [stream] and [sink] tables first")?;

    let result = rpx::run(app_config).await;

    match result {
        Ok(summary) => {
            println!("{summary}");
            if !summary.is_clean() {
                error!(
                    "💀 {} of {} batch(es) did not become reports. The warnings above say why.",
                    summary.failed, summary.batches
                );
                std::process::exit(1);
            }
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion, one layer at a time
            let mut smells_like_a_missing_file = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("No such file or directory")
                    || cause_str.contains("does not exist")
                    || cause_str.contains("unable to open database file")
                {
                    smells_like_a_missing_file = true;
                }
            }
            if smells_like_a_missing_file {
                error!(
                    "🔧 hint: a path in the configuration points at nothing. Check outputpath, \
                     template, header, footer, [runtime] input and [datasources] paths. \
                     Relative paths are relative to where you ran rpx-cli from."
                );
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

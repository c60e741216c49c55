use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use gazette::config::{has_flag, ServerConfig, USAGE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = ServerConfig::from_env_and_args(&args)?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "gazette",
        "gazette starting: RUST_LOG='{}', addr={}, data_dir={:?}, seed_file={:?}, demo_seed={}, page_view_limit={}, test_hooks={}",
        rust_log,
        config.http_addr(),
        config.data_dir,
        config.seed_file,
        config.demo_seed,
        config.page_view_limit,
        config.test_hooks
    );

    gazette::server::run(config).await
}

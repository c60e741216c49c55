//!
//! gazette seed tool
//! ------------------
//! Writes a fixture into the store snapshot under a data directory so the
//! server can start from known data. Existing contents are replaced unless
//! `--append` is given.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use gazette::config::has_flag;
use gazette::storage::{Fixture, Repository, Store};

const USAGE: &str = "gazette_seed\n\nUSAGE:\n  gazette_seed --data-dir PATH [--fixture FILE] [--append]\n\nOPTIONS:\n  --data-dir PATH   Store directory to write (env: GAZETTE_DATA_DIR)\n  --fixture FILE    JSON fixture to load (default: built-in demo data)\n  --append          Keep existing rows instead of clearing first\n";

fn arg_after(args: &[String], flag: &str) -> Option<String> {
    let i = args.iter().position(|a| a == flag)?;
    args.get(i + 1).cloned()
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let data_dir: PathBuf = arg_after(&args, "--data-dir")
        .or_else(|| std::env::var("GAZETTE_DATA_DIR").ok())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("--data-dir is required\n\n{}", USAGE))?;
    let fixture = match arg_after(&args, "--fixture") {
        Some(path) => Fixture::from_path(&PathBuf::from(path))?,
        None => Fixture::demo(),
    };

    let mut store = Store::open(&data_dir).with_context(|| format!("opening store under {}", data_dir.display()))?;
    if !has_flag(&args, "--append") {
        store.clear().context("clearing store")?;
    }
    let report = store.apply_fixture(&fixture).context("applying fixture")?;
    info!(
        data_dir = %data_dir.display(),
        users = report.users,
        articles = report.articles,
        total_users = store.list_users().len(),
        total_articles = store.list_articles().len(),
        "seed complete"
    );
    println!("seeded {} users and {} articles into {}", report.users, report.articles, data_dir.display());
    Ok(())
}

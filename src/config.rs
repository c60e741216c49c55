//!
//! gazette server configuration
//! -----------------------------
//! Settings are resolved in three layers: built-in defaults, then `GAZETTE_*`
//! environment variables, then command-line flags. Invalid values are errors
//! rather than silently falling back to a default.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::access::DEFAULT_PAGE_VIEW_LIMIT;
use crate::identity::DEFAULT_MAX_ANONYMOUS_SESSIONS;

pub const USAGE: &str = "gazette\n\nUSAGE:\n  gazette [OPTIONS]\n\nOPTIONS:\n  --http-port N           HTTP port (env: GAZETTE_HTTP_PORT, default 5555)\n  --bind ADDR             Bind address (env: GAZETTE_BIND, default 0.0.0.0)\n  --data-dir PATH         Persist the store under PATH (env: GAZETTE_DATA_DIR; in-memory when unset)\n  --seed-file PATH        Load a JSON fixture into an empty store (env: GAZETTE_SEED_FILE)\n  --demo-seed             Load the built-in demo fixture into an empty store (env: GAZETTE_DEMO_SEED)\n  --session-ttl-secs N    Idle session lifetime (env: GAZETTE_SESSION_TTL_SECS, default 3600)\n  --page-view-limit N     Public article reads per session (env: GAZETTE_PAGE_VIEW_LIMIT, default 3)\n  --max-anon-sessions N   Anonymous sessions kept before evicting the oldest (env: GAZETTE_MAX_ANON_SESSIONS, default 10000)\n  --secure-cookies        Mark the session cookie Secure (env: GAZETTE_SECURE_COOKIES)\n  --test-hooks            Mount the /clear fixture hook (env: GAZETTE_TEST_HOOKS)\n  -h, --help              Print this help\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub http_port: u16,
    pub data_dir: Option<PathBuf>,
    pub seed_file: Option<PathBuf>,
    pub demo_seed: bool,
    pub session_ttl: Duration,
    pub page_view_limit: u32,
    pub max_anonymous_sessions: usize,
    pub secure_cookies: bool,
    pub test_hooks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 5555,
            data_dir: None,
            seed_file: None,
            demo_seed: false,
            session_ttl: Duration::from_secs(60 * 60),
            page_view_limit: DEFAULT_PAGE_VIEW_LIMIT,
            max_anonymous_sessions: DEFAULT_MAX_ANONYMOUS_SESSIONS,
            secure_cookies: false,
            test_hooks: false,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => args
            .get(i + 1)
            .filter(|v| !v.starts_with("--"))
            .map(|v| Some(v.as_str()))
            .ok_or_else(|| anyhow!("{} expects a value", flag)),
        None => Ok(None),
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_num<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim().parse::<T>().with_context(|| format!("invalid {}: '{}'", what, raw))
}

impl ServerConfig {
    /// Resolve from the process environment and the given argv.
    pub fn from_env_and_args(args: &[String]) -> Result<Self> {
        Self::resolve(&|k| std::env::var(k).ok(), args)
    }

    /// Resolve against an explicit environment lookup.
    pub fn resolve(env: &dyn Fn(&str) -> Option<String>, args: &[String]) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = env("GAZETTE_HTTP_PORT") { cfg.http_port = parse_num(&v, "GAZETTE_HTTP_PORT")?; }
        if let Some(v) = env("GAZETTE_BIND") { cfg.bind = parse_num(&v, "GAZETTE_BIND")?; }
        if let Some(v) = env("GAZETTE_DATA_DIR") { cfg.data_dir = Some(PathBuf::from(v)); }
        if let Some(v) = env("GAZETTE_SEED_FILE") { cfg.seed_file = Some(PathBuf::from(v)); }
        if let Some(v) = env("GAZETTE_SESSION_TTL_SECS") {
            cfg.session_ttl = Duration::from_secs(parse_num(&v, "GAZETTE_SESSION_TTL_SECS")?);
        }
        if let Some(v) = env("GAZETTE_PAGE_VIEW_LIMIT") { cfg.page_view_limit = parse_num(&v, "GAZETTE_PAGE_VIEW_LIMIT")?; }
        if let Some(v) = env("GAZETTE_MAX_ANON_SESSIONS") {
            cfg.max_anonymous_sessions = parse_num(&v, "GAZETTE_MAX_ANON_SESSIONS")?;
        }
        for (name, slot) in [
            ("GAZETTE_DEMO_SEED", &mut cfg.demo_seed),
            ("GAZETTE_SECURE_COOKIES", &mut cfg.secure_cookies),
            ("GAZETTE_TEST_HOOKS", &mut cfg.test_hooks),
        ] {
            if let Some(v) = env(name) {
                *slot = parse_bool(&v).ok_or_else(|| anyhow!("invalid {}: '{}'", name, v))?;
            }
        }

        // CLI arguments override environment
        if let Some(v) = arg_value(args, "--http-port")? { cfg.http_port = parse_num(v, "--http-port")?; }
        if let Some(v) = arg_value(args, "--bind")? { cfg.bind = parse_num(v, "--bind")?; }
        if let Some(v) = arg_value(args, "--data-dir")? { cfg.data_dir = Some(PathBuf::from(v)); }
        if let Some(v) = arg_value(args, "--seed-file")? { cfg.seed_file = Some(PathBuf::from(v)); }
        if let Some(v) = arg_value(args, "--session-ttl-secs")? {
            cfg.session_ttl = Duration::from_secs(parse_num(v, "--session-ttl-secs")?);
        }
        if let Some(v) = arg_value(args, "--page-view-limit")? { cfg.page_view_limit = parse_num(v, "--page-view-limit")?; }
        if let Some(v) = arg_value(args, "--max-anon-sessions")? {
            cfg.max_anonymous_sessions = parse_num(v, "--max-anon-sessions")?;
        }
        if has_flag(args, "--demo-seed") { cfg.demo_seed = true; }
        if has_flag(args, "--secure-cookies") { cfg.secure_cookies = true; }
        if has_flag(args, "--test-hooks") { cfg.test_hooks = true; }

        if cfg.session_ttl.is_zero() {
            return Err(anyhow!("session ttl must be greater than zero"));
        }
        if cfg.max_anonymous_sessions == 0 {
            return Err(anyhow!("anonymous session cap must be greater than zero"));
        }
        Ok(cfg)
    }

    pub fn http_addr(&self) -> SocketAddr { SocketAddr::new(self.bind, self.http_port) }
}

// # dnssyncd - external-dns webhook daemon for Zone.ee
//
// This daemon is a THIN integration layer:
// - DO NOT add reconciliation, zone or record logic here
// - All of that lives in dnssync-core
// - Configuration is via environment variables ONLY
//
// The dnssyncd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering record stores and building the configured one
// 4. Serving the external-dns webhook until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Zone.ee
// - `ZONEEE_API_USER`: API user name (required)
// - `ZONEEE_API_KEY`: API key (required)
// - `ZONEEE_DOMAIN_FILTER`: Comma-separated zones to manage (required)
// - `ZONEEE_API_URL`: API base URL override (optional)
//
// ### Daemon
// - `DNSSYNC_LISTEN_ADDR`: Listen address (default `0.0.0.0:8888`)
// - `DNSSYNC_DRY_RUN`: `true` to log planned changes without applying them
// - `DNSSYNC_DEFAULT_TTL`: TTL reported for listed records (default 300)
// - `DNSSYNC_RECORD_TYPES`: Comma-separated subset of A,CNAME,TXT,MX,SRV
// - `DNSSYNC_UPDATE_STRATEGY`: `in-place` (default) or `recreate`
// - `DNSSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export ZONEEE_API_USER=myuser
// export ZONEEE_API_KEY=my_api_key
// export ZONEEE_DOMAIN_FILTER=example.com,example.org
// export DNSSYNC_DRY_RUN=true
//
// dnssyncd
// ```

mod server;

use anyhow::{Context, Result};
use dnssync_core::{RecordType, StoreConfig, StoreRegistry, SyncConfig, SyncEngine, UpdateStrategy};
use std::env;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default webhook listen address
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8888";

/// Time allowed for in-flight requests after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DnssyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DnssyncExitCode> for ExitCode {
    fn from(code: DnssyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    api_user: String,
    api_key: String,
    zones: Vec<String>,
    api_url: Option<String>,
    listen_addr: String,
    dry_run: bool,
    default_ttl: i64,
    record_types: Vec<RecordType>,
    update_strategy: UpdateStrategy,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let list = |key: &str| -> Vec<String> {
            lookup(key)
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let record_types = list("DNSSYNC_RECORD_TYPES")
            .iter()
            .map(|s| s.parse::<RecordType>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("DNSSYNC_RECORD_TYPES is invalid")?;

        let update_strategy = match lookup("DNSSYNC_UPDATE_STRATEGY") {
            Some(raw) => raw.parse().context("DNSSYNC_UPDATE_STRATEGY is invalid")?,
            None => UpdateStrategy::default(),
        };

        let default_ttl = match lookup("DNSSYNC_DEFAULT_TTL") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("DNSSYNC_DEFAULT_TTL '{}' is not an integer", raw))?,
            None => 300,
        };

        let dry_run = match lookup("DNSSYNC_DRY_RUN") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("DNSSYNC_DRY_RUN '{}' is not a boolean", raw))?,
            None => false,
        };

        Ok(Self {
            api_user: lookup("ZONEEE_API_USER").context("ZONEEE_API_USER is required")?,
            api_key: lookup("ZONEEE_API_KEY").context("ZONEEE_API_KEY is required")?,
            zones: list("ZONEEE_DOMAIN_FILTER"),
            api_url: lookup("ZONEEE_API_URL").filter(|s| !s.trim().is_empty()),
            listen_addr: lookup("DNSSYNC_LISTEN_ADDR")
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            dry_run,
            default_ttl,
            record_types: if record_types.is_empty() {
                RecordType::ALL.to_vec()
            } else {
                record_types
            },
            update_strategy,
            log_level: lookup("DNSSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.api_user.trim().is_empty() || self.api_key.trim().is_empty() {
            anyhow::bail!(
                "ZONEEE_API_USER and ZONEEE_API_KEY must not be empty. \
                Set them via: export ZONEEE_API_USER=... ZONEEE_API_KEY=..."
            );
        }

        // Check for obvious placeholder keys (common mistake)
        let key_lower = self.api_key.to_lowercase();
        if key_lower.contains("your_key")
            || key_lower.contains("replace_me")
            || key_lower == "changeme"
        {
            anyhow::bail!(
                "ZONEEE_API_KEY appears to be a placeholder. \
                Use an actual API key from the Zone.ee control panel."
            );
        }

        if self.zones.is_empty() {
            anyhow::bail!(
                "ZONEEE_DOMAIN_FILTER must contain at least one zone. \
                Set it via: export ZONEEE_DOMAIN_FILTER=example.com"
            );
        }

        for zone in &self.zones {
            validate_domain_name(zone)?;
        }

        if let Some(ref url) = self.api_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!("ZONEEE_API_URL must use HTTP or HTTPS scheme. Got: {}", url);
        }

        self.listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("DNSSYNC_LISTEN_ADDR '{}' is not a socket address", self.listen_addr))?;

        if self.default_ttl <= 0 {
            anyhow::bail!("DNSSYNC_DEFAULT_TTL must be > 0. Got: {}", self.default_ttl);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn store_config(&self) -> StoreConfig {
        StoreConfig::Zoneee {
            username: self.api_user.clone(),
            api_key: self.api_key.clone(),
            base_url: self.api_url.clone(),
        }
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.zones.iter().cloned())
            .with_dry_run(self.dry_run)
            .with_default_ttl(self.default_ttl)
            .with_record_types(self.record_types.clone())
            .with_update_strategy(self.update_strategy)
            .with_store(self.store_config())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Validate that a zone is a plausible domain name
///
/// Basic RFC 1035 checks; a single trailing dot is allowed.
fn validate_domain_name(domain: &str) -> Result<()> {
    let name = domain.strip_suffix('.').unwrap_or(domain);
    if name.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if name.len() > 253 {
        anyhow::bail!("Domain name too long: {} chars (max 253). Got: {}", name.len(), domain);
    }

    for label in name.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!("Domain label cannot start or end with hyphen. Label: '{}'", label);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnssyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnssyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnssyncExitCode::ConfigError.into();
    }

    info!("Starting dnssyncd daemon");
    info!("Configuration loaded: {} zone(s)", config.zones.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnssyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let engine = match build_engine(&config) {
            Ok(engine) => engine,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DnssyncExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine, &config.listen_addr).await {
            error!("Daemon error: {:#}", e);
            DnssyncExitCode::RuntimeError
        } else {
            DnssyncExitCode::CleanShutdown
        }
    })
    .into()
}

/// Register stores and build the engine from configuration
fn build_engine(config: &Config) -> Result<SyncEngine> {
    let registry = StoreRegistry::new();

    #[cfg(feature = "zoneee")]
    {
        info!("Registering Zone.ee store");
        dnssync_store_zoneee::register(&registry);
    }

    let sync_config = config.sync_config();
    let store_config = sync_config
        .store
        .as_ref()
        .context("no record store configured")?;
    let store = registry
        .create_store(store_config)
        .with_context(|| format!("Failed to create '{}' store", store_config.type_name()))?;

    if config.dry_run {
        warn!("DRY-RUN mode: changes will be logged, not applied");
    }
    for zone in &config.zones {
        info!("Managing zone: {}", zone);
    }

    Ok(SyncEngine::new(store, sync_config)?)
}

/// Serve the webhook until a shutdown signal arrives
async fn run_daemon(engine: SyncEngine, listen_addr: &str) -> Result<()> {
    let shutdown = CancellationToken::new();
    let state = Arc::new(server::AppState {
        engine,
        shutdown: shutdown.clone(),
    });
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;
    info!("Listening on http://{}", listen_addr);

    let server_shutdown = shutdown.clone();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result.context("Server task failed")??;
            anyhow::bail!("Server stopped without a shutdown signal");
        }
        signal = wait_for_shutdown_signal() => {
            info!("Received shutdown signal: {}", signal?);
        }
    }

    info!("Shutting down daemon");
    shutdown.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => {
            result.context("Server task failed")??;
            Ok(())
        }
        Err(_) => Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT)),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ZONEEE_API_USER", "user"),
            ("ZONEEE_API_KEY", "k3y-from-zone-panel"),
            ("ZONEEE_DOMAIN_FILTER", "example.com, example.org."),
        ]
    }

    fn config_with(extra: &[(&'static str, &'static str)]) -> Result<Config> {
        let mut pairs = base();
        pairs.extend_from_slice(extra);
        Config::from_lookup(lookup_from(&pairs))
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();
        config.validate().unwrap();
        assert_eq!(config.zones, vec!["example.com", "example.org."]);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.record_types, RecordType::ALL.to_vec());
        assert_eq!(config.update_strategy, UpdateStrategy::InPlace);
        assert!(!config.dry_run);
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("DNSSYNC_DRY_RUN", "true"),
            ("DNSSYNC_DEFAULT_TTL", "600"),
            ("DNSSYNC_RECORD_TYPES", "a,cname"),
            ("DNSSYNC_UPDATE_STRATEGY", "recreate"),
            ("DNSSYNC_LISTEN_ADDR", "127.0.0.1:9999"),
            ("ZONEEE_API_URL", "http://localhost:8080/v2"),
        ])
        .unwrap();
        config.validate().unwrap();

        let sync = config.sync_config();
        assert!(sync.dry_run);
        assert_eq!(sync.default_ttl, 600);
        assert_eq!(sync.record_types, vec![RecordType::A, RecordType::Cname]);
        assert_eq!(sync.update_strategy, UpdateStrategy::Recreate);
        assert!(sync.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let lookup = lookup_from(&[("ZONEEE_DOMAIN_FILTER", "example.com")]);
        assert!(Config::from_lookup(lookup).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_with(&[("DNSSYNC_RECORD_TYPES", "A,AAAA")]).is_err());
        assert!(config_with(&[("DNSSYNC_DEFAULT_TTL", "soon")]).is_err());
        assert!(config_with(&[("DNSSYNC_DRY_RUN", "maybe")]).is_err());
        assert!(config_with(&[("DNSSYNC_UPDATE_STRATEGY", "sideways")]).is_err());

        for extra in [
            ("DNSSYNC_DEFAULT_TTL", "0"),
            ("DNSSYNC_LISTEN_ADDR", "not-an-address"),
            ("DNSSYNC_LOG_LEVEL", "loud"),
            ("ZONEEE_API_URL", "ftp://api.zone.eu"),
            ("ZONEEE_DOMAIN_FILTER", "bad..zone"),
            ("ZONEEE_DOMAIN_FILTER", " , "),
            ("ZONEEE_API_KEY", "replace_me"),
        ] {
            let config = config_with(&[extra]).unwrap();
            assert!(config.validate().is_err(), "expected {:?} to be rejected", extra);
        }
    }

    #[test]
    fn test_validate_domain_name() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("example.com.").is_ok());
        assert!(validate_domain_name("sub-zone.example.co.uk").is_ok());
        assert!(validate_domain_name(".").is_err());
        assert!(validate_domain_name("-bad.example.com").is_err());
        assert!(validate_domain_name("under_score.example.com").is_err());
        assert!(validate_domain_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[cfg(feature = "zoneee")]
    #[tokio::test]
    async fn test_build_engine() {
        let config = config_with(&[("DNSSYNC_DRY_RUN", "1")]).unwrap();
        let engine = build_engine(&config).unwrap();
        assert!(engine.is_dry_run());
        assert_eq!(engine.zones().len(), 2);
    }
}

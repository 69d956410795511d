use anyhow::Context;

const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_ADMIN_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub admin_key: String,
    /// Base URL of the public file bucket; relative document paths are joined onto it.
    pub storage_public_url: Option<url::Url>,
    /// Comma-separated list of webhook URLs notified on booking decisions.
    pub webhook_urls: Vec<String>,
    pub webhook_secret: Option<String>,
    /// Seconds between occupancy repair passes. 0 = disabled.
    /// Set via CAMPUS_REPAIR_INTERVAL_SECS env var. Default: 60.
    pub repair_interval_secs: u64,
    pub dashboard_origin: String,
}

impl Config {
    /// Public link for a stored relative path. Absolute URLs pass through.
    pub fn document_link(&self, path: &str) -> Option<String> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        let base = self.storage_public_url.as_ref()?;
        base.join(path.trim_start_matches('/')).ok().map(String::from)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let admin_key =
        std::env::var("CAMPUS_ADMIN_KEY").unwrap_or_else(|_| PLACEHOLDER_ADMIN_KEY.into());

    if admin_key == PLACEHOLDER_ADMIN_KEY {
        let env_mode = std::env::var("CAMPUS_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "CAMPUS_ADMIN_KEY is still the insecure placeholder. \
                 Set a real key before running in production."
            );
        }
        tracing::warn!("CAMPUS_ADMIN_KEY is not set, using insecure placeholder");
    }

    let storage_public_url = match std::env::var("CAMPUS_STORAGE_PUBLIC_URL") {
        Ok(raw) if !raw.trim().is_empty() => Some(parse_bucket_url(&raw)?),
        _ => None,
    };

    Ok(Config {
        port: std::env::var("CAMPUS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/campus".into()),
        admin_key,
        storage_public_url,
        webhook_urls: std::env::var("CAMPUS_WEBHOOK_URLS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        webhook_secret: std::env::var("CAMPUS_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty()),
        repair_interval_secs: std::env::var("CAMPUS_REPAIR_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60),
        dashboard_origin: std::env::var("CAMPUS_DASHBOARD_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".into()),
    })
}

/// Bucket URLs are treated as directories, so `join` appends instead of replacing.
fn parse_bucket_url(raw: &str) -> anyhow::Result<url::Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    url::Url::parse(&raw).with_context(|| format!("invalid CAMPUS_STORAGE_PUBLIC_URL: {}", raw))
}

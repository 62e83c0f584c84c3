use std::env;
use std::path::PathBuf;
use anyhow::{Result, Context};
use tracing::{info, warn};

pub const DEFAULT_UPLOAD_PATH: &str = "__DATA__";
pub const DEFAULT_MAX_FILE_SIZE_MB: usize = 16;

/// Immutable service configuration, built once at startup and handed to the
/// pipeline and router by value.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub upload_path: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_mb: usize,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            upload_path: PathBuf::from(DEFAULT_UPLOAD_PATH),
            allowed_extensions: vec![".pdf".to_string()],
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            llm_api_url: "https://api.openai.com/v1".to_string(),
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            llm_timeout_seconds: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let defaults = Config::default();

        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                info!("SERVER_HOST not set, using default: {}", defaults.server_host);
                defaults.server_host.clone()
            }),
            server_port: Self::parse_env_var("SERVER_PORT", defaults.server_port)
                .context("Failed to parse SERVER_PORT")?,
            upload_path: env::var("UPLOAD_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    info!("UPLOAD_PATH not set, using default: {}", DEFAULT_UPLOAD_PATH);
                    defaults.upload_path.clone()
                }),
            allowed_extensions: match env::var("UPLOAD_EXTENSIONS") {
                Ok(raw) => normalize_extensions(&raw),
                Err(_) => defaults.allowed_extensions.clone(),
            },
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            llm_api_url: env::var("LLM_API_URL").unwrap_or(defaults.llm_api_url),
            llm_api_key: env::var("LLM_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            llm_model: env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_timeout_seconds: Self::parse_env_var("LLM_TIMEOUT_SECONDS", defaults.llm_timeout_seconds)
                .context("Failed to parse LLM_TIMEOUT_SECONDS")?,
        };

        config.validate()?;

        if config.llm_api_key.is_none() {
            warn!("No LLM API key configured. Set LLM_API_KEY to enable structured extraction.");
        }

        info!(
            upload_path = %config.upload_path.display(),
            allowed_extensions = ?config.allowed_extensions,
            max_file_size_mb = config.max_file_size_mb,
            llm_model = %config.llm_model,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Payload limit in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.trim().parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_EXTENSIONS must name at least one extension"));
        }
        if self.llm_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("LLM_TIMEOUT_SECONDS must be greater than 0"));
        }
        if self.upload_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_PATH must not be empty"));
        }
        Ok(())
    }
}

/// Parses a comma separated extension list into lowercase, dot-prefixed
/// entries. `PDF, .Docx` becomes `[".pdf", ".docx"]`.
pub fn normalize_extensions(raw: &str) -> Vec<String> {
    let mut extensions: Vec<String> = Vec::new();
    for ext in raw
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
    {
        let ext = format!(".{}", ext);
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    extensions
}

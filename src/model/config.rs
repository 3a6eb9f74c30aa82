use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const ENV_CONFIG_PATH: &str = "PLANNER_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
const ENV_PLACES_API_KEY: &str = "PLACES_API_KEY";
const ENV_PLACES_BASE_URL: &str = "PLACES_BASE_URL";
const ENV_CHART_BASE_URL: &str = "CHART_BASE_URL";
const ENV_PDF_API_KEY: &str = "PDF_API_KEY";
const ENV_PDF_RENDER_URL: &str = "PDF_RENDER_URL";
const ENV_SMTP_HOST: &str = "SMTP_HOST";
const ENV_SMTP_PORT: &str = "SMTP_PORT";
const ENV_SMTP_USERNAME: &str = "SMTP_USERNAME";
const ENV_SMTP_PASSWORD: &str = "SMTP_PASSWORD";
const ENV_MAIL_FROM: &str = "MAIL_FROM";

const DEFAULT_MODEL: &str = rig::providers::openai::GPT_4O_MINI;
const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const DEFAULT_CHART_BASE_URL: &str = "https://quickchart.io/chart";
const DEFAULT_PDF_ENDPOINT: &str = "https://v2.api2pdf.com/chrome/pdf/html";

/// Output contract requested from the language model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Single JSON object with `riskScores` and `reportHtml`
    #[default]
    Structured,
    /// Free-form HTML narrative
    Html,
}

/// What to do when the language model cannot be reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Abort the request
    #[default]
    Fail,
    /// Substitute a general advisory plan
    DefaultAdvisory,
}

/// SMTP connection security
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTls {
    #[default]
    Tls,
    Starttls,
    Plaintext,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub report_format: ReportFormat,
    pub fallback: FallbackPolicy,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            report_format: ReportFormat::default(),
            fallback: FallbackPolicy::default(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacesSettings {
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PLACES_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub base_url: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHART_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfSettings {
    pub endpoint: String,
    /// Header carrying the API key
    pub api_key_header: String,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PDF_ENDPOINT.to_string(),
            api_key_header: "Authorization".to_string(),
            poll_interval_ms: 1000,
            max_polls: 30,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub tls: MailTls,
    pub from: String,
    #[serde(skip)]
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            tls: MailTls::default(),
            from: String::new(),
            username: None,
            password: None,
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub request_timeout_secs: u64,
    pub upstream_timeout_secs: u64,
    pub max_concurrent_plans: usize,
    pub preview_enabled: bool,
    pub llm: LlmSettings,
    pub places: PlacesSettings,
    pub chart: ChartSettings,
    pub pdf: PdfSettings,
    pub mail: MailSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            request_timeout_secs: 90,
            upstream_timeout_secs: 30,
            max_concurrent_plans: 16,
            preview_enabled: false,
            llm: LlmSettings::default(),
            places: PlacesSettings::default(),
            chart: ChartSettings::default(),
            pdf: PdfSettings::default(),
            mail: MailSettings::default(),
        }
    }
}

/// Application configuration
///
/// Tunables come from the YAML file; secrets and endpoints from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub request_timeout: Duration,
    pub upstream_timeout: Duration,
    pub max_concurrent_plans: usize,
    pub preview_enabled: bool,
    pub llm: LlmSettings,
    pub places: PlacesSettings,
    pub chart: ChartSettings,
    pub pdf: PdfSettings,
    pub mail: MailSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(ConfigFile::default(), "127.0.0.1".to_string(), 8080)
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();
        let mut config = Self::from_file(file, host, port);
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    fn from_file(file: ConfigFile, host: String, port: u16) -> Self {
        Self {
            port,
            host,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            upstream_timeout: Duration::from_secs(file.upstream_timeout_secs),
            max_concurrent_plans: file.max_concurrent_plans.max(1),
            preview_enabled: file.preview_enabled,
            llm: file.llm,
            places: file.places,
            chart: file.chart,
            pdf: file.pdf,
            mail: file.mail,
        }
    }

    /// Overlay secrets and endpoint overrides
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        self.llm.api_key = non_empty(ENV_OPENAI_API_KEY);
        if let Some(model) = non_empty(ENV_OPENAI_MODEL) {
            self.llm.model = model;
        }

        self.places.api_key = non_empty(ENV_PLACES_API_KEY);
        if let Some(url) = non_empty(ENV_PLACES_BASE_URL) {
            self.places.base_url = url;
        }

        if let Some(url) = non_empty(ENV_CHART_BASE_URL) {
            self.chart.base_url = url;
        }

        self.pdf.api_key = non_empty(ENV_PDF_API_KEY);
        if let Some(url) = non_empty(ENV_PDF_RENDER_URL) {
            self.pdf.endpoint = url;
        }

        if let Some(host) = non_empty(ENV_SMTP_HOST) {
            self.mail.host = host;
        }
        if let Some(port) = non_empty(ENV_SMTP_PORT).and_then(|p| p.parse().ok()) {
            self.mail.port = port;
        }
        self.mail.username = non_empty(ENV_SMTP_USERNAME);
        self.mail.password = non_empty(ENV_SMTP_PASSWORD);
        if let Some(from) = non_empty(ENV_MAIL_FROM) {
            self.mail.from = from;
        }
        if self.mail.from.is_empty()
            && let Some(username) = &self.mail.username
        {
            self.mail.from = username.clone();
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let file: ConfigFile = serde_yaml::from_str(
            "max_concurrent_plans: 4\nllm:\n  report_format: html\n  fallback: default_advisory\nmail:\n  tls: starttls\n  port: 587\n",
        )
        .unwrap();

        assert_eq!(file.max_concurrent_plans, 4);
        assert_eq!(file.request_timeout_secs, 90);
        assert_eq!(file.llm.report_format, ReportFormat::Html);
        assert_eq!(file.llm.fallback, FallbackPolicy::DefaultAdvisory);
        assert_eq!(file.llm.model, DEFAULT_MODEL);
        assert_eq!(file.mail.tls, MailTls::Starttls);
        assert_eq!(file.mail.port, 587);
        assert_eq!(file.pdf.max_polls, 30);
    }

    #[test]
    fn test_secrets_are_not_read_from_yaml() {
        let file: ConfigFile = serde_yaml::from_str("llm:\n  api_key: leaked\n").unwrap();
        assert!(file.llm.api_key.is_none());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_OPENAI_API_KEY, "sk-test"),
            (ENV_PDF_API_KEY, "pdf-key"),
            (ENV_PLACES_API_KEY, "  "),
            (ENV_SMTP_PORT, "2525"),
            (ENV_SMTP_USERNAME, "planner@example.com"),
            (ENV_SMTP_PASSWORD, "secret"),
            (ENV_CHART_BASE_URL, "http://charts.local/chart"),
        ]);

        let mut config = Config::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.pdf.api_key.as_deref(), Some("pdf-key"));
        assert!(config.places.api_key.is_none());
        assert_eq!(config.mail.port, 2525);
        assert_eq!(config.mail.from, "planner@example.com");
        assert_eq!(config.chart.base_url, "http://charts.local/chart");
    }

    #[test]
    fn test_concurrency_floor() {
        let file = ConfigFile {
            max_concurrent_plans: 0,
            ..ConfigFile::default()
        };
        let config = Config::from_file(file, "0.0.0.0".to_string(), 9000);
        assert_eq!(config.max_concurrent_plans, 1);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }
}

use crate::assets::AssetLoader;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Application configuration loaded from config.yaml
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Where uploaded files live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Signed certificate links
    #[serde(default)]
    pub links: LinksConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Reverse proxy in front of the server
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Admin API bearer tokens
    #[serde(default)]
    pub admins: Vec<AdminConfig>,

    /// Events created at startup
    #[serde(default)]
    pub events: Vec<EventSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    #[serde(default = "default_certificates_dir")]
    pub certificates_dir: PathBuf,
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("./data/templates")
}

fn default_certificates_dir() -> PathBuf {
    PathBuf::from("./data/certificates")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            certificates_dir: default_certificates_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LinksConfig {
    /// How long a certificate link stays valid
    #[serde(default = "default_link_validity")]
    pub validity_secs: i64,

    /// HMAC secret for links. `LINK_SECRET` takes precedence.
    #[serde(default)]
    pub secret: Option<String>,
}

fn default_link_validity() -> i64 {
    3600
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            validity_secs: default_link_validity(),
            secret: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptchaConfig {
    /// Seconds an unanswered challenge stays valid
    #[serde(default = "default_captcha_ttl")]
    pub ttl_secs: u64,

    /// Most challenges awaiting an answer at once
    #[serde(default = "default_captcha_max_pending")]
    pub max_pending: usize,
}

fn default_captcha_ttl() -> u64 {
    600 // 10 minutes
}

fn default_captcha_max_pending() -> usize {
    10_000
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_captcha_ttl(),
            max_pending: default_captcha_max_pending(),
        }
    }
}

/// Client addresses come from the socket unless a trusted proxy sets
/// `X-Forwarded-For` / `X-Real-IP`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    /// Honor forwarding headers. Enable only behind a proxy that overwrites them.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

#[derive(Deserialize, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Event defined in config.yaml
#[derive(Debug, Deserialize, Clone)]
pub struct EventSeed {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default)]
    pub protected: bool,

    /// Template file name inside `storage.templates_dir`
    #[serde(default)]
    pub template: Option<String>,

    #[serde(default)]
    pub placement: Option<PlacementSeed>,

    #[serde(default)]
    pub participants: Vec<ParticipantSeed>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlacementSeed {
    pub x_percent: Option<f32>,
    pub y_percent: Option<f32>,
    pub font_size: Option<u32>,
    pub font_color: Option<String>,
    pub font_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParticipantSeed {
    pub name: String,
    pub email: String,
}

impl AppConfig {
    /// Load configuration from AssetLoader (embedded or external)
    pub fn load_from_assets(loader: &AssetLoader) -> Self {
        match loader.read_config_string() {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    let config: Self = config;
                    tracing::info!(
                        events = config.events.len(),
                        admins = config.admins.len(),
                        "Loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    tracing::warn!(%e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(%e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Find the admin a bearer token belongs to
    pub fn admin_for_token(&self, token: &str) -> Option<&AdminConfig> {
        if token.is_empty() {
            return None;
        }
        self.admins.iter().find(|admin| {
            !admin.token.is_empty()
                && crate::models::event::constant_time_eq(admin.token.as_bytes(), token.as_bytes())
        })
    }
}

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub drive: DriveSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveSettings {
    pub api_base_url: String,
    pub upload_base_url: String,
    pub page_size: u32,
    /// Bytes requested per ranged download call.
    pub chunk_size: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// Takes precedence over `token_path` when set.
    pub access_token: Option<String>,
    pub token_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// Local file that model downloads are staged through.
    pub staging_path: String,
    pub model_format: ModelFormat,
    pub na_values: Vec<String>,
    pub csv_delimiter: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    Pickle,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("DRIVEBUCKET")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("storage.na_values"),
            );

        with_defaults(builder)?.build()?.try_deserialize()
    }

    /// Built-in defaults only, ignoring config files and the environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        with_defaults(Config::builder())?.build()?.try_deserialize()
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("drive.api_base_url", "https://www.googleapis.com/drive/v3")?
        .set_default(
            "drive.upload_base_url",
            "https://www.googleapis.com/upload/drive/v3",
        )?
        .set_default("drive.page_size", 100)?
        .set_default("drive.chunk_size", 100 * 1024 * 1024)?
        .set_default("drive.request_timeout_secs", 60)?
        .set_default("auth.access_token", None::<String>)?
        .set_default("auth.token_path", "token.json")?
        .set_default("storage.staging_path", "./temp.pkl")?
        .set_default("storage.model_format", "pickle")?
        .set_default("storage.na_values", vec!["na".to_string()])?
        .set_default("storage.csv_delimiter", ",")?
        .set_default("retry.max_retries", 3)?
        .set_default("retry.initial_delay_ms", 200)?
        .set_default("retry.max_delay_ms", 5000)
}

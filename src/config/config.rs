use serde::Deserialize;

use crate::api::middleware::Role;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `development` exposes internal error messages in API responses.
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "heritage.duckdb".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiKeyConfig {
    pub key: String,
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    pub default_model: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LlmConfig {
    /// One of `openai`, `anthropic`, `google`. Empty disables generation.
    #[serde(default)]
    pub provider: String,
    pub openai: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
    pub google: Option<ProviderConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("HERITAGE").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        // Expand environment variables if present like ${OPENAI_API_KEY}
        app_config.server.host = expand_env(&app_config.server.host);
        app_config.database.path = expand_env(&app_config.database.path);
        app_config.llm.provider = expand_env(&app_config.llm.provider);

        for provider in [
            app_config.llm.openai.as_mut(),
            app_config.llm.anthropic.as_mut(),
            app_config.llm.google.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            provider.api_key = expand_env(&provider.api_key);
            provider.default_model = expand_env(&provider.default_model);
        }

        for entry in &mut app_config.auth.api_keys {
            entry.key = expand_env(&entry.key);
        }

        Ok(app_config)
    }
}

fn expand_env(val: &str) -> String {
    match val.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => val.to_string(),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_braced_variables() {
        std::env::set_var("CONFIG_TEST_EXPAND_KEY", "sk-test");
        assert_eq!(expand_env("${CONFIG_TEST_EXPAND_KEY}"), "sk-test");
        assert_eq!(expand_env("literal"), "literal");
        assert_eq!(expand_env("${CONFIG_TEST_UNSET_VAR}"), "");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load("definitely-not-a-config-file").unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.is_development());
        assert_eq!(config.generation.default_max_tokens, 1000);
    }
}

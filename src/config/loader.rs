use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::PathBuf;

const ENV_PREFIX: &str = "DEEPDIVE_";
const ENV_CONFIG_PATH: &str = "DEEPDIVE_CONFIG";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（低到高）：
    /// 1. 内置开发环境默认值
    /// 2. ./deepdive.toml 或 `DEEPDIVE_CONFIG` 指定的文件
    /// 3. `DEEPDIVE_` 前缀的环境变量，嵌套字段用 `__` 分隔
    pub fn load() -> Result<AppConfig, figment::Error> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(path)
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: PathBuf) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["CONFIG"])
                    .split("__"),
            )
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.search.backend_timeout_secs == 0 || config.llm.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if config.search.max_concurrent_requests == 0 {
            return Err(ConfigValidationError::InvalidConcurrency);
        }

        if !(0.0..=1.0).contains(&config.graph.min_edge_weight) {
            return Err(ConfigValidationError::InvalidEdgeWeight(
                config.graph.min_edge_weight,
            ));
        }

        if !matches!(config.llm.backend.as_str(), "gemini" | "ollama") {
            return Err(ConfigValidationError::UnknownLlmBackend(
                config.llm.backend.clone(),
            ));
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("超时时间必须大于 0")]
    InvalidTimeout,

    #[error("并发请求数必须大于 0")]
    InvalidConcurrency,

    #[error("最小边权重必须在 [0, 1] 之间: {0}")]
    InvalidEdgeWeight(f32),

    #[error("未知的语言模型后端: {0}")]
    UnknownLlmBackend(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("deepdive.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}

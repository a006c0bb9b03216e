use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 单次研究请求超时（秒）
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout: 300,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 浏览器搜索后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// 是否启用浏览器后端（需要 `browser` 特性）
    pub enabled: bool,
    /// 无头模式
    pub headless: bool,
    /// 会话池大小
    pub pool_size: usize,
    /// 最多翻页数
    pub max_pages: usize,
    /// Chrome 可执行文件路径
    pub chrome_path: Option<PathBuf>,
    /// 搜索引擎地址
    pub search_base_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            headless: true,
            pool_size: 2,
            max_pages: 3,
            chrome_path: None,
            search_base_url: "https://www.bing.com".into(),
        }
    }
}

/// 托管爬取 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedCrawlConfig {
    /// 是否启用
    pub enabled: bool,
    /// API 地址
    pub base_url: String,
    /// API 密钥
    pub api_key: Option<String>,
}

impl Default for HostedCrawlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.firecrawl.dev".into(),
            api_key: None,
        }
    }
}

impl HostedCrawlConfig {
    /// 已启用且配置了非空 API 密钥
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
    }
}

/// 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 低于该数量的去重结果时继续调用下一个后端
    pub min_results: usize,
    /// 单个后端调用超时（秒）
    pub backend_timeout_secs: u64,
    /// 并发抓取的最大连接数
    pub max_concurrent_requests: usize,
    /// 跟踪链接的最大数量
    pub max_followed_links: usize,
    /// 是否抓取结果页面正文
    pub follow_links: bool,
    /// User-Agent
    pub user_agent: String,
    /// 直接抓取使用的搜索引擎地址
    pub scrape_base_url: String,
    /// 浏览器后端
    pub browser: BrowserConfig,
    /// 托管爬取后端
    pub hosted: HostedCrawlConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_results: 3,
            backend_timeout_secs: 30,
            max_concurrent_requests: 5,
            max_followed_links: 10,
            follow_links: false,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .into(),
            scrape_base_url: "https://www.bing.com".into(),
            browser: BrowserConfig::default(),
            hosted: HostedCrawlConfig::default(),
        }
    }
}

/// 语言模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// 后端类型: "gemini" 或 "ollama"
    pub backend: String,
    /// 模型名称
    pub model: String,
    /// 服务地址
    pub base_url: String,
    /// API 密钥
    pub api_key: Option<String>,
    /// 采样温度
    pub temperature: f32,
    /// 最大输出 token 数
    pub max_tokens: u32,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "gemini".into(),
            model: "gemini-1.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

/// 布局算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAlgorithm {
    /// 力导向（弹簧）布局
    #[default]
    Force,
    /// 圆形布局
    Circular,
    /// 随机布局
    Random,
}

impl std::fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutAlgorithm::Force => write!(f, "force"),
            LayoutAlgorithm::Circular => write!(f, "circular"),
            LayoutAlgorithm::Random => write!(f, "random"),
        }
    }
}

/// 知识图谱配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// 最小边权重（含）
    pub min_edge_weight: f32,
    /// 最大节点数
    pub max_nodes: usize,
    /// 布局算法
    pub layout_algorithm: LayoutAlgorithm,
    /// 节点大小缩放系数
    pub node_size_scale: f32,
    /// 边宽度缩放系数
    pub edge_width_scale: f32,
    /// 布局随机种子
    pub layout_seed: u64,
    /// 力导向迭代次数
    pub layout_iterations: usize,
    /// 中心性排名返回数量
    pub top_k: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_edge_weight: 0.5,
            max_nodes: 1000,
            layout_algorithm: LayoutAlgorithm::Force,
            node_size_scale: 1000.0,
            edge_width_scale: 2.0,
            layout_seed: 42,
            layout_iterations: 50,
            top_k: 5,
        }
    }
}

/// 结果快照配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 是否保存结果快照
    pub enabled: bool,
    /// 输出目录
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: PathBuf::from("./data/research_results"),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 搜索配置
    pub search: SearchConfig,
    /// 语言模型配置
    pub llm: LlmConfig,
    /// 知识图谱配置
    pub graph: GraphConfig,
    /// 快照配置
    pub storage: StorageConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            search: SearchConfig::default(),
            llm: LlmConfig::default(),
            graph: GraphConfig::default(),
            storage: StorageConfig::default(),
            app_name: "deepdive".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config.search.browser.enabled = cfg!(feature = "browser");
        config
    }
}

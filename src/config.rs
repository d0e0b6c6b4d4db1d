use uuid::Uuid;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次生成调用限时（秒）
    pub generation_timeout_secs: u64,
    /// 传输层故障的最大尝试次数（含首次调用）
    pub generation_max_attempts: u32,
    /// 重试间隔（毫秒）
    pub generation_retry_backoff_ms: u64,
    // --- 假名化配置 ---
    /// UUID v5 命名空间，同一命名空间下同一学号永远映射到同一假名
    pub pseudonym_namespace: Uuid,
    // --- 存储配置 ---
    /// 历史记录存储文件（JSON Lines，只追加）
    pub history_file: String,
    /// 学习习惯评分存储文件
    pub habit_file: String,
    /// 构建提示词时每科保留的最近历史条数
    pub history_per_subject_limit: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 密钥类变量（API key、假名命名空间）必须存在且合法，缺失直接在
    /// 启动期返回 `ConfigError`，而不是拖到每个请求里失败。
    pub fn from_env() -> AppResult<Self> {
        let llm_api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| AppError::env_var_not_found("LLM_API_KEY"))?;

        let namespace_raw = std::env::var("PSEUDONYM_NAMESPACE")
            .map_err(|_| AppError::env_var_not_found("PSEUDONYM_NAMESPACE"))?;
        let pseudonym_namespace = Uuid::parse_str(namespace_raw.trim()).map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: "PSEUDONYM_NAMESPACE".to_string(),
                value: namespace_raw.clone(),
                expected_type: "UUID".to_string(),
            })
        })?;

        Ok(Self {
            llm_api_key,
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_model_name: std::env::var("LLM_MODEL_NAME")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            generation_timeout_secs: env_parse("GENERATION_TIMEOUT_SECS", 30),
            generation_max_attempts: env_parse("GENERATION_MAX_ATTEMPTS", 2),
            generation_retry_backoff_ms: env_parse("GENERATION_RETRY_BACKOFF_MS", 500),
            pseudonym_namespace,
            history_file: std::env::var("HISTORY_FILE")
                .unwrap_or_else(|_| "history.jsonl".to_string()),
            habit_file: std::env::var("HABIT_FILE").unwrap_or_else(|_| "habits.jsonl".to_string()),
            history_per_subject_limit: env_parse("HISTORY_PER_SUBJECT_LIMIT", 6),
            verbose_logging: env_parse("VERBOSE_LOGGING", false),
        })
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

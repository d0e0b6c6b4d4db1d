use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 输入错误（调用方责任，不重试）
    Input(InputError),
    /// 配置错误（运维责任，启动期致命）
    Config(ConfigError),
    /// 生成服务错误（传输层故障，可有限重试）
    Generation(GenerationError),
    /// 生成内容格式错误（内容不合 schema，不自动重试）
    MalformedResponse(MalformedResponseError),
    /// 持久化错误（按科目上报，不折叠为一个不透明错误）
    Repository(RepositoryError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Input(e) => write!(f, "输入错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Generation(e) => write!(f, "生成服务错误: {}", e),
            AppError::MalformedResponse(e) => write!(f, "生成内容格式错误: {}", e),
            AppError::Repository(e) => write!(f, "持久化错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Input(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Generation(e) => Some(e),
            AppError::MalformedResponse(e) => Some(e),
            AppError::Repository(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 输入错误
#[derive(Debug)]
pub enum InputError {
    /// 学生标识为空
    MissingStudentId,
    /// 保留期限（毕业日期）缺失或无法解析
    InvalidRetentionDate {
        value: String,
    },
    /// 文档内容为空
    EmptyDocument,
    /// 文档中没有任何课程评语块
    NoSegmentsFound,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::MissingStudentId => write!(f, "学生标识不能为空"),
            InputError::InvalidRetentionDate { value } => {
                write!(f, "无法解析保留期限: '{}'", value)
            }
            InputError::EmptyDocument => write!(f, "文档内容为空"),
            InputError::NoSegmentsFound => {
                write!(f, "文档中未找到任何课程评语块")
            }
        }
    }
}

impl std::error::Error for InputError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量不存在
    EnvVarNotFound {
        var_name: String,
    },
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarNotFound { var_name } => {
                write!(f, "环境变量 {} 不存在", var_name)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 生成服务错误（传输层）
#[derive(Debug)]
pub enum GenerationError {
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 调用超时
    Timeout {
        model: String,
        timeout_secs: u64,
    },
    /// 返回结果为空
    EmptyResponse {
        model: String,
    },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::ApiCallFailed { model, source } => {
                write!(f, "生成服务 API 调用失败 (模型: {}): {}", model, source)
            }
            GenerationError::Timeout {
                model,
                timeout_secs,
            } => {
                write!(
                    f,
                    "生成服务调用超时 (模型: {}, 限时: {}秒)",
                    model, timeout_secs
                )
            }
            GenerationError::EmptyResponse { model } => {
                write!(f, "生成服务返回内容为空 (模型: {})", model)
            }
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 生成内容格式错误
///
/// 生成调用本身成功，但返回内容不符合要求的 JSON schema。
/// 原始文本保留在错误里供日志诊断，绝不原样展示给最终用户。
#[derive(Debug)]
pub enum MalformedResponseError {
    /// JSON 解析失败
    JsonParseFailed {
        raw_text: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 顶层结构不是对象数组
    NotAnArray {
        raw_text: String,
    },
}

impl MalformedResponseError {
    /// 供日志诊断用的原始文本
    pub fn raw_text(&self) -> &str {
        match self {
            MalformedResponseError::JsonParseFailed { raw_text, .. }
            | MalformedResponseError::NotAnArray { raw_text } => raw_text,
        }
    }
}

impl fmt::Display for MalformedResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedResponseError::JsonParseFailed { source, .. } => {
                write!(f, "生成内容不是合法 JSON: {}", source)
            }
            MalformedResponseError::NotAnArray { .. } => {
                write!(f, "生成内容顶层结构不是对象数组")
            }
        }
    }
}

impl std::error::Error for MalformedResponseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MalformedResponseError::JsonParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 持久化错误
#[derive(Debug)]
pub enum RepositoryError {
    /// 追加记录失败
    AppendFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 读取存储文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 记录序列化失败
    SerializeFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 整批记录全部提交失败
    ///
    /// 逐科的失败原因完整带上，不折叠成一个不透明错误。
    AllCommitsFailed {
        /// (科目代码, 失败原因)
        failures: Vec<(String, String)>,
    },
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::AppendFailed { path, source } => {
                write!(f, "追加记录失败 ({}): {}", path, source)
            }
            RepositoryError::ReadFailed { path, source } => {
                write!(f, "读取存储文件失败 ({}): {}", path, source)
            }
            RepositoryError::SerializeFailed { source } => {
                write!(f, "记录序列化失败: {}", source)
            }
            RepositoryError::AllCommitsFailed { failures } => {
                let detail: Vec<String> = failures
                    .iter()
                    .map(|(subject, reason)| format!("{}: {}", subject, reason))
                    .collect();
                write!(
                    f,
                    "整批记录全部提交失败 ({} 条): {}",
                    failures.len(),
                    detail.join("; ")
                )
            }
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::AppendFailed { source, .. }
            | RepositoryError::ReadFailed { source, .. }
            | RepositoryError::SerializeFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            RepositoryError::AllCommitsFailed { .. } => None,
        }
    }
}

// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建生成服务调用错误
    pub fn generation_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Generation(GenerationError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建生成超时错误
    pub fn generation_timeout(model: impl Into<String>, timeout_secs: u64) -> Self {
        AppError::Generation(GenerationError::Timeout {
            model: model.into(),
            timeout_secs,
        })
    }

    /// 创建追加记录错误
    pub fn append_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Repository(RepositoryError::AppendFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建环境变量缺失错误
    pub fn env_var_not_found(var_name: impl Into<String>) -> Self {
        AppError::Config(ConfigError::EnvVarNotFound {
            var_name: var_name.into(),
        })
    }

    /// 面向最终用户的提示语
    ///
    /// 输入错误可以告诉调用方怎么改；其余类别只给笼统提示，
    /// 内部细节（含生成服务的原始坏输出）只进日志——那里面
    /// 可能混着残缺的个人信息。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Input(e) => e.to_string(),
            AppError::Config(_) => "服务配置异常，请联系管理员".to_string(),
            AppError::Generation(_) | AppError::Repository(_) => {
                "服务暂时不可用，请稍后重试".to_string()
            }
            AppError::MalformedResponse(_) | AppError::Other(_) => {
                "分析处理失败，请稍后重试".to_string()
            }
        }
    }

    /// 是否属于传输层生成错误（可有限重试）
    pub fn is_transient_generation(&self) -> bool {
        matches!(
            self,
            AppError::Generation(
                GenerationError::ApiCallFailed { .. } | GenerationError::Timeout { .. }
            )
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

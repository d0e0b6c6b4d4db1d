//! 生成服务客户端 - 业务能力层
//!
//! 只负责"提示词进、原始文本出"能力，不关心流程。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//!
//! 外部生成服务是不确定、不受控的黑盒：每次调用都有限时，
//! 传输层故障（请求失败、超时）在配置允许的次数内重试，
//! 内容不合 schema 绝不重试——同一提示词大概率复现同样的
//! 坏输出，重试只是白花钱。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, GenerationError};
use crate::services::prompt_builder::PromptMessages;

/// 生成后端接口
///
/// 编排层只依赖这个接口，真实实现是 `LlmService`，
/// 测试里用脚本化的假后端驱动完整流程。
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// 发送提示词，返回原始响应文本
    async fn generate(&self, messages: &PromptMessages) -> AppResult<String>;
}

/// 生成服务客户端
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout_secs: u64,
    max_attempts: u32,
    backoff_ms: u64,
}

impl LlmService {
    /// 创建新的生成服务客户端
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            timeout_secs: config.generation_timeout_secs,
            max_attempts: config.generation_max_attempts.max(1),
            backoff_ms: config.generation_retry_backoff_ms,
        }
    }

    /// 单次调用
    async fn call_once(&self, messages: &PromptMessages) -> AppResult<String> {
        debug!("调用生成服务，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", messages.user.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(messages.system.as_str())
            .build()
            .map_err(|e| AppError::generation_failed(&self.model_name, e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(messages.user.as_str())
            .build()
            .map_err(|e| AppError::generation_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(2048u32)
            .build()
            .map_err(|e| AppError::generation_failed(&self.model_name, e))?;

        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| AppError::generation_timeout(&self.model_name, self.timeout_secs))?
        .map_err(|e| AppError::generation_failed(&self.model_name, e))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Generation(GenerationError::EmptyResponse {
                    model: self.model_name.clone(),
                })
            })?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::Generation(GenerationError::EmptyResponse {
                model: self.model_name.clone(),
            }));
        }

        debug!("生成服务调用成功，响应长度: {} 字符", content.len());

        Ok(content)
    }
}

#[async_trait]
impl GenerationBackend for LlmService {
    async fn generate(&self, messages: &PromptMessages) -> AppResult<String> {
        retry_transient(self.max_attempts, self.backoff_ms, || self.call_once(messages)).await
    }
}

/// 传输层故障的有限重试
///
/// 只重试 `is_transient_generation` 为真的错误（请求失败、超时）；
/// 空响应和内容类失败原样返回。尝试次数含首次调用。
async fn retry_transient<F, Fut>(max_attempts: u32, backoff_ms: u64, mut call: F) -> AppResult<String>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = AppResult<String>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(content) => return Ok(content),
            Err(e) if e.is_transient_generation() && attempt < max_attempts => {
                warn!(
                    "⚠️ 生成服务第 {}/{} 次调用失败: {}，{}ms 后重试",
                    attempt, max_attempts, e, backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

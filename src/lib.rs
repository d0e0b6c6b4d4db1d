//! # Report Card Insight
//!
//! 学生成绩报告单的逐科进展分析流水线
//!
//! ## 架构设计
//!
//! 本系统采用三层架构：
//!
//! ### ① 领域模型层（Models）
//! - `models/` - 科目封闭集合、评语段、历史记录、假名标识
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务只持有单一能力
//! - `SegmentExtractor` - 报告单全文切分能力
//! - `Pseudonymizer` - 学号假名化能力
//! - `HistoryStore` - 历史追加与读取能力
//! - `PromptBuilder` - 受限提示词构建能力
//! - `LlmService` - 生成服务调用能力（限时 + 有限重试）
//! - `ResponseValidator` - 不可信输出的校验归一化能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 一次请求的阶段机：
//!   接收 → 切分 → 取历史 → 建提示词 → 生成 → 校验 → 提交
//!
//! HTTP 服务、文件上传、CORS 这些 I/O 外壳不在本 crate 范围内，
//! 它们是调用方；`main.rs` 只是一个最薄的命令行调用示例。

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AnalysisRequest, AnalysisResponse, HistoryRecord, PseudonymousId, Subject};
pub use orchestrator::{Pipeline, Stage, StageError};
pub use services::{GenerationBackend, PromptMessages};

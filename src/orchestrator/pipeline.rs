//! 分析流水线 - 编排层
//!
//! ## 职责
//!
//! 1. **组装能力**：持有切分、假名化、存储、提示词、生成、校验各服务
//! 2. **阶段推进**：一次请求严格顺序走完各阶段，不回跳、不分叉
//! 3. **错误定位**：任一阶段失败都带着阶段上下文向上抛，不静默吞掉
//! 4. **提交语义**：校验通过的记录逐科独立提交，单科失败不回滚其余
//!
//! 阶段机：接收 → 切分 → 取历史 → 建提示词 → 生成 → 校验 → 提交。
//! 提交阶段之前不发生任何写入；生成或校验整体失败时一条记录
//! 都不会落盘。多个请求之间无共享可变状态，可自由并发。

use std::fmt;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, InputError, RepositoryError};
use crate::models::{
    AnalysisRequest, AnalysisResponse, HabitRecord, HistoryRecord, SubjectSummary,
};
use crate::services::{
    GenerationBackend, HistoryStore, LlmService, PromptBuilder, Pseudonymizer, ResponseValidator,
    SegmentExtractor,
};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Extracted,
    HistoryFetched,
    Prompted,
    Generated,
    Validated,
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "RECEIVED",
            Stage::Extracted => "EXTRACTED",
            Stage::HistoryFetched => "HISTORY_FETCHED",
            Stage::Prompted => "PROMPTED",
            Stage::Generated => "GENERATED",
            Stage::Validated => "VALIDATED",
            Stage::Committed => "COMMITTED",
        };
        write!(f, "{}", name)
    }
}

/// 带阶段上下文的流水线失败
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub source: AppError,
}

impl StageError {
    fn new(stage: Stage, source: AppError) -> Self {
        Self { stage, source }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "阶段 {} 失败: {}", self.stage, self.source)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// 分析流水线
pub struct Pipeline {
    extractor: SegmentExtractor,
    pseudonymizer: Pseudonymizer,
    store: HistoryStore,
    prompt_builder: PromptBuilder,
    validator: ResponseValidator,
    backend: Box<dyn GenerationBackend>,
    verbose_logging: bool,
}

impl Pipeline {
    /// 用指定的生成后端组装流水线（测试用脚本化后端走这里）
    pub fn new(config: &Config, backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            extractor: SegmentExtractor::new(),
            pseudonymizer: Pseudonymizer::new(config.pseudonym_namespace),
            store: HistoryStore::new(&config.history_file, &config.habit_file),
            prompt_builder: PromptBuilder::new(config.history_per_subject_limit),
            validator: ResponseValidator::new(),
            backend,
            verbose_logging: config.verbose_logging,
        }
    }

    /// 用真实生成服务组装流水线
    pub fn with_llm(config: &Config) -> Self {
        Self::new(config, Box::new(LlmService::new(config)))
    }

    /// 分析一份报告单
    ///
    /// 返回本次新生成的逐科结果；既往历史不在响应里。
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResponse, StageError> {
        // ========== RECEIVED ==========
        if request.student_id.trim().is_empty() {
            return Err(StageError::new(
                Stage::Received,
                AppError::Input(InputError::MissingStudentId),
            ));
        }
        if request.document_text.trim().is_empty() {
            return Err(StageError::new(
                Stage::Received,
                AppError::Input(InputError::EmptyDocument),
            ));
        }

        // 真实学号到此为止，之后只有假名
        let pseudonymous_id = self.pseudonymizer.derive(request.student_id.trim());
        info!("📥 收到分析请求 (假名: {})", pseudonymous_id);

        // ========== EXTRACTED ==========
        let segments = self
            .extractor
            .extract(&request.document_text)
            .map_err(|e| StageError::new(Stage::Extracted, AppError::Other(e.to_string())))?;

        if segments.is_empty() {
            // 零段落时生成没有意义，在这里就停
            return Err(StageError::new(
                Stage::Extracted,
                AppError::Input(InputError::NoSegmentsFound),
            ));
        }
        info!("✓ 切分完成: {} 个评语段", segments.len());

        // 详细日志（如果启用）
        if self.verbose_logging {
            for segment in &segments {
                info!(
                    "  [{}] {}",
                    segment.subject_code,
                    crate::utils::logging::truncate_text(&segment.comment_text, 80)
                );
            }
        }

        // ========== HISTORY_FETCHED ==========
        let history = self
            .store
            .fetch_history(&pseudonymous_id)
            .await
            .map_err(|e| StageError::new(Stage::HistoryFetched, e))?;
        info!("✓ 已取历史: {} 条", history.len());

        // ========== PROMPTED ==========
        let messages = self.prompt_builder.build(&segments, &history);
        info!("✓ 提示词已构建");

        // ========== GENERATED ==========
        let raw_response = self
            .backend
            .generate(&messages)
            .await
            .map_err(|e| StageError::new(Stage::Generated, e))?;
        info!("✓ 生成完成: {} 字符", raw_response.len());
        debug!(
            "响应预览: {}",
            crate::utils::logging::truncate_text(&raw_response, 120)
        );

        // ========== VALIDATED ==========
        let batch = self.validator.validate(&raw_response).map_err(|e| {
            if let AppError::MalformedResponse(ref m) = e {
                // 原始坏输出只进日志，可能含残缺的个人信息，绝不回给用户
                debug!("生成服务原始输出: {}", m.raw_text());
            }
            StageError::new(Stage::Validated, e)
        })?;
        info!(
            "✓ 校验完成: 接受 {} 条, 拒绝 {} 条",
            batch.records.len(),
            batch.rejected
        );

        // ========== COMMITTED ==========
        let created_at = chrono::Utc::now();
        let mut summaries = Vec::with_capacity(batch.records.len());
        let mut commit_failures = Vec::new();

        for record in &batch.records {
            let history_record = HistoryRecord {
                pseudonymous_id: pseudonymous_id.clone(),
                subject_code: record.subject_code.clone(),
                progression_summary: record.progression_summary.clone(),
                focus_recommendation: record.focus_recommendation.clone(),
                flagged: record.flagged,
                created_at,
                purge_after: request.retention_date,
            };

            // 逐科独立提交：单科失败记下来继续，已提交的不回滚
            match self.store.commit_record(&history_record).await {
                Ok(_) => {
                    if record.flagged {
                        warn!("⚠️ 未识别科目已入库并标记");
                    }
                    summaries.push(SubjectSummary {
                        subject: record.subject_code.clone(),
                        progression_summary: record.progression_summary.clone(),
                        focus_recommendation: record.focus_recommendation.clone(),
                    });
                }
                Err(e) => {
                    error!("❌ 科目 {} 提交失败: {}", record.subject_code, e);
                    commit_failures.push((record.subject_code.clone(), e.to_string()));
                }
            }
        }

        if summaries.is_empty() && !commit_failures.is_empty() {
            // 一条都没写成，整个提交阶段算失败，逐科原因完整上报
            return Err(StageError::new(
                Stage::Committed,
                AppError::Repository(RepositoryError::AllCommitsFailed {
                    failures: commit_failures,
                }),
            ));
        }

        info!(
            "✅ 分析完成: 提交 {} 条, 提交失败 {} 条, 校验拒绝 {} 条",
            summaries.len(),
            commit_failures.len(),
            batch.rejected
        );

        Ok(AnalysisResponse {
            summaries,
            rejected_objects: batch.rejected,
            commit_failures,
        })
    }

    /// 提交一批学习习惯评分
    ///
    /// 每个条目独立追加，单条失败不影响其余。
    pub async fn submit_habits(
        &self,
        ratings: &[(String, i32)],
    ) -> Vec<(String, String)> {
        let recorded_at = chrono::Utc::now();
        let mut failures = Vec::new();

        for (habit, rating) in ratings {
            let record = HabitRecord {
                habit: habit.clone(),
                rating: *rating,
                recorded_at,
            };
            if let Err(e) = self.store.append_habit(&record).await {
                error!("❌ 习惯 {} 评分提交失败: {}", habit, e);
                failures.push((habit.clone(), e.to_string()));
            }
        }

        failures
    }

    /// 按平均评分取前 K 个学习习惯（建议用）
    pub async fn top_habits(&self, k: usize) -> Result<Vec<(String, f64)>, AppError> {
        self.store.top_habits(k).await
    }
}

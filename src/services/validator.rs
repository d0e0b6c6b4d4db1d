//! 响应校验服务 - 业务能力层
//!
//! 只负责"生成服务的原始文本 → 校验过的记录批"能力，不关心流程。
//!
//! 生成服务偶尔会违反它被要求的 schema：裹代码栏、吐散文、
//! 漏键、值类型不对。这里不做任何"输出一定良构"的假设，
//! 按固定顺序处理：剥栏 → 解析 JSON → 顶层形状 → 逐对象校验。
//! 只要有一个对象合格就部分接受，单个坏对象逐条拒绝并计数，
//! 不拖垮整批。未识别科目按"入库并标记"策略保留（subject_code
//! 记 "unknown"、flagged 置 true），不悄悄丢弃——那也是用户
//! 提交文档换来的真实反馈。

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, MalformedResponseError};
use crate::models::Subject;

/// 一条通过校验的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    /// 封闭集合内的科目代码，或 "unknown"
    pub subject_code: String,
    /// 科目未能归一化到封闭集合时为 true
    pub flagged: bool,
    pub progression_summary: String,
    pub focus_recommendation: String,
}

/// 一批校验结果
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub records: Vec<ValidatedRecord>,
    /// 被逐条拒绝的对象数（可观测性用）
    pub rejected: usize,
}

const REQUIRED_KEYS: [&str; 3] = ["subject", "progression_summary", "focus_recommendation"];

/// 响应校验服务
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// 校验并归一化一段原始响应
    pub fn validate(&self, raw: &str) -> AppResult<ValidatedBatch> {
        let stripped = strip_code_fences(raw);

        let value: Value = serde_json::from_str(stripped).map_err(|e| {
            AppError::MalformedResponse(MalformedResponseError::JsonParseFailed {
                raw_text: raw.to_string(),
                source: Box::new(e),
            })
        })?;

        let items = value.as_array().ok_or_else(|| {
            AppError::MalformedResponse(MalformedResponseError::NotAnArray {
                raw_text: raw.to_string(),
            })
        })?;

        let mut records = Vec::with_capacity(items.len());
        let mut rejected = 0;

        for (index, item) in items.iter().enumerate() {
            match self.validate_object(item) {
                Some(record) => records.push(record),
                None => {
                    rejected += 1;
                    warn!("⚠️ 拒绝第 {} 个对象: 缺少必需键或值不是字符串", index + 1);
                }
            }
        }

        debug!(
            "校验完成: 接受 {} 条, 拒绝 {} 条",
            records.len(),
            rejected
        );

        Ok(ValidatedBatch { records, rejected })
    }

    /// 校验单个对象，三个必需键都得是字符串值
    fn validate_object(&self, item: &Value) -> Option<ValidatedRecord> {
        let obj = item.as_object()?;

        let mut values = [""; 3];
        for (slot, key) in values.iter_mut().zip(REQUIRED_KEYS) {
            *slot = obj.get(key)?.as_str()?;
        }
        let [subject_raw, progression_summary, focus_recommendation] = values;

        let (subject_code, flagged) = match Subject::find(subject_raw) {
            Some(subject) => (subject.code().to_string(), false),
            None => ("unknown".to_string(), true),
        };

        Some(ValidatedRecord {
            subject_code,
            flagged,
            progression_summary: progression_summary.to_string(),
            focus_recommendation: focus_recommendation.to_string(),
        })
    }
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 剥掉包裹响应的 Markdown 代码栏
fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // 语言标签不区分大小写、可带空白（```json / ```JSON / ``` json）
        let rest = rest.trim_start();
        s = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_object(subject: &str) -> String {
        format!(
            r#"{{"subject":"{}","progression_summary":"Steady gains this term.","focus_recommendation":"Practice weekly."}}"#,
            subject
        )
    }

    #[test]
    fn test_fenced_json_is_stripped_and_parsed() {
        let raw = format!("```json\n[{}]\n```", complete_object("MA"));
        let batch = ResponseValidator::new().validate(&raw).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected, 0);
        assert_eq!(batch.records[0].subject_code, "MA");
        assert!(!batch.records[0].flagged);
    }

    #[test]
    fn test_bare_fence_without_language_tag() {
        let raw = format!("```\n[{}]\n```", complete_object("EN"));
        let batch = ResponseValidator::new().validate(&raw).unwrap();
        assert_eq!(batch.records.len(), 1);
    }

    #[test]
    fn test_uppercase_fence_tag_is_stripped() {
        let raw = format!("```JSON\n[{}]\n```", complete_object("MA"));
        let batch = ResponseValidator::new().validate(&raw).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].subject_code, "MA");
    }

    #[test]
    fn test_spaced_fence_tag_is_stripped() {
        let raw = format!("``` json\n[{}]\n```", complete_object("SC"));
        let batch = ResponseValidator::new().validate(&raw).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].subject_code, "SC");
    }

    #[test]
    fn test_prose_is_malformed_response() {
        let err = ResponseValidator::new()
            .validate("Here is my analysis of the student.")
            .unwrap_err();
        match err {
            AppError::MalformedResponse(e) => {
                assert!(e.raw_text().contains("analysis"));
            }
            other => panic!("期望 MalformedResponse, 得到 {:?}", other),
        }
    }

    #[test]
    fn test_non_array_top_level_is_malformed() {
        let raw = complete_object("MA");
        let err = ResponseValidator::new().validate(&raw).unwrap_err();
        assert!(matches!(
            err,
            AppError::MalformedResponse(MalformedResponseError::NotAnArray { .. })
        ));
    }

    #[test]
    fn test_missing_key_rejects_only_that_object() {
        let raw = format!(
            r#"[{{"subject":"EN","progression_summary":"x"}}, {}]"#,
            complete_object("MA")
        );
        let batch = ResponseValidator::new().validate(&raw).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected, 1);
        assert_eq!(batch.records[0].subject_code, "MA");
    }

    #[test]
    fn test_non_string_value_rejects_only_that_object() {
        let raw = format!(
            r#"[{{"subject":"EN","progression_summary":42,"focus_recommendation":"y"}}, {}]"#,
            complete_object("SC")
        );
        let batch = ResponseValidator::new().validate(&raw).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected, 1);
    }

    #[test]
    fn test_all_complete_objects_accepted() {
        let raw = format!(
            "[{},{},{}]",
            complete_object("EN"),
            complete_object("ma"),
            complete_object("Visual Arts")
        );
        let batch = ResponseValidator::new().validate(&raw).unwrap();
        assert_eq!(batch.records.len(), 3);
        assert_eq!(batch.rejected, 0);
        let codes: Vec<&str> = batch.records.iter().map(|r| r.subject_code.as_str()).collect();
        assert_eq!(codes, vec!["EN", "MA", "VA"]);
    }

    #[test]
    fn test_unknown_subject_committed_and_flagged_not_dropped() {
        let batch = ResponseValidator::new()
            .validate(&format!("[{}]", complete_object("Astrology")))
            .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].subject_code, "unknown");
        assert!(batch.records[0].flagged);
    }

    #[test]
    fn test_blank_subject_is_flagged_unknown() {
        let batch = ResponseValidator::new()
            .validate(&format!("[{}]", complete_object("")))
            .unwrap();
        assert_eq!(batch.records[0].subject_code, "unknown");
        assert!(batch.records[0].flagged);
    }

    #[test]
    fn test_empty_array_is_valid_and_empty() {
        let batch = ResponseValidator::new().validate("[]").unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.rejected, 0);
    }
}

//! 提示词构建服务 - 业务能力层
//!
//! 只负责"本次评语段 + 既往历史 → 一条受限提示词"能力，不关心流程。
//!
//! 历史会随年份无限累积，提示词不能跟着无限膨胀：入提示词前按
//! 科目只保留最近 N 条（N 来自配置），丢弃更旧的，截断发生时
//! 记日志，绝不悄悄做。保留下来的历史内容原文嵌入，不做转述，
//! 生成服务需要的是逐字的连续性依据。

use serde_json::json;
use tracing::{debug, info};

use crate::models::{HistoryRecord, Segment, ALL_SUBJECTS};

/// 一对聊天消息
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

/// 提示词构建服务
pub struct PromptBuilder {
    /// 每科嵌入提示词的最近历史条数上限
    per_subject_limit: usize,
}

impl PromptBuilder {
    pub fn new(per_subject_limit: usize) -> Self {
        Self { per_subject_limit }
    }

    /// 构建本次分析的 system / user 消息
    pub fn build(&self, segments: &[Segment], history: &[HistoryRecord]) -> PromptMessages {
        let system = "You are an experienced school progress analyst. \
                      You summarize how a student is progressing per subject, \
                      grounded strictly in the teacher comments and prior \
                      summaries you are given. You answer with JSON only, \
                      never with prose around it."
            .to_string();

        let bounded = self.bound_history(history);

        let segments_json: Vec<serde_json::Value> = segments
            .iter()
            .map(|s| {
                json!({
                    "raw_subject_code": s.subject_code,
                    "comment": s.comment_text,
                })
            })
            .collect();

        // 历史内容逐字嵌入；假名与保留期限与生成无关，不进提示词
        let history_json: Vec<serde_json::Value> = bounded
            .iter()
            .map(|r| {
                json!({
                    "subject": r.subject_code,
                    "progression_summary": r.progression_summary,
                    "focus_recommendation": r.focus_recommendation,
                    "recorded_at": r.created_at.to_rfc3339(),
                })
            })
            .collect();

        let vocabulary: Vec<String> = ALL_SUBJECTS
            .into_iter()
            .map(|s| format!("  {} = {}", s.code(), s.name()))
            .collect();

        let user = format!(
            r#"Below are this term's per-subject teacher comments from one student's report card, followed by that student's prior progression history.

Subject vocabulary (the only valid values for "subject"):
{vocabulary}

This term's comment segments (raw codes captured from the document, may be outside the vocabulary):
{segments}

Prior progression history (verbatim, most recent first kept; may be empty):
{history}

For each comment segment:
1. Infer the correct subject from the vocabulary above using the raw code and the comment content. If you are not confident about any vocabulary match, leave "subject" as an empty string.
2. Write a progression summary of 3 to 5 sentences describing how the student is progressing in that subject relative to the prior history supplied above.
3. Write a focus recommendation of 1 to 3 concrete items.

Answer with **only** a JSON array in exactly this shape, no prose, no markdown fences:

[{{"subject": "", "progression_summary": "", "focus_recommendation": ""}}]"#,
            vocabulary = vocabulary.join("\n"),
            segments = serde_json::to_string_pretty(&segments_json).unwrap_or_default(),
            history = serde_json::to_string_pretty(&history_json).unwrap_or_default(),
        );

        debug!(
            "提示词构建完成: {} 个评语段, {} 条历史 (截断前 {})",
            segments.len(),
            bounded.len(),
            history.len()
        );

        PromptMessages { system, user }
    }

    /// 按科目保留最近 N 条历史
    ///
    /// 输入来自存储层，已按科目升序、科目内 created_at 升序排好；
    /// 这里对每科从尾部取最近 N 条，整体顺序保持不变。
    fn bound_history<'a>(&self, history: &'a [HistoryRecord]) -> Vec<&'a HistoryRecord> {
        let mut kept: Vec<&HistoryRecord> = Vec::with_capacity(history.len());

        let mut i = 0;
        while i < history.len() {
            let subject = &history[i].subject_code;
            let mut j = i;
            while j < history.len() && &history[j].subject_code == subject {
                j += 1;
            }
            let start = j.saturating_sub(self.per_subject_limit).max(i);
            if start > i {
                info!(
                    "科目 {} 历史 {} 条超出上限 {}，只保留最近 {} 条",
                    subject,
                    j - i,
                    self.per_subject_limit,
                    self.per_subject_limit
                );
            }
            kept.extend(&history[start..j]);
            i = j;
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PseudonymousId;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn record(subject: &str, day: u32, summary: &str) -> HistoryRecord {
        HistoryRecord {
            pseudonymous_id: PseudonymousId("pid".to_string()),
            subject_code: subject.to_string(),
            progression_summary: summary.to_string(),
            focus_recommendation: "focus".to_string(),
            flagged: false,
            created_at: Utc.with_ymd_and_hms(2026, 1, day, 8, 0, 0).unwrap(),
            purge_after: NaiveDate::from_ymd_opt(2030, 6, 30).unwrap(),
        }
    }

    #[test]
    fn test_prompt_embeds_history_verbatim() {
        let builder = PromptBuilder::new(6);
        let segments = vec![Segment::new("MA", "Solid quarter overall.")];
        let history = vec![record(
            "MA",
            3,
            "Made a breakthrough with fraction word problems.",
        )];

        let messages = builder.build(&segments, &history);
        assert!(messages
            .user
            .contains("Made a breakthrough with fraction word problems."));
        assert!(messages.user.contains("Solid quarter overall."));
    }

    #[test]
    fn test_prompt_lists_closed_vocabulary() {
        let builder = PromptBuilder::new(6);
        let messages = builder.build(&[Segment::new("MA", "x")], &[]);
        for subject in ALL_SUBJECTS {
            assert!(messages.user.contains(subject.code()));
            assert!(messages.user.contains(subject.name()));
        }
    }

    #[test]
    fn test_prompt_demands_bare_json_array() {
        let builder = PromptBuilder::new(6);
        let messages = builder.build(&[Segment::new("EN", "x")], &[]);
        assert!(messages.user.contains("only"));
        assert!(messages.user.contains(r#""subject""#));
        assert!(messages.user.contains(r#""progression_summary""#));
        assert!(messages.user.contains(r#""focus_recommendation""#));
    }

    #[test]
    fn test_history_bounded_to_most_recent_per_subject() {
        let builder = PromptBuilder::new(2);
        // 存储层顺序：科目升序、科目内时间升序
        let history = vec![
            record("EN", 1, "en-old"),
            record("EN", 2, "en-mid"),
            record("EN", 3, "en-new"),
            record("MA", 1, "ma-only"),
        ];

        let kept = builder.bound_history(&history);
        let summaries: Vec<&str> = kept.iter().map(|r| r.progression_summary.as_str()).collect();
        assert_eq!(summaries, vec!["en-mid", "en-new", "ma-only"]);

        let messages = builder.build(&[Segment::new("EN", "x")], &history);
        assert!(!messages.user.contains("en-old"));
        assert!(messages.user.contains("en-new"));
    }

    #[test]
    fn test_empty_history_is_fine() {
        let builder = PromptBuilder::new(6);
        let messages = builder.build(&[Segment::new("MA", "x")], &[]);
        assert!(messages.user.contains("may be empty"));
    }
}

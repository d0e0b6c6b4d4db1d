use chrono::{DateTime, NaiveDate, Utc};

/// 假名化学生标识
///
/// 真实学号经 UUID v5 单向映射得到的固定长度字符串，
/// 是所有历史记录的关联键。真实学号不进日志、不进存储。
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PseudonymousId(pub String);

impl std::fmt::Display for PseudonymousId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 一条进展历史记录
///
/// 每次成功的生成+校验产生一条，按 (假名, 科目, 提交事件) 累积，
/// 只追加、不覆盖。`purge_after` 在创建时由调用方提供的保留期限
/// 一次性确定，之后不可变，到期后由外部清理进程删除。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryRecord {
    pub pseudonymous_id: PseudonymousId,
    /// 封闭集合内的科目代码，或 "unknown"
    pub subject_code: String,
    pub progression_summary: String,
    pub focus_recommendation: String,
    /// 未识别科目按"入库并标记"策略保留时为 true
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
    pub purge_after: NaiveDate,
}

/// 一条学习习惯评分记录
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HabitRecord {
    pub habit: String,
    pub rating: i32,
    pub recorded_at: DateTime<Utc>,
}

/// 单科生成结果（对外输出形态）
///
/// 键名与生成服务被要求返回的 JSON 键一致。
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub progression_summary: String,
    pub focus_recommendation: String,
}

/// 一次分析请求
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// 已提取好的报告单全文
    pub document_text: String,
    /// 真实学生标识（只在内存里活到假名化为止）
    pub student_id: String,
    /// 保留期限（毕业日期），决定 purge_after
    pub retention_date: NaiveDate,
}

/// 一次分析的聚合结果
///
/// 只包含本次新生成的记录，不含全量历史。部分提交失败
/// 按科目逐条列出，不折叠成一个不透明错误。
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisResponse {
    pub summaries: Vec<SubjectSummary>,
    /// 校验阶段被逐条拒绝的对象数（可观测性用）
    pub rejected_objects: usize,
    /// (科目代码, 失败原因)
    pub commit_failures: Vec<(String, String)>,
}

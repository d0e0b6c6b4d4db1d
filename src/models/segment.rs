/// 一段课程评语
///
/// 由切分器从报告单文本中切出，按文档出现顺序排列。
/// `subject_code` 是原样捕获的两字母代码，未识别的代码也会
/// 保留下来流入生成环节，由生成服务推断归属，映射到封闭科目
/// 集合的工作放在校验环节。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    /// 原始科目代码（两字母，原样保留）
    pub subject_code: String,
    /// 评语正文
    pub comment_text: String,
}

impl Segment {
    pub fn new(subject_code: impl Into<String>, comment_text: impl Into<String>) -> Self {
        Self {
            subject_code: subject_code.into(),
            comment_text: comment_text.into(),
        }
    }
}

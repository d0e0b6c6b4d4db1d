/// 科目枚举
///
/// 报告单使用固定的两字母科目代码，这是全系统唯一的封闭科目集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Subject {
    /// 英语
    English,
    /// 数学
    Mathematics,
    /// 科学
    Science,
    /// 外语习得
    LanguageAcquisition,
    /// 历史
    History,
    /// 个人与社会
    IndividualsAndSocieties,
    /// 宗教与哲学
    ReligionAndPhilosophy,
    /// 表演艺术
    PerformingArts,
    /// 视觉艺术
    VisualArts,
}

/// 全部科目，按代码升序
pub const ALL_SUBJECTS: [Subject; 9] = [
    Subject::English,
    Subject::History,
    Subject::IndividualsAndSocieties,
    Subject::LanguageAcquisition,
    Subject::Mathematics,
    Subject::PerformingArts,
    Subject::ReligionAndPhilosophy,
    Subject::Science,
    Subject::VisualArts,
];

impl Subject {
    /// 获取科目代码（两字母）
    pub fn code(self) -> &'static str {
        match self {
            Subject::English => "EN",
            Subject::Mathematics => "MA",
            Subject::Science => "SC",
            Subject::LanguageAcquisition => "LA",
            Subject::History => "HI",
            Subject::IndividualsAndSocieties => "IN",
            Subject::ReligionAndPhilosophy => "RP",
            Subject::PerformingArts => "PA",
            Subject::VisualArts => "VA",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::English => "English",
            Subject::Mathematics => "Mathematics",
            Subject::Science => "Science",
            Subject::LanguageAcquisition => "Language Acquisition",
            Subject::History => "History",
            Subject::IndividualsAndSocieties => "Individuals and Societies",
            Subject::ReligionAndPhilosophy => "Religion and Philosophy",
            Subject::PerformingArts => "Performing Arts",
            Subject::VisualArts => "Visual Arts",
        }
    }

    /// 从代码解析科目（精确匹配，大小写敏感）
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "EN" => Some(Subject::English),
            "MA" => Some(Subject::Mathematics),
            "SC" => Some(Subject::Science),
            "LA" => Some(Subject::LanguageAcquisition),
            "HI" => Some(Subject::History),
            "IN" => Some(Subject::IndividualsAndSocieties),
            "RP" => Some(Subject::ReligionAndPhilosophy),
            "PA" => Some(Subject::PerformingArts),
            "VA" => Some(Subject::VisualArts),
            _ => None,
        }
    }

    /// 智能查找科目（去空白、不区分大小写，代码或名称都可）
    ///
    /// 生成服务返回的 subject 字段既可能是代码也可能是全名，
    /// 这里统一归一化到封闭集合。
    pub fn find(s: &str) -> Option<Self> {
        let normalized = s.trim();
        if normalized.is_empty() {
            return None;
        }

        // 先按代码匹配
        if let Some(subject) = Self::from_code(&normalized.to_uppercase()) {
            return Some(subject);
        }

        // 再按名称匹配
        let lower = normalized.to_lowercase();
        ALL_SUBJECTS
            .into_iter()
            .find(|subject| subject.name().to_lowercase() == lower)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for subject in ALL_SUBJECTS {
            assert_eq!(Subject::from_code(subject.code()), Some(subject));
        }
    }

    #[test]
    fn test_find_normalizes() {
        assert_eq!(Subject::find("ma"), Some(Subject::Mathematics));
        assert_eq!(Subject::find("  EN  "), Some(Subject::English));
        assert_eq!(Subject::find("mathematics"), Some(Subject::Mathematics));
        assert_eq!(
            Subject::find("Individuals and Societies"),
            Some(Subject::IndividualsAndSocieties)
        );
    }

    #[test]
    fn test_find_rejects_unknown() {
        assert_eq!(Subject::find("ZZ"), None);
        assert_eq!(Subject::find(""), None);
        assert_eq!(Subject::find("   "), None);
        assert_eq!(Subject::find("Astrology"), None);
    }

    #[test]
    fn test_all_subjects_sorted_by_code() {
        let mut codes: Vec<&str> = ALL_SUBJECTS.iter().map(|s| s.code()).collect();
        let sorted = {
            let mut c = codes.clone();
            c.sort();
            c
        };
        assert_eq!(codes, sorted);
        codes.dedup();
        assert_eq!(codes.len(), 9);
    }
}

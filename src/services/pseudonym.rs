//! 假名化服务 - 业务能力层
//!
//! 只负责"真实学号 → 假名"能力，不关心流程。
//!
//! 采用 UUID v5（命名空间 + 名字的 SHA-1 摘要）：同一命名空间下
//! 同一学号永远得到同一假名，跨进程、跨语言实现结果一致——
//! 假名是所有历史记录的关联键，这一点是硬性要求。没有命名空间
//! 密钥无法反推真实学号。

use uuid::Uuid;

use crate::models::PseudonymousId;

/// 假名化服务
pub struct Pseudonymizer {
    namespace: Uuid,
}

impl Pseudonymizer {
    /// 创建假名化服务
    ///
    /// 命名空间已在 `Config::from_env` 里完成解析校验，
    /// 缺失或非法在启动期就会以 `ConfigError` 失败。
    pub fn new(namespace: Uuid) -> Self {
        Self { namespace }
    }

    /// 从真实学号派生假名
    ///
    /// 纯确定性函数。调用方负责保证真实学号此后不再进入
    /// 日志或存储。
    pub fn derive(&self, student_id: &str) -> PseudonymousId {
        let id = Uuid::new_v5(&self.namespace, student_id.as_bytes());
        PseudonymousId(id.hyphenated().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_namespace() -> Uuid {
        Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap()
    }

    #[test]
    fn test_same_input_same_pseudonym() {
        let p = Pseudonymizer::new(test_namespace());
        assert_eq!(p.derive("student-1024"), p.derive("student-1024"));
    }

    #[test]
    fn test_distinct_inputs_distinct_pseudonyms() {
        let p = Pseudonymizer::new(test_namespace());
        let ids: Vec<_> = ["a", "b", "student-1", "student-2", "Student-1", ""]
            .iter()
            .map(|s| p.derive(s))
            .collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert_ne!(ids[i], ids[j]);
            }
        }
    }

    #[test]
    fn test_namespace_changes_pseudonym() {
        let p1 = Pseudonymizer::new(test_namespace());
        let p2 =
            Pseudonymizer::new(Uuid::parse_str("6ba7b811-9dad-11d1-80b4-00c04fd430c8").unwrap());
        assert_ne!(p1.derive("student-1024"), p2.derive("student-1024"));
    }

    #[test]
    fn test_cross_implementation_stability() {
        // RFC 4122 参考值：v5(DNS 命名空间, "www.example.com")
        let dns = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        let p = Pseudonymizer::new(dns);
        assert_eq!(
            p.derive("www.example.com").0,
            "2ed6657d-e927-568b-95e1-2665a8aea6a2"
        );
    }

    #[test]
    fn test_pseudonym_does_not_contain_raw_id() {
        let p = Pseudonymizer::new(test_namespace());
        let raw = "zhang.wei.2027";
        assert!(!p.derive(raw).0.contains(raw));
    }
}

//! 历史存储服务 - 业务能力层
//!
//! 只负责"进展历史的追加与读取"能力，不关心流程。
//!
//! 存储形态是 JSON Lines 文件：一条记录一行，一次 `write_all`
//! 原子落盘。正常写入路径永远只追加，不改写、不删除已有行；
//! 到期清理（`purge_after`）由外部保留期进程负责，不在本模块
//! 范围内。并发请求之间不共享可变状态，依赖追加写入自身的
//! 一致性即可。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{HabitRecord, HistoryRecord, PseudonymousId};

/// 历史存储服务
pub struct HistoryStore {
    history_path: PathBuf,
    habit_path: PathBuf,
}

impl HistoryStore {
    pub fn new(history_path: impl Into<PathBuf>, habit_path: impl Into<PathBuf>) -> Self {
        Self {
            history_path: history_path.into(),
            habit_path: habit_path.into(),
        }
    }

    /// 读取某个假名的全部历史记录
    ///
    /// 排序：科目代码升序，同科目按 created_at 升序。
    /// 没有任何记录时返回空序列（不是错误）。
    pub async fn fetch_history(
        &self,
        pseudonymous_id: &PseudonymousId,
    ) -> AppResult<Vec<HistoryRecord>> {
        let mut records: Vec<HistoryRecord> = self
            .read_lines(&self.history_path)
            .await?
            .into_iter()
            .filter(|record: &HistoryRecord| &record.pseudonymous_id == pseudonymous_id)
            .collect();

        records.sort_by(|a, b| {
            a.subject_code
                .cmp(&b.subject_code)
                .then(a.created_at.cmp(&b.created_at))
        });

        debug!("假名 {} 共 {} 条历史记录", pseudonymous_id, records.len());

        Ok(records)
    }

    /// 追加一条历史记录
    ///
    /// 单条记录一次写入，要么整行落盘要么失败；失败由编排层
    /// 按科目上报，绝不静默丢弃。
    pub async fn commit_record(&self, record: &HistoryRecord) -> AppResult<()> {
        self.append_line(&self.history_path, record)
    }

    /// 追加一条学习习惯评分
    pub async fn append_habit(&self, record: &HabitRecord) -> AppResult<()> {
        self.append_line(&self.habit_path, record)
    }

    /// 按平均评分取前 K 个学习习惯
    pub async fn top_habits(&self, k: usize) -> AppResult<Vec<(String, f64)>> {
        let records: Vec<HabitRecord> = self.read_lines(&self.habit_path).await?;

        let mut sums: std::collections::HashMap<String, (i64, usize)> =
            std::collections::HashMap::new();
        for record in records {
            let entry = sums.entry(record.habit).or_insert((0, 0));
            entry.0 += record.rating as i64;
            entry.1 += 1;
        }

        let mut averages: Vec<(String, f64)> = sums
            .into_iter()
            .map(|(habit, (sum, count))| (habit, sum as f64 / count as f64))
            .collect();
        averages.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        averages.truncate(k);

        Ok(averages)
    }

    // ========== 内部辅助 ==========

    fn append_line<T: serde::Serialize>(&self, path: &Path, record: &T) -> AppResult<()> {
        let line = serde_json::to_string(record).map_err(|e| {
            AppError::Repository(RepositoryError::SerializeFailed {
                source: Box::new(e),
            })
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::append_failed(path.display().to_string(), e))?;

        file.write_all(format!("{}\n", line).as_bytes())
            .map_err(|e| AppError::append_failed(path.display().to_string(), e))?;

        Ok(())
    }

    async fn read_lines<T: serde::de::DeserializeOwned>(&self, path: &Path) -> AppResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Repository(RepositoryError::ReadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // 坏行跳过不致命，存储文件可能被外部工具碰过
                    warn!("⚠️ 跳过损坏的存储行 {}:{}: {}", path.display(), line_no + 1, e);
                }
            }
        }

        Ok(records)
    }
}

//! 评语切分服务 - 业务能力层
//!
//! 只负责"把报告单全文切成逐科评语段"能力，不关心流程。
//!
//! 报告单是松散结构的自由文本，块格式为：
//!
//! ```text
//! Course: MA
//! Teacher: ...
//! Comments: <多行评语，直到下一个 Course: 块或文档结尾>
//! ```
//!
//! 匹配策略被约束在这个窄接口后面（文本进、Segment 序列出），
//! 以后换成版面感知的解析器时下游各环节不需要改动。

use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::Segment;

/// 课程块起始模式
///
/// 非锚定；科目代码原样捕获，是否属于封闭集合留给校验环节判断。
const COURSE_HEAD_PATTERN: &str = r"Course:\s*([A-Za-z]{2})\b";

/// 块内正文模式
///
/// 作用在相邻块首之间的切片上，容忍可变空白与多行评语正文。
const BLOCK_BODY_PATTERN: &str = r"(?s)Teacher:.*?Comments:\s*(.*)";

/// 评语切分服务
///
/// 职责：
/// - 在全文中定位重复出现的课程块
/// - 按文档顺序产出 (科目代码, 评语正文) 序列
/// - 无匹配时返回空序列（不是错误，零段落的语义由编排层定）
/// - 纯函数，同一文本两次切分结果完全一致
pub struct SegmentExtractor;

impl SegmentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 切分报告单全文
    ///
    /// 两步切分：先定位全部块首，再在相邻块首之间的切片里取
    /// Teacher/Comments 正文；缺这两部分的残块跳过不产出。
    pub fn extract(&self, document_text: &str) -> Result<Vec<Segment>> {
        let head_re = Regex::new(COURSE_HEAD_PATTERN)?;
        let body_re = Regex::new(BLOCK_BODY_PATTERN)?;

        let heads: Vec<_> = head_re.captures_iter(document_text).collect();

        let mut segments = Vec::with_capacity(heads.len());
        for (i, caps) in heads.iter().enumerate() {
            let head = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let block_end = heads
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(document_text.len());
            let block = &document_text[head.end()..block_end];

            match body_re.captures(block) {
                Some(body) => {
                    segments.push(Segment::new(caps[1].to_string(), body[1].trim().to_string()));
                }
                None => {
                    debug!("课程块 {} 缺少 Teacher/Comments 部分，跳过", &caps[1]);
                }
            }
        }

        debug!("切分完成: {} 个评语段", segments.len());

        Ok(segments)
    }
}

impl Default for SegmentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 暂存文档守卫
///
/// 上传环节若把文档暂存到文件系统，提取结束后无论成败都必须
/// 删掉。守卫在 Drop 时清理文件，保证每条退出路径都会执行。
pub struct StagedDocument {
    path: PathBuf,
}

impl StagedDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取暂存文档全文
    pub async fn read_text(&self) -> Result<String> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            anyhow::anyhow!("无法读取暂存文档 {}: {}", self.path.display(), e)
        })?;
        Ok(text)
    }
}

impl Drop for StagedDocument {
    fn drop(&mut self) {
        if self.path.exists() {
            match std::fs::remove_file(&self.path) {
                Ok(_) => info!("🗑️ 暂存文档已删除: {}", self.path.display()),
                Err(e) => warn!("⚠️ 暂存文档删除失败 {}: {}", self.path.display(), e),
            }
        }
    }
}

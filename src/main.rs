use anyhow::{Context, Result};
use chrono::NaiveDate;

use report_card_insight::config::Config;
use report_card_insight::error::{AppError, InputError};
use report_card_insight::models::AnalysisRequest;
use report_card_insight::orchestrator::Pipeline;
use report_card_insight::services::StagedDocument;
use report_card_insight::utils::logging;

/// 命令行入口 - 最薄的 I/O 外壳
///
/// 用法: report_card_insight <暂存文档路径> <学号> <保留期限 YYYY-MM-DD>
///
/// 暂存文档在分析结束后无论成败都会被删除。
#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置（密钥缺失在这里就失败，不拖到请求里）
    let config = Config::from_env()?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        anyhow::bail!("用法: {} <暂存文档路径> <学号> <保留期限 YYYY-MM-DD>", args[0]);
    }

    let retention_date = NaiveDate::parse_from_str(&args[3], "%Y-%m-%d").map_err(|_| {
        AppError::Input(InputError::InvalidRetentionDate {
            value: args[3].clone(),
        })
    })?;

    // 暂存文档守卫：读完即删，失败也删
    let staged = StagedDocument::new(&args[1]);
    let document_text = staged.read_text().await?;

    let pipeline = Pipeline::with_llm(&config);

    let result = pipeline
        .analyze(AnalysisRequest {
            document_text,
            student_id: args[2].clone(),
            retention_date,
        })
        .await;

    match result {
        Ok(response) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("结果序列化失败")?
            );
            Ok(())
        }
        Err(e) => {
            // 内部细节进日志，用户只拿到结构化的 {error: ...}
            tracing::error!("{}", e);
            println!(
                "{}",
                serde_json::json!({ "error": e.source.user_message() })
            );
            std::process::exit(1);
        }
    }
}

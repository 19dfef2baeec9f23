use anyhow::Result;
/// 日志工具模块
///
/// 提供运行日志和统计横幅的辅助函数
use std::fs;
use tracing::info;

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n质检报告发送日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 追加一行到日志文件
pub fn append_log_line(log_file_path: &str, line: &str) -> Result<()> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrent`: 最大并发数
/// - `backend`: 邮件后端名称
pub fn log_startup(max_concurrent: usize, backend: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 质检报告批量发送模式");
    info!("📊 最大并发数: {}", max_concurrent);
    info!("📮 邮件后端: {}", backend);
    info!("{}", "=".repeat(60));
}

/// 记录待发送批次信息
pub fn log_pending_loaded(pending: usize, total: usize) {
    info!("✓ 找到 {} 个待发送的批次 (共 {} 个)", pending, total);
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `skipped`: 因缺少证件号而跳过的数量
/// - `failed`: 失败数量
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, skipped: usize, failed: usize, log_file_path: &str) {
    let total = success + skipped + failed;
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("⏭️ 跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

use anyhow::Result;
use quality_report::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    let summary = App::initialize(config).await?.run().await?;

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

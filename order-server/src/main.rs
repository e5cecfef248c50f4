use order_server::{Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    let config = setup_environment()?;

    print_banner();

    tracing::info!("🦀 Order server starting...");

    tracing::info!(
        work_dir = %config.work_dir,
        channel = %config.order_channel,
        durable = %config.durable_name,
        environment = %config.environment,
        "Configuration loaded"
    );

    // 2. 打开订单库和 journal、恢复缓存、启动总线/摄取/HTTP
    let server = Server::new(config);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

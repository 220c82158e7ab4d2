use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omok_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("omok_server=debug".parse()?))
        .init();

    info!("五子棋服务端启动中...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ServerConfig::load(&args)?;
    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("收到退出信号，服务端关闭"),
    }

    Ok(())
}

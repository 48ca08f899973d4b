use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{error, info};

use schoolspace::config::AppConfig;
use schoolspace::infrastructure::build_container;
use schoolspace::logging::{init_logging, OperationTimer};
use schoolspace::server::routes;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径 (默认 ~/.config/schoolspace/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 监听地址，覆盖配置文件中的 server.listen_addr
    #[arg(long)]
    listen_addr: Option<String>,
}

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path.clone()),
        None => AppConfig::load(),
    }
    .context("无法加载配置")?;

    if let Some(listen_addr) = &args.listen_addr {
        config.server.listen_addr = listen_addr.clone();
        config.validate().context("无效的监听地址")?;
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("❌ 无法监听退出信号: {}", e);
        return;
    }
    info!("🛑 收到退出信号，正在关闭");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(config.logging.to_logging_config()?)
        .map_err(|e| anyhow!("无法初始化日志: {}", e))?;

    info!("🚀 启动 SchoolSpace 服务");
    let addr = config.server.socket_addr()?;

    let container = build_container(Arc::new(config)).context("服务注册失败")?;

    let timer = OperationTimer::new("container.initialize");
    if let Err(e) = container.initialize().await {
        error!("❌ 外部资源初始化失败: {}", e);
        return Err(e).context("容器初始化失败");
    }
    timer.finish();

    let (bound, server) = warp::serve(routes(container.clone()))
        .try_bind_with_graceful_shutdown(addr, shutdown_signal())
        .with_context(|| format!("无法监听 {}", addr))?;

    info!("🌐 服务器启动成功，访问: http://{}", bound);
    server.await;

    container.shutdown().await;
    info!("{}", container.stats().performance_summary());
    Ok(())
}

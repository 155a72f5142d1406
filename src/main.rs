use invoice_analytics::{api, create_pool, run_migrations, AppConfig, ChatClient, ReportService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池并建表
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");
    run_migrations(&pool).await?;
    info!("Migrations applied");

    let reports = Arc::new(ReportService::new(pool));
    let chat = Arc::new(ChatClient::new(config.chat.base_url.clone()));
    let app = api::router(reports, chat);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /health");
    info!("  GET  /api/stats, /api/invoice-trends, /api/vendors/top10, /api/category-spend");
    info!("  GET  /api/cash-outflow, /api/invoices, /api/customers[/top|/:id|/:id/trends]");
    info!("  POST /api/chat-with-data -> {}", config.chat.base_url);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

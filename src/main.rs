use order_reconciler::config::get_config;
use order_reconciler::handler;
use order_reconciler::logging::init_tracing;
use serde_json::Value;

#[tokio::main]
async fn main() {
    // Logging comes up first so configuration errors are visible.
    let level = get_config()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&level);

    handler::run(Value::Null, Value::Null).await;
    handler::shutdown().await;
}

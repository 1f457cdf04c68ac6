use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` 優先，否則只顯示本 crate 的訊息
fn env_filter(verbose: bool) -> EnvFilter {
    let default_directive = if verbose {
        "hood_agent=debug,info"
    } else {
        "hood_agent=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// 每個事件一行 JSON，方便把對話紀錄導入日誌系統
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .with_current_span(false),
        )
        .init();
}

/// 依設定檔的 `[logging] format` 選擇輸出格式
pub fn init_logger(verbose: bool, format: &str) {
    if format.eq_ignore_ascii_case("json") {
        init_json_logger(verbose);
    } else {
        init_cli_logger(verbose);
    }
}

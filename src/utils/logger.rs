use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 沒設定 RUST_LOG 時的預設等級；verbose 連 HTTP 層的 debug 一起打開
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "campaign_etl=debug,reqwest=debug,info"
    } else {
        "campaign_etl=info,warn"
    }
}

fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// 終端機用的精簡輸出；寫到 stderr，stdout 留給輸出檔路徑
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON 行輸出，方便交給排程器或日誌收集器。
///
/// 每行都帶上目前的 span，`etl_run` span 上的 `pipeline` 與 `run_id`
/// 因此會出現在每一筆紀錄裡，同一次執行的紀錄可以用 `run_id` 串起來。
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

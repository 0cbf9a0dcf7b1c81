use clap::Parser;

#[tokio::main]
async fn main() {
    let args = orders::arguments::Arguments::parse();
    observe::tracing::initialize(&observe::Config::new(
        &args.log_filter,
        Some(args.log_stderr_threshold),
        args.use_json_logs,
    ));
    tracing::info!("running orders with validated arguments:\n{}", args);
    if let Err(err) = orders::run(args).await {
        tracing::error!(?err, "command failed");
        std::process::exit(1);
    }
}

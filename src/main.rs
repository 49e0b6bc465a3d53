#[tokio::main]
async fn main() {
    ytd_lib::logging::init_tracing();

    if let Err(e) = ytd_lib::run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

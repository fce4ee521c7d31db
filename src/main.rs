#[tokio::main]
async fn main() {
    let code = totemscan::app::startup::startup().await;
    std::process::exit(code);
}

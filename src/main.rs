use std::env;

use kpidash::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Bind address can be overridden as the first argument.
    let args: Vec<String> = env::args().collect();
    let addr = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("127.0.0.1:3000")
        .to_string();

    app::run(&addr).await
}

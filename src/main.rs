use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let data_dir = std::env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    if let Err(e) = shop_backoffice::run(&data_dir).await {
        eprintln!("Fatal: {}", e);
        std::process::exit(1);
    }
}

use eco_sorter::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = eco_sorter::run(AppConfig::from_env()).await {
        log::error!("session failed: {}", e);
        std::process::exit(1);
    }
}

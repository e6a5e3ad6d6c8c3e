use dotenvy::dotenv;
use log::info;
use payment_order_sweeper::{cli::handle_command_line_args, config::SweeperConfig, sweeper::run_sweeper};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = SweeperConfig::from_env_or_default();

    info!("🚀️ Starting payment order sweeper on {}", config.database_url);
    match run_sweeper(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

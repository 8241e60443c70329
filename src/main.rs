use timetable_engine::config::Settings;
use timetable_engine::server;

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_filter)).init();

    if let Err(e) = server::run_server(settings).await {
        log::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

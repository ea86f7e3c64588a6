use movieconnect_api::config::Config;

#[tokio::main]
async fn main() {
    movieconnect_api::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = movieconnect_api::run(config).await {
        tracing::error!(error = %e, "Server exited with error");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

use clap::Parser;

use movieconnect_api::config::Config;

#[derive(Parser, Debug)]
#[command(name = "recommend")]
#[command(about = "Print movie recommendations for a user", long_about = None)]
struct Args {
    /// Username to generate recommendations for
    username: String,

    /// Number of movies to print (defaults to DEFAULT_TOP_N)
    #[arg(short = 'n', long)]
    top_n: Option<usize>,
}

#[tokio::main]
async fn main() {
    movieconnect_api::init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let top_n = args.top_n.unwrap_or(config.default_top_n);

    let (recommender, cache_handle) = movieconnect_api::build_recommender(&config).await?;
    let (_, movies) = recommender.recommend_movies(&args.username, top_n).await?;

    if movies.is_empty() {
        println!("No recommendations available for {}.", args.username);
    } else {
        println!("Recommendations for {}:", args.username);
        for movie in &movies {
            println!("{}", movie.title);
        }
    }

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

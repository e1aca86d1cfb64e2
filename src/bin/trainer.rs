use anyhow::Result;
use clap::Parser;
use tracing::info;
use wellrec::services::catalog::ActivityCatalog;
use wellrec::services::feedback::FeedbackStore;
use wellrec::services::training::TrainingService;
use wellrec::{init_tracing, Config};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    info!("Starting wellness model trainer");

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    info!("Trainer configuration loaded: {:?}", config.training);

    let catalog = ActivityCatalog::load(&config.data.activities_path);
    let interactions = ActivityCatalog::load_interactions(&config.data.interactions_path);
    let feedback_store = FeedbackStore::open(&config.data.ratings_db_path)?;

    let training_service = TrainingService::new(
        config.training.clone(),
        config.data.model_dir.clone(),
        interactions,
    );

    let regime = training_service.train(&feedback_store, &catalog)?;
    info!(regime = %regime, model_dir = %config.data.model_dir.display(), "training run complete");

    feedback_store.log_learning_insights(&catalog);

    Ok(())
}

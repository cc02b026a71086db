use anyhow::Result;
use clap::{Arg, Command};
use tracing::{info, warn};

use trip_extractor::config::Config;
use trip_extractor::pipeline::UrlProcessor;
use trip_extractor::source::classify;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trip_extractor=info,warn".into()),
        )
        .init();

    let matches = Command::new("Travel Location Extractor")
        .version("0.1.0")
        .about("Extracts travel locations from web articles, YouTube videos and Instagram posts")
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("URL to process (web page, YouTube video or Instagram post)")
                .required(true),
        )
        .arg(
            Arg::new("pretty")
                .short('p')
                .long("pretty")
                .help("Pretty-print the result envelope")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let url = matches.get_one::<String>("url").expect("required arg");
    let pretty = matches.get_flag("pretty");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.validate()?;

    info!("🚀 Travel Location Extractor starting...");
    info!("🔗 URL: {} ({})", url, classify(url).as_str());

    let processor = UrlProcessor::from_config(&config)?;

    let start_time = std::time::Instant::now();
    let envelope = processor.process_url(url).await;
    let duration = start_time.elapsed();

    info!("🎉 Processing completed in {:.2}s", duration.as_secs_f64());
    info!(
        "📍 Locations found: {}",
        envelope.extracted_locations.locations.len()
    );
    if let Some(error) = &envelope.extracted_locations.error {
        warn!("❌ Extraction error: {}", error);
    }

    let output = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{}", output);

    Ok(())
}

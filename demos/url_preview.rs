use link_preview::{PreviewConfig, PreviewService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "logging")]
    log_initialize()?;

    let preview_service = PreviewService::new(PreviewConfig::from_env())?;

    let urls: Vec<String> = match std::env::args().skip(1).collect::<Vec<_>>() {
        args if !args.is_empty() => args,
        _ => vec![
            "https://www.rust-lang.org".to_string(),
            "https://news.ycombinator.com".to_string(),
            "https://en.wikipedia.org/wiki/France".to_string(),
            "not a url".to_string(),
        ],
    };

    for url in &urls {
        let start = std::time::Instant::now();
        match preview_service.generate_preview(url).await {
            Ok(preview) => {
                println!("URL: {}", url);
                println!("  Domain: {:?}", preview.domain);
                println!("  Title: {:?}", preview.title);
                println!("  Image: {:?}", preview.image);
                println!(
                    "  Description: {:?}",
                    preview
                        .description
                        .as_ref()
                        .map(|d| d.chars().take(100).collect::<String>())
                );
                println!("  Time taken: {:?}", start.elapsed());

                #[cfg(feature = "logging")]
                link_preview::log_preview_card(&preview);
            }
            Err(e) => {
                println!("Error fetching {}: {}", url, e);

                #[cfg(feature = "logging")]
                link_preview::log_error_card(url, &e);
            }
        }
        println!();
    }

    Ok(())
}

#[cfg(feature = "logging")]
fn log_initialize() -> Result<(), link_preview::PreviewError> {
    use link_preview::{setup_logging, LogConfig};

    setup_logging(LogConfig {
        log_level: "info".into(),
        ..LogConfig::default()
    })?;
    tracing::info!("Link preview demo initialized with logging configuration");
    Ok(())
}

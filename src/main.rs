use futures::StreamExt;
use std::env;
use std::fs;
use std::path::Path;
use toonify::logger::{self, LoggerConfig};
use toonify::{AuthToken, ImageSource, StoreEvent, ToonifyClient, ToonifyConfig, Variant};

fn usage() -> String {
    let variants: Vec<&str> = Variant::all().iter().map(|v| v.as_str()).collect();
    format!(
        "usage: toonify <image-path> [variant]\n  variants: {}",
        variants.join(", ")
    )
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::from_env())?;
    if env_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let mut args = env::args().skip(1);
    let image_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("{}", usage());
            std::process::exit(2);
        }
    };
    let variant: Variant = match args.next() {
        Some(name) => name.parse()?,
        None => Variant::default(),
    };

    let config = ToonifyConfig::from_env();
    logger::log_client_config(&config);

    let token = env::var("TOONIFY_TOKEN").ok().map(AuthToken::new);
    if token.is_none() {
        log::warn!("⚠️  TOONIFY_TOKEN is not set, the service will reject the upload");
    }

    let path = Path::new(&image_path);
    let bytes = fs::read(path)?;
    let mut image = ImageSource::from_bytes(bytes).with_content_type(content_type_for(path));
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        image = image.with_file_name(name);
    }

    let client = ToonifyClient::new(config)?;

    let mut events = client.store().subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                StoreEvent::Inserted(g) => log::info!("🆕 {} is {}", g.id, g.status),
                StoreEvent::Updated(g) => log::info!("🔄 {} is now {}", g.id, g.status),
                StoreEvent::Removed(id) => log::info!("🗑️  {} removed", id),
                StoreEvent::Replaced { count } => log::info!("📚 history holds {} items", count),
            }
        }
    });

    let timer = logger::timer("generation");
    let (generation, handle) = client
        .submit_and_track(Some(&image), variant, token.as_ref())
        .await?;
    log::info!("🚀 Submitted {} with variant {}", generation.id, variant);

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, cancelling");
            client.cancel_all();
            toonify::PollOutcome::Cancelled
        }
    };
    timer.stop();

    if outcome.is_complete() {
        log::info!("✅ {}", outcome.user_message());
    } else {
        log::error!("❌ {}", outcome.user_message());
    }

    if let Err(e) = client.refresh_history(token.as_ref()).await {
        log::warn!("Could not load history: {}", e);
    }
    for item in client.store().list() {
        println!(
            "{}  {:<10}  {}  {}",
            item.created_at.format("%Y-%m-%d %H:%M"),
            item.status.as_str(),
            item.id,
            item.cartoon_image_url.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

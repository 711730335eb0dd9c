use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use cert_render::{CertificateRenderer, FontResolver, PlacementSpec, FONT_CATALOG};
use certportal::api;
use certportal::assets::{AssetCategory, AssetLoader};
use certportal::server;

#[derive(Parser)]
#[command(name = "certportal")]
#[command(about = "Certificate portal - personalized PNG certificates for event participants")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Render one certificate to a PNG file
    Render {
        /// Template image (PNG or JPEG)
        #[arg(short, long)]
        template: PathBuf,

        /// Name to draw
        #[arg(short, long)]
        name: String,

        /// Output PNG file path
        #[arg(short, long)]
        output: PathBuf,

        /// Horizontal centre in percent of the width
        #[arg(short = 'x', long, default_value_t = 50.0)]
        x: f32,

        /// Vertical centre in percent of the height
        #[arg(short = 'y', long, default_value_t = 50.0)]
        y: f32,

        /// Font size in pixels (8-200)
        #[arg(short, long, default_value_t = 36)]
        size: u32,

        /// Text colour as #RRGGBB
        #[arg(short, long, default_value = "#000000")]
        color: String,

        /// Font key (see `certportal fonts`)
        #[arg(short, long, default_value = "arial")]
        font: String,
    },
    /// Show the font catalog and where each font resolves
    Fonts,
    /// Extract embedded assets to filesystem for customization
    Init {
        /// Extract font files
        #[arg(long)]
        fonts: bool,

        /// Extract config.yaml
        #[arg(long)]
        config: bool,

        /// Extract all assets
        #[arg(long)]
        all: bool,

        /// Overwrite existing files
        #[arg(long, short)]
        force: bool,

        /// List embedded assets without extracting
        #[arg(long)]
        list: bool,
    },
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "certportal API",
        description = "Participant-facing certificate endpoints",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(
        api::public::list_events,
        api::public::list_archive,
        api::public::get_event,
        api::public::issue_captcha,
        api::public::verify_email,
        api::public::preview_certificate,
        api::public::download_certificate,
    ),
    components(schemas(
        api::EventSummary,
        api::CaptchaResponse,
        api::VerifyRequest,
        api::VerifyResponse,
    )),
    tags(
        (name = "Events", description = "Event listing"),
        (name = "Certificates", description = "Email verification and certificate delivery")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Render {
            template,
            name,
            output,
            x,
            y,
            size,
            color,
            font,
        }) => {
            let placement = PlacementSpec {
                x_percent: x,
                y_percent: y,
                font_size: size,
                font_color: color,
                font_key: font,
            };
            run_render_command(&template, &name, &output, &placement)
        }
        Some(Commands::Fonts) => {
            run_fonts_command();
            Ok(())
        }
        Some(Commands::Init {
            fonts,
            config,
            all,
            force,
            list,
        }) => run_init_command(fonts, config, all, force, list),
        Some(Commands::Serve) => run_server().await,
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Minimal logging for CLI commands
fn init_cli_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certportal=warn,cert_render=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

/// Font resolver over the fonts directory, seeding it first if needed
fn cli_font_resolver() -> FontResolver {
    let loader = AssetLoader::from_env();
    if let Err(e) = loader.seed() {
        tracing::warn!(%e, "Failed to seed assets");
    }
    FontResolver::new(loader.fonts_dir())
}

/// Render one certificate (no server needed)
fn run_render_command(
    template: &Path,
    name: &str,
    output: &Path,
    placement: &PlacementSpec,
) -> anyhow::Result<()> {
    init_cli_logging();

    let renderer = CertificateRenderer::new(cli_font_resolver());
    let certificate = renderer
        .render_file(template, name, placement, output)
        .map_err(|e| anyhow::anyhow!("Render error: {e}"))?;

    println!(
        "Rendered {} ({}x{}, {} bytes)",
        output.display(),
        certificate.width(),
        certificate.height(),
        certificate.as_bytes().len()
    );
    Ok(())
}

/// Print the catalog with the file each key resolves to
fn run_fonts_command() {
    init_cli_logging();

    let resolver = cli_font_resolver();
    println!("Font search path:");
    for dir in resolver.search_dirs() {
        println!("  {}", dir.display());
    }

    println!("\nFonts:");
    for entry in FONT_CATALOG {
        let location = resolver
            .locate(entry.key)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in bitmap font (no file found)".to_string());
        println!("  {:<11} {:<24} {location}", entry.key, entry.label);
        if !entry.aliases.is_empty() {
            println!("  {:<11} aliases: {}", "", entry.aliases.join(", "));
        }
    }
}

/// Extract embedded assets to filesystem
fn run_init_command(
    fonts: bool,
    config: bool,
    all: bool,
    force: bool,
    list: bool,
) -> anyhow::Result<()> {
    if list {
        println!("Embedded assets:\n");
        println!("Fonts:");
        for f in AssetLoader::list_embedded(AssetCategory::Fonts) {
            println!("  {f}");
        }
        println!("\nConfig:");
        for f in AssetLoader::list_embedded(AssetCategory::Config) {
            println!("  {f}");
        }
        return Ok(());
    }

    // Determine which categories to extract
    let mut categories = Vec::new();
    if all || fonts {
        categories.push(AssetCategory::Fonts);
    }
    if all || config {
        categories.push(AssetCategory::Config);
    }

    if categories.is_empty() {
        eprintln!("No categories specified. Use --all, --fonts, or --config");
        eprintln!("\nRun 'certportal init --list' to see embedded assets.");
        std::process::exit(1);
    }

    let loader = AssetLoader::from_env();
    let report = loader.init(&categories, force)?;

    if !report.written.is_empty() {
        println!("Extracted {} files:", report.written.len());
        for f in &report.written {
            println!("  + {f}");
        }
    }
    if !report.skipped.is_empty() {
        println!(
            "\nSkipped {} existing files (use --force to overwrite):",
            report.skipped.len()
        );
        for f in &report.skipped {
            println!("  - {f}");
        }
    }

    if report.written.is_empty() && report.skipped.is_empty() {
        println!("No files to extract.");
    }

    Ok(())
}

/// Display status and configuration information
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let bind_addr = std::env::var("BIND_ADDR").ok();
    let config_file = std::env::var("CONFIG_FILE").ok();
    let fonts_dir = std::env::var("FONTS_DIR").ok();
    let link_secret = std::env::var("LINK_SECRET").ok();

    println!("certportal v{VERSION}");
    println!("Personalized certificates for event participants\n");

    println!("Environment Variables:");
    println!(
        "  BIND_ADDR   = {}",
        bind_addr.as_deref().unwrap_or("0.0.0.0:3000 (default)")
    );
    println!(
        "  CONFIG_FILE = {}",
        config_file.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  FONTS_DIR   = {}",
        fonts_dir.as_deref().unwrap_or("./fonts (default)")
    );
    println!(
        "  LINK_SECRET = {}",
        if link_secret.is_some() {
            "(set)"
        } else {
            "(not set, random per start)"
        }
    );

    println!("\nAsset Sources:");
    let loader = AssetLoader::from_env();

    let config_source = match loader.config_file() {
        Some(path) if path.exists() => path.display().to_string(),
        Some(_) => "embedded (file not found)".to_string(),
        None => "embedded".to_string(),
    };
    println!("  Config:  {config_source}");

    let on_disk = loader.list_font_files().len();
    let embedded = AssetLoader::list_embedded(AssetCategory::Fonts)
        .iter()
        .filter(|f| f.ends_with(".ttf") || f.ends_with(".otf"))
        .count();
    println!(
        "  Fonts:   {} ({on_disk} on disk, {embedded} embedded)",
        loader.fonts_dir().display()
    );

    println!("\nCommands:");
    println!("  certportal serve    Start the HTTP server");
    println!("  certportal render   Render one certificate to a PNG file");
    println!("  certportal fonts    Show where each catalog font resolves");
    println!("  certportal init     Extract embedded assets");
    println!("\nRun 'certportal --help' for more details.");
}

/// Run the HTTP server
async fn run_server() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certportal=debug,cert_render=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let asset_loader = Arc::new(AssetLoader::from_env());

    tracing::info!(
        fonts = %asset_loader.fonts_dir().display(),
        config = %asset_loader
            .config_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "embedded".to_string()),
        "Asset sources configured"
    );

    match asset_loader.seed() {
        Ok(report) if !report.is_empty() => {
            tracing::info!(
                fonts = report.fonts_seeded.len(),
                config = report.config_seeded,
                "Seeded missing assets from embedded copies"
            );
        }
        Err(e) => {
            tracing::warn!(%e, "Failed to seed assets");
        }
        _ => {}
    }

    let state = server::create_app_state(asset_loader)?;

    let app = server::build_router(state)
        // OpenAPI documentation (production only)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "certportal listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use career_chat::cli::{Cli, Commands, EngineChoice};
use career_chat::config::ChatRenderConfig;
use career_chat::diagrams::{DiagramEngineAdapter, EngineCell, StaticHost, loader_for_config};
use career_chat::markdown::{MessageRenderer, write_page};
use career_chat::message::Message;
use career_chat::view::render_transcript;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    // CLI --log-level takes precedence over DEBUG_LEVEL.
    career_chat::debug::init_log_bridge(cli.log_level.map(|level| level.to_filter()));

    log::info!("Starting career-chat {}", career_chat::VERSION);

    match cli.command {
        Commands::Render {
            transcript,
            output,
            config,
            engine,
        } => render(&transcript, output.as_deref(), config.as_deref(), engine),
        Commands::Inspect { file } => inspect(&file),
    }
}

fn load_config(path: Option<&Path>) -> Result<ChatRenderConfig> {
    match path.map(Path::to_path_buf).or_else(ChatRenderConfig::default_path) {
        Some(path) => ChatRenderConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ChatRenderConfig::default()),
    }
}

fn render(
    transcript: &Path,
    output: Option<&Path>,
    config_path: Option<&Path>,
    engine: Option<EngineChoice>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(engine) = engine {
        config.diagrams.engine = Some(engine.as_config_value().to_string());
    }

    let json = std::fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read transcript {}", transcript.display()))?;
    let messages = Message::parse_transcript(&json)
        .with_context(|| format!("Invalid transcript {}", transcript.display()))?;

    let renderer = MessageRenderer::new(&config);
    let host = Arc::new(StaticHost::new(config.diagrams.resolved_export_dir()));
    // Messages theme their own diagrams; the loader theme covers the load-time check.
    let adapter = DiagramEngineAdapter::new(
        EngineCell::global(),
        loader_for_config(&config.diagrams, &config.theme.assistant),
        host.clone(),
        config.diagrams.clone(),
    );

    // Diagram engines are blocking; fill-in runs them on the blocking pool.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let views = runtime.block_on(render_transcript(&messages, &renderer, &adapter));

    let articles: Vec<String> = views
        .iter()
        .map(|view| view.to_html(&renderer, host.as_ref()))
        .collect();
    let page = write_page("Career chat", &articles);

    match output {
        Some(path) => {
            std::fs::write(path, page)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {} messages to {}", views.len(), path.display());
        }
        None => print!("{page}"),
    }
    Ok(())
}

fn inspect(file: &Path) -> Result<()> {
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let config = load_config(None)?;
    let blocks = MessageRenderer::new(&config).segment(&body);
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

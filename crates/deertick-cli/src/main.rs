mod config;
mod surface;

use anyhow::Context;
use clap::Parser;
use config::DeertickConfig;
use deertick_agent::{
    HttpTransport, MediaGenerator, ModelCatalog, ModelInfo, ReplicateMedia, ReqwestTransport,
    PROVIDERS,
};
use deertick_core::ModelKind;
use deertick_orchestrator::{AgentFactory, ChatSession, Dispatcher};
use deertick_session::FileConversationStore;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surface::StdioSurface;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "deertick",
    version,
    about = "DeerTick: a multi-provider language model interface"
)]
struct Cli {
    /// Model id or display name
    #[arg(short, long, default_value = "Meta: Llama 3.1 405B (base)")]
    model: String,

    /// Provider name or number (see --list); defaults to the model's preferred provider
    #[arg(short, long, default_value = "")]
    provider: String,

    /// System prompt for the conversation
    #[arg(short, long, default_value = "")]
    system: String,

    /// Start an interactive chat session
    #[arg(short, long)]
    interactive: bool,

    /// Send the contents of a file to the model
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Write the reply to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List available models and providers
    #[arg(short, long)]
    list: bool,

    /// Path to config file
    #[arg(short, long, default_value = "deertick.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_listing(catalog: &ModelCatalog) {
    println!("\nmodels:\n");
    for model in catalog.models() {
        println!("\"{}\": \"{}\",", model.name, model.id);
    }
    println!("\nproviders:\n");
    for (i, provider) in PROVIDERS.iter().enumerate() {
        println!("{i}: {provider}");
    }
}

/// Refuse provider choices that are known not to serve the model.
fn check_provider(model: &ModelInfo, provider: &str) -> anyhow::Result<()> {
    if model.kind != ModelKind::Chat && provider == "openrouter" {
        anyhow::bail!("OpenRouter only serves chat models, please choose another provider.");
    }
    if model.incompatible_providers.iter().any(|p| p == provider) {
        anyhow::bail!(
            "Provider '{provider}' is currently incompatible with {}. Please choose another provider.",
            model.name
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    init_tracing(cli.log_json);

    let config = DeertickConfig::load(&cli.config).await?;
    let catalog = Arc::new(ModelCatalog::builtin());

    if cli.list {
        print_listing(&catalog);
        return Ok(());
    }

    let model = catalog
        .find(&cli.model)
        .with_context(|| format!("Invalid model specified: {}", cli.model))?;
    let provider = catalog.resolve_provider(&cli.provider, &cli.model);
    check_provider(model, &provider)?;

    let credentials = Arc::new(config.credentials());
    info!(providers = ?credentials.providers(), "Credentials resolved");

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(Duration::from_secs(
        config.agent.request_timeout_secs,
    ))?);
    let mut replicate = ReplicateMedia::new(
        transport.clone(),
        credentials.clone(),
        config.paths.images.clone(),
        config.paths.audio.clone(),
    )
    .with_visual_settings(config.media.clone());
    if let Some(base) = config.agent.api_base_url.as_deref() {
        replicate = replicate.with_base_url(base);
    }
    let media: Arc<dyn MediaGenerator> = Arc::new(replicate);
    let factory = AgentFactory::new(
        catalog.clone(),
        credentials,
        transport,
        config.agent.clone(),
    )
    .with_voices(config.voices.clone());

    if cli.interactive {
        let mut dispatcher = Dispatcher::new(config.chat.clone()).with_media(media);
        dispatcher.add_agent(factory.build(&cli.model, &provider, &cli.system));

        let store = FileConversationStore::new(config.paths.conversations.clone()).await?;
        info!(dir = %store.dir().display(), "Conversation store ready");
        let store = Arc::new(store);
        let color = !cli.no_color && std::io::stdout().is_terminal();
        let mut session = ChatSession::new(dispatcher, factory, store, StdioSurface::new(color));
        session.run().await?;
    } else if let Some(file) = cli.file {
        let input = tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read input file '{}'", file.display()))?;

        let mut agent = factory.build(&cli.model, &provider, &cli.system);
        let reply = match agent.kind() {
            ModelKind::Chat => agent.respond(&cli.system, &input).await?,
            ModelKind::Voice | ModelKind::Image | ModelKind::Video => {
                agent.generate_media(media.as_ref(), &input).await?
            }
        };

        match cli.output {
            Some(path) => {
                tokio::fs::write(&path, &reply)
                    .await
                    .with_context(|| format!("Failed to write '{}'", path.display()))?;
                info!(path = %path.display(), "Reply written");
            }
            None => println!("Agent: {reply}"),
        }
    } else {
        eprintln!("Nothing to do. Use -i for a chat, -f FILE for a single reply, or -l to list models.");
    }

    Ok(())
}

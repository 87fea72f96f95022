//! Ladle - streaming multi-part chat pipeline
//!
//! Runs one generation from the command line, streaming events as they
//! arrive and persisting the reconciled exchange.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ladle::message::Role;
use ladle::store::MessageStore;
use ladle::{
    ArtifactSlot, ChatMode, GenerationRequest, Message, ModelRelatedQuestions, OpenAiModel,
    PartReconciler, RelatedQuestionsSource, SqliteStore, StreamEvent, StreamMultiplexer,
    ToolRegistry, ToolSecrets,
};

/// Ladle - streaming chat with tools and artifacts
#[derive(Parser, Debug)]
#[command(name = "ladle")]
#[command(version, about, long_about = None)]
struct Args {
    /// Prompt to send
    prompt: String,

    /// Chat mode (chat, reasoning, search, artifact)
    #[arg(short = 'M', long, default_value = "chat")]
    mode: ChatMode,

    /// Model name to request
    #[arg(short, long, default_value = "gpt-4o-mini")]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "LADLE_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// API key for the model endpoint
    #[arg(long, env = "LADLE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Chat to append this exchange to
    #[arg(short, long, default_value = "default")]
    chat_id: String,

    /// Weather tool API key
    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true, default_value = "")]
    weather_api_key: String,

    /// Web search tool API key
    #[arg(long, env = "SEARCH_API_KEY", hide_env_values = true, default_value = "")]
    search_api_key: String,

    /// Transcription service URL
    #[arg(long, env = "TRANSCRIPTION_URL", default_value = "")]
    transcription_url: String,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "trace"
    } else if args.debug {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let model: Arc<dyn ladle::LanguageModel> = Arc::new(OpenAiModel::new(
        args.base_url.clone(),
        args.api_key.clone(),
        args.model.clone(),
    ));
    let registry = Arc::new(ToolRegistry::new(ToolSecrets {
        weather_api_key: args.weather_api_key.clone(),
        search_api_key: args.search_api_key.clone(),
        transcription_url: args.transcription_url.clone(),
    }));
    let store = SqliteStore::open()?;

    let mut history: Vec<Message> = store
        .messages(&args.chat_id)?
        .into_iter()
        .map(|m| Message {
            id: m.id.to_string(),
            role: m.role,
            content: m.content,
            parts: m.parts,
            attachments: m.attachments,
            created_at: m.created_at,
        })
        .collect();

    let user_message = Message::user(&args.prompt);
    store.create_message(
        &args.chat_id,
        Role::User,
        &user_message.content,
        &user_message.parts,
        &user_message.attachments,
    )?;
    history.push(user_message);

    let mux = StreamMultiplexer::new(Arc::clone(&model), registry);
    let mut events = mux.generate(GenerationRequest {
        chat_id: Some(args.chat_id.clone()),
        messages: history,
        mode: args.mode,
    });

    let mut reconciler = PartReconciler::new();
    let mut failed = false;
    while let Some(event) = events.recv().await {
        match &event {
            StreamEvent::TextDelta { text } => print!("{text}"),
            StreamEvent::ReasoningDelta { text } => eprint!("{text}"),
            StreamEvent::ToolCall { tool_name, .. } => {
                eprintln!("\n[calling {tool_name}...]");
            }
            StreamEvent::ToolError { error, .. } => {
                eprintln!("\n[tool failed: {error}]");
            }
            StreamEvent::Error { message } => {
                eprintln!("\nerror: {message}");
                failed = true;
            }
            _ => {}
        }
        reconciler.apply(&event);
    }
    println!();

    let mut artifact_slot = ArtifactSlot::new();
    for part in reconciler.parts() {
        artifact_slot.observe_part(part);
    }
    if let Some(artifact) = artifact_slot.current() {
        eprintln!(
            "\n[artifact open: \"{}\" ({})]",
            artifact.title,
            artifact.artifact_type.as_str()
        );
    }

    if !failed {
        let assistant = Message::assistant(reconciler.into_parts());
        store.create_message(
            &args.chat_id,
            Role::Assistant,
            &assistant.content,
            &assistant.parts,
            &assistant.attachments,
        )?;

        let suggestions = ModelRelatedQuestions::new(model)
            .related_questions(&args.prompt, &assistant.content)
            .await;
        if !suggestions.is_empty() {
            eprintln!("\nRelated:");
            for question in suggestions {
                eprintln!("  - {question}");
            }
        }
    }

    Ok(())
}

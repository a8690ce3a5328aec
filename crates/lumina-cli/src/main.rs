mod console_key;
mod render;

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lumina_contracts::attachment::Attachment;
use lumina_contracts::chat::{parse_intent, ChatMessage, Intent, Role, CHAT_HELP_COMMANDS};
use lumina_contracts::events::EventWriter;
use lumina_contracts::settings::{
    resolve_style, style_presets, AspectRatio, GenerationSettings, ImageResolution, NO_STYLE_ID,
};
use lumina_engine::{
    ChatSession, CredentialSource, EngineConfig, GeminiClient, GenerationApi, ImageAdapter,
};
use tracing::warn;

use crate::console_key::ConsoleCredentials;
use crate::render::save_image;

#[derive(Debug, Parser)]
#[command(name = "lumina", version, about = "Chat-style image generation on Gemini")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat; plain lines are prompts, /help lists commands.
    Chat(ChatArgs),
    /// Generate a single image and exit.
    Generate(GenerateArgs),
    /// List the style presets.
    Styles,
}

#[derive(Debug, Clone, Args)]
struct SettingsArgs {
    #[arg(long, default_value = "1:1")]
    aspect_ratio: AspectRatio,
    #[arg(long, default_value = "4K")]
    resolution: ImageResolution,
    #[arg(long, default_value = NO_STYLE_ID)]
    style: String,
}

impl SettingsArgs {
    fn into_settings(self) -> GenerationSettings {
        if resolve_style(&self.style).id != self.style {
            warn!(style = %self.style, "unknown style preset; no style modifier will be applied");
        }
        GenerationSettings {
            aspect_ratio: self.aspect_ratio,
            resolution: self.resolution,
            style: self.style,
        }
    }
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[arg(long, default_value = "lumina-out")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[command(flatten)]
    session: SessionArgs,
    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long, default_value = "")]
    prompt: String,
    #[arg(long)]
    attach: Option<PathBuf>,
    #[command(flatten)]
    session: SessionArgs,
    #[command(flatten)]
    settings: SettingsArgs,
}

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("lumina error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Generate(args) => run_generate(args),
        Command::Styles => {
            print_styles(&mut io::stdout())?;
            Ok(0)
        }
    }
}

fn open_session(
    args: &SessionArgs,
    credentials: Arc<dyn CredentialSource>,
) -> Result<ChatSession<GeminiClient>> {
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let config = EngineConfig::from_env().with_model(args.model.clone());
    let client = GeminiClient::from_config(&config, credentials)?;
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let session_id = format!("session-{}", compact_timestamp());
    ChatSession::new(
        ImageAdapter::new(client, config.model),
        Some(EventWriter::new(events_path, session_id)),
    )
}

/// Blocks until a key is selected; returns false if the user gave none.
fn ensure_key(credentials: &dyn CredentialSource) -> Result<bool> {
    if credentials.has_selected_key() {
        return Ok(true);
    }
    println!("An API key for a paid Gemini project is required to generate images.");
    credentials.select_key()
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let credentials: Arc<dyn CredentialSource> = Arc::new(ConsoleCredentials::new());
    if !ensure_key(credentials.as_ref())? {
        bail!("no API key selected");
    }
    let mut session = open_session(&args.session, credentials.clone())?;
    let out_dir = args.session.out.clone();
    let mut settings = args.settings.into_settings();
    let mut staged: Option<(PathBuf, Attachment)> = None;

    let stdin = io::stdin();
    let mut line = String::new();
    println!("Lumina chat started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        match intent.action.as_str() {
            "noop" => continue,
            "generate" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                let attachment = staged.take().map(|(_, attachment)| attachment);
                chat_turn(&mut session, &prompt, &settings, attachment, &out_dir);
            }
            "send_attachment" => match staged.take() {
                Some((_, attachment)) => {
                    chat_turn(&mut session, "", &settings, Some(attachment), &out_dir);
                }
                None => println!("Nothing attached. Use /attach <path> first."),
            },
            "select_key" => {
                if credentials.select_key()? {
                    println!("API key selected.");
                } else {
                    println!("No API key entered; keeping the previous one.");
                }
            }
            _ => {
                let reply = apply_command(&intent, &mut settings, &mut staged);
                match reply {
                    CommandReply::Print(text) => println!("{text}"),
                    CommandReply::History => print_history(session.transcript().messages()),
                    CommandReply::Styles => print_styles(&mut io::stdout())?,
                }
            }
        }
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let credentials: Arc<dyn CredentialSource> = Arc::new(ConsoleCredentials::new());
    if !ensure_key(credentials.as_ref())? {
        bail!("no API key selected");
    }
    let attachment = args
        .attach
        .as_deref()
        .map(Attachment::from_path)
        .transpose()?;
    if args.prompt.trim().is_empty() && attachment.is_none() {
        bail!("--prompt or --attach is required");
    }

    let mut session = open_session(&args.session, credentials)?;
    let settings = args.settings.into_settings();
    let saved = send_and_render(
        &mut session,
        &args.prompt,
        &settings,
        attachment,
        &args.session.out,
    )?;
    if session.last_error().is_some() {
        return Ok(1);
    }
    Ok(if saved.is_some() { 0 } else { 2 })
}

/// Sends one message and prints the assistant reply. Returns the saved image path.
fn send_and_render<A: GenerationApi>(
    session: &mut ChatSession<A>,
    prompt: &str,
    settings: &GenerationSettings,
    attachment: Option<Attachment>,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    println!("Generating {} {} ...", settings.resolution, settings.aspect_ratio);
    let Some(reply) = session.send(prompt, settings, attachment).cloned() else {
        println!("Nothing to send.");
        return Ok(None);
    };
    println!("{}", reply.content);
    if let Some(detail) = session.last_error() {
        eprintln!("  error: {detail}");
    }
    let Some(image_url) = reply.image_url.as_deref() else {
        return Ok(None);
    };
    let index = session.transcript().len();
    let path = save_image(out_dir, image_url, index)?;
    println!("Image saved to {}", path.display());
    Ok(Some(path))
}

/// One REPL turn. A reply whose image cannot be saved is reported and the
/// chat goes on.
fn chat_turn<A: GenerationApi>(
    session: &mut ChatSession<A>,
    prompt: &str,
    settings: &GenerationSettings,
    attachment: Option<Attachment>,
    out_dir: &Path,
) -> Option<PathBuf> {
    match send_and_render(session, prompt, settings, attachment, out_dir) {
        Ok(saved) => saved,
        Err(err) => {
            eprintln!("  could not save image: {err:#}");
            None
        }
    }
}

enum CommandReply {
    Print(String),
    History,
    Styles,
}

fn apply_command(
    intent: &Intent,
    settings: &mut GenerationSettings,
    staged: &mut Option<(PathBuf, Attachment)>,
) -> CommandReply {
    let text = match intent.action.as_str() {
        "help" => format!("Commands: {}", CHAT_HELP_COMMANDS.join(" ")),
        "set_aspect_ratio" => match intent.arg_str("value").map(str::parse::<AspectRatio>) {
            Some(Ok(ratio)) => {
                settings.aspect_ratio = ratio;
                format!("Aspect ratio set to {ratio}")
            }
            Some(Err(err)) => err.to_string(),
            None => "/ratio requires a value".to_string(),
        },
        "set_resolution" => match intent.arg_str("value").map(str::parse::<ImageResolution>) {
            Some(Ok(resolution)) => {
                settings.resolution = resolution;
                let (api_tier, boosted) = resolution.api_tier();
                if boosted {
                    format!(
                        "Resolution set to {resolution} (requested as {api_tier} with a detail boost)"
                    )
                } else {
                    format!("Resolution set to {resolution}")
                }
            }
            Some(Err(err)) => err.to_string(),
            None => "/resolution requires a value".to_string(),
        },
        "set_style" => match intent.arg_str("value") {
            Some(id) if resolve_style(id).id == id => {
                settings.style = id.to_string();
                format!("Style set to {}", resolve_style(id).name)
            }
            Some(id) => format!("Unknown style '{id}'. Use /styles to list presets."),
            None => "/style requires a preset id".to_string(),
        },
        "show_settings" => format_settings(settings, staged.as_ref().map(|(path, _)| path.as_path())),
        "attach" => match intent.arg_str("path") {
            Some(path) => {
                let path = PathBuf::from(path);
                match Attachment::from_path(&path) {
                    Ok(attachment) => {
                        let text = format!(
                            "Attached {} ({}); it will be sent with the next prompt.",
                            path.display(),
                            attachment.mime_type
                        );
                        *staged = Some((path, attachment));
                        text
                    }
                    Err(err) => format!("{err:#}"),
                }
            }
            None => "/attach requires a path".to_string(),
        },
        "detach" => match staged.take() {
            Some((path, _)) => format!("Removed attachment {}", path.display()),
            None => "Nothing attached.".to_string(),
        },
        "show_history" => return CommandReply::History,
        "list_styles" => return CommandReply::Styles,
        "unknown" => format!(
            "Unknown command /{}. Type /help for commands.",
            intent.arg_str("command").unwrap_or_default()
        ),
        other => format!("Unsupported action {other}"),
    };
    CommandReply::Print(text)
}

fn format_settings(settings: &GenerationSettings, staged: Option<&Path>) -> String {
    let style = settings.style_preset();
    let mut text = format!(
        "Aspect ratio: {}\nResolution: {}\nStyle: {} ({})",
        settings.aspect_ratio, settings.resolution, style.name, style.id
    );
    if let Some(path) = staged {
        text.push_str(&format!("\nAttachment: {}", path.display()));
    }
    text
}

fn print_styles(out: &mut impl Write) -> Result<()> {
    for preset in style_presets() {
        if preset.prompt_modifier.is_empty() {
            writeln!(out, "{:<16} {}", preset.id, preset.name)?;
        } else {
            writeln!(out, "{:<16} {} ({})", preset.id, preset.name, preset.prompt_modifier)?;
        }
    }
    Ok(())
}

fn print_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        println!("No messages yet.");
        return;
    }
    for message in messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "lumina",
        };
        let mut line = format!("[{who}] {}", message.content);
        if message.attachment.is_some() {
            line.push_str(" [reference image]");
        }
        if message.image_url.is_some() {
            line.push_str(" [image]");
        }
        println!("{line}");
    }
}

fn compact_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use salesbuddy::config::OutputKind;
use salesbuddy::{
    AudioBackend, AudioBackendConfig, AudioOutput, Config, FileMicrophone, HttpBackend, Role,
    SessionConfig, SessionController, SessionEvent, TimedOutput, TurnOutcome,
};

#[derive(Parser)]
#[command(name = "salesbuddy", version, about = "Talk to the SalesBuddy assistant")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/salesbuddy")]
    config: String,

    /// Use a fresh session id instead of the configured one
    #[arg(long)]
    new_session: bool,

    /// Write the transcript here when done
    #[arg(long)]
    export: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one typed question
    Ask { text: Vec<String> },
    /// Ask one spoken question from a WAV file, or the microphone when omitted
    Voice { wav: Option<PathBuf> },
    /// Interactive conversation on stdin
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let mut session_config = SessionConfig::from_config(&cfg);
    if cli.new_session {
        session_config = session_config.with_fresh_session_id();
    }

    info!("SalesBuddy v{}", env!("CARGO_PKG_VERSION"));
    info!("Session: {}", session_config.session_id);
    info!(
        "Voice: {}, export: {}, theme: {:?}",
        cfg.features.enable_voice, cfg.features.enable_export, cfg.features.theme
    );

    let backend = HttpBackend::new(&cfg.backend).context("Failed to create backend client")?;
    info!("Backend: {}", backend.base_url());
    let output = open_output(&cfg);
    let mut session = SessionController::new(session_config, Arc::new(backend), output);

    match cli.command {
        Command::Ask { text } => {
            let question = text.join(" ");
            let answer = session.ask(&question).await?;
            println!("{}", answer);
            report(session.run_until_idle().await);
        }
        Command::Voice { wav } => {
            let outcome = match wav {
                Some(wav) => {
                    let mic = FileMicrophone::new(wav, AudioBackendConfig::from(&cfg.audio));
                    voice_turn(&mut session, Box::new(mic), async {}).await?
                }
                None => {
                    let mut lines = BufReader::new(tokio::io::stdin()).lines();
                    println!("Recording, press Enter to send");
                    let enter = async {
                        let _ = lines.next_line().await;
                    };
                    voice_turn(&mut session, live_microphone(&cfg)?, enter).await?
                }
            };
            print_outcome(&outcome);
            report(session.run_until_idle().await);
        }
        Command::Chat => chat(&mut session, &cfg).await?,
    }

    if let Some(path) = cli.export {
        let written = session.export_transcript(Some(&path))?;
        println!("Transcript written to {}", written.display());
    }

    let stats = session.end_session().await;
    info!(
        "Session ended: {} turns, {} failed, {:.1}s",
        stats.turns_completed, stats.failed_requests, stats.duration_secs
    );

    Ok(())
}

/// Record until `until` resolves, then wait for the answer
async fn voice_turn(
    session: &mut SessionController,
    microphone: Box<dyn AudioBackend>,
    until: impl Future<Output = ()>,
) -> Result<TurnOutcome> {
    session.set_microphone(microphone)?;
    session.start_recording().await?;
    until.await;
    let seq = session.stop_recording().await?;
    Ok(session.await_turn(seq).await?)
}

#[cfg(feature = "devices")]
fn open_output(cfg: &Config) -> Box<dyn AudioOutput> {
    if cfg.playback.output == OutputKind::Speaker {
        match salesbuddy::SpeakerOutput::open() {
            Ok(speaker) => return Box::new(speaker),
            Err(e) => warn!("{}; answers will not be played aloud", e),
        }
    }
    Box::new(TimedOutput::new(cfg.spool_dir()))
}

#[cfg(not(feature = "devices"))]
fn open_output(cfg: &Config) -> Box<dyn AudioOutput> {
    if cfg.playback.output == OutputKind::Speaker {
        warn!("Built without the devices feature; answers will not be played aloud");
    }
    Box::new(TimedOutput::new(cfg.spool_dir()))
}

#[cfg(feature = "devices")]
fn live_microphone(cfg: &Config) -> Result<Box<dyn AudioBackend>> {
    Ok(Box::new(salesbuddy::CpalMicrophone::new(
        cfg.audio.input_device.clone(),
        AudioBackendConfig::from(&cfg.audio),
    )))
}

#[cfg(not(feature = "devices"))]
fn live_microphone(_cfg: &Config) -> Result<Box<dyn AudioBackend>> {
    anyhow::bail!("built without the devices feature; pass a WAV file instead")
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Answer(text) => println!("agent> {}", text),
        TurnOutcome::Voice(answer) => {
            println!("you>   {}", answer.user_text);
            println!("agent> {}", answer.resp_text);
        }
    }
}

/// Log background events the CLI doesn't otherwise show
fn report(events: Vec<SessionEvent>) {
    for event in events {
        match event {
            SessionEvent::PlaybackStarted { id } => info!("Speaking (playback {})", id),
            SessionEvent::PlaybackFailed { error } => warn!("Could not play answer: {}", error),
            SessionEvent::PlaybackFinished { id } => info!("Playback {} finished", id),
            other => info!("{:?}", other),
        }
    }
}

const CHAT_HELP: &str = "Type a question, or: /voice [file.wav]  /pause  /resume  /stop  /export [path]  /history  /quit";

async fn chat(session: &mut SessionController, cfg: &Config) -> Result<()> {
    println!("{}", CHAT_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = if session.has_pending_work() {
            tokio::select! {
                line = lines.next_line() => line?,
                event = session.next_event() => {
                    show_event(event);
                    continue;
                }
            }
        } else {
            lines.next_line().await?
        };

        let Some(line) = line else {
            break;
        };

        let line = line.trim();
        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => println!("{}", CHAT_HELP),
            ("/pause", _) => {
                session.pause_playback();
            }
            ("/resume", _) => {
                session.resume_playback();
            }
            ("/stop", _) => {
                session.stop_playback();
            }
            ("/history", _) => {
                for message in session.state().messages() {
                    let who = match message.role() {
                        Role::User => "you",
                        Role::Agent => "agent",
                    };
                    println!("[{}] {}> {}", message.timestamp().format("%H:%M:%S"), who, message.text());
                }
            }
            ("/export", path) => {
                let path = (!path.is_empty()).then(|| PathBuf::from(path.trim()));
                match session.export_transcript(path.as_deref()) {
                    Ok(written) => println!("Transcript written to {}", written.display()),
                    Err(e) => println!("Export failed: {}", e),
                }
            }
            ("/voice", path) => {
                let result = if path.trim().is_empty() {
                    match live_microphone(cfg) {
                        Ok(mic) => {
                            println!("Recording, press Enter to send");
                            let enter = async {
                                let _ = lines.next_line().await;
                            };
                            voice_turn(session, mic, enter).await
                        }
                        Err(e) => Err(e),
                    }
                } else {
                    let mic = FileMicrophone::new(path.trim(), AudioBackendConfig::from(&cfg.audio));
                    voice_turn(session, Box::new(mic), async {}).await
                };
                match result {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => println!("Voice question failed: {}", e),
                }
            }
            _ => {
                session.set_draft(line);
                if session.submit_draft().is_some() {
                    println!("...");
                }
            }
        }
    }

    Ok(())
}

fn show_event(event: SessionEvent) {
    match event {
        SessionEvent::AnswerReceived { text, .. } => println!("agent> {}", text),
        SessionEvent::VoiceTurnCompleted { answer, .. } => {
            println!("you>   {}", answer.user_text);
            println!("agent> {}", answer.resp_text);
        }
        SessionEvent::RequestFailed { error, .. } => println!("Error occurred: {}", error),
        SessionEvent::PlaybackFailed { error } => warn!("Could not play answer: {}", error),
        SessionEvent::StaleResponseDiscarded { seq } => info!("Ignored late reply {}", seq),
        SessionEvent::PlaybackStarted { id } => info!("Speaking (playback {})", id),
        SessionEvent::PlaybackFinished { id } => info!("Playback {} finished", id),
    }
}

use anyhow::Context;
use clap::Parser;
use sadbot_core::{AffectPolicy, SadbotConfig};
use sadbot_expression::{Conductor, SimOptions, SimulatedPlayer, VideoMixer};
use sadbot_limbic::{AffectTracker, HeartbeatConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sad Robot stage driver", long_about = None)]
struct Args {
    /// Path to the TOML config file (defaults are used if missing)
    #[arg(short, long, default_value = "sadbot.toml")]
    config: String,

    /// Affect policy: accumulator or smoothed
    #[arg(long)]
    policy: Option<AffectPolicy>,

    /// Sentiment provider: openai, relay or mock
    #[arg(long)]
    provider: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Decay tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Simulated clip load latency in milliseconds
    #[arg(long, default_value_t = 50)]
    load_latency_ms: u64,
}

fn init_logging(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(env_filter)
            .init();
    }
}

enum Command<'a> {
    Say(&'a str),
    Listen,
    State,
    Reset,
    Tick,
    Quit,
    Help,
    Empty,
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "" => Command::Empty,
        "/listen" => Command::Listen,
        "/state" => Command::State,
        "/reset" => Command::Reset,
        "/tick" => Command::Tick,
        "/quit" | "quit" | "exit" => Command::Quit,
        "/help" => Command::Help,
        text => Command::Say(text),
    }
}

const HELP: &str = "Type what the robot says. Commands: /listen /state /reset /tick /help /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.json_logs);

    let mut config = SadbotConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    if let Some(policy) = args.policy {
        config.affect.policy = policy;
    }
    if let Some(provider) = args.provider {
        config.sentiment.provider = provider;
    }
    if let Some(ms) = args.tick_ms {
        config.session.tick_interval_ms = ms;
    }
    config.validate().context("invalid configuration")?;

    let source = sadbot_reasoning::build_source(&config.sentiment)
        .context("failed to build sentiment provider")?;
    let tracker = Arc::new(AffectTracker::new(&config.affect, source));

    let sim = SimOptions {
        load_latency: Duration::from_millis(args.load_latency_ms),
        ..SimOptions::default()
    };
    let mixer = Arc::new(VideoMixer::new(
        config.mixer.clone(),
        Arc::new(SimulatedPlayer::with_options("front", sim.clone())),
        Arc::new(SimulatedPlayer::with_options("back", sim)),
    ));

    let conductor = Arc::new(Conductor::new(tracker.clone(), mixer.clone()));
    conductor.start().await;
    let heartbeat =
        conductor.spawn_heartbeat(HeartbeatConfig::from_millis(config.session.tick_interval_ms));

    info!(
        "Sad Robot online: policy={:?}, provider={}",
        config.affect.policy, config.sentiment.provider
    );
    println!("{}", HELP);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Listen => {
                conductor.utterance_ended();
            }
            Command::Reset => {
                tracker.reset().await;
                println!("affect reset");
            }
            Command::Tick => {
                let changed = conductor.tick().await;
                println!("decay {}", if changed { "applied" } else { "skipped" });
            }
            Command::State => {
                let state = serde_json::json!({
                    "affect": tracker.snapshot().await,
                    "stage": mixer.snapshot(),
                    "at": chrono::Utc::now().to_rfc3339(),
                });
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            Command::Say(text) => {
                conductor.utterance_started(text);
                match conductor.on_robot_message(text).await {
                    Ok(Some(update)) => println!(
                        "affect {:.2} (target {:.2}, score {:+.2}) -> expression {}",
                        update.current_value,
                        update.target_value,
                        update.score,
                        update.expression_index
                    ),
                    Ok(None) => {}
                    Err(e) => {
                        error!("Scoring failed: {}", e);
                        println!("[sentiment error] {}", e);
                    }
                }
            }
        }
    }

    heartbeat.abort();
    mixer.settle().await;
    info!("Sad Robot offline");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_command("/listen"), Command::Listen));
        assert!(matches!(parse_command("  /state "), Command::State));
        assert!(matches!(parse_command("quit"), Command::Quit));
        assert!(matches!(parse_command("   "), Command::Empty));
        match parse_command(" I feel fine. ") {
            Command::Say(text) => assert_eq!(text, "I feel fine."),
            _ => panic!("expected Say"),
        }
    }
}

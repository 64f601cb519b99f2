use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use aura_engine::aura::{SubjectId, SubjectKind};
use aura_engine::config::EngineConfig;
use aura_engine::error::Result;
use aura_engine::pipeline::{MessagePipeline, OutboundMessage};
use aura_engine::store::{AuraStore, LibSqlBackend};
use aura_engine::tone::create_classifier;

/// Recipient used for direct messages typed at the prompt.
const REPL_RECIPIENT: &str = "peer";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env();
    config.validate()?;

    eprintln!("🎨 Aura Engine v{}", env!("CARGO_PKG_VERSION"));

    // ── Database ─────────────────────────────────────────────────────────
    let backend = LibSqlBackend::open(&config.db_path)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        });
    eprintln!("   Database: {}", config.db_path);

    let store =
        Arc::new(AuraStore::new(Arc::new(backend)).with_max_attempts(config.max_apply_attempts));

    // ── Classifier ───────────────────────────────────────────────────────
    let classifier = create_classifier(&config)?;
    eprintln!("   Classifier: {}", classifier.name());
    eprintln!("   Threshold: {:.2}", config.tone_threshold);

    let pipeline = MessagePipeline::new(classifier, store).with_threshold(config.tone_threshold);

    eprintln!("   Send with `alice> text` or `alice@group> text`.");
    eprintln!("   `/aura user:alice` shows an aura, /quit exits.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Some(Command::Quit) => break,
            Some(Command::Show(subject)) => match pipeline.store().current(&subject).await {
                Ok(state) => println!("{subject}: {state} {}", state.to_hex()),
                Err(e) => eprintln!("Error: {e}"),
            },
            Some(Command::Send(message)) => {
                let result = pipeline.handle(message).await;
                println!("tone: {}", result.tone);
                if let Some(err) = &result.classifier_error {
                    println!("  classifier: {err}");
                }
                if let Some(state) = result.new_sender_aura {
                    println!("  sender aura: {state} {}", state.to_hex());
                }
                if let Some(state) = result.new_group_aura {
                    println!("  group aura:  {state} {}", state.to_hex());
                }
                if result.is_partial_failure() {
                    println!("  delivery: {}", result.delivery.label());
                }
            }
            None if line.trim().is_empty() => {}
            None => eprintln!("Unrecognised input: {}", line.trim()),
        }
        eprint!("> ");
    }

    eprintln!("Goodbye.");
    Ok(())
}

#[derive(Debug)]
enum Command {
    Quit,
    Show(SubjectId),
    Send(OutboundMessage),
}

fn parse_line(line: &str) -> Option<Command> {
    let line = line.trim();
    if line == "/quit" {
        return Some(Command::Quit);
    }
    if let Some(rest) = line.strip_prefix("/aura ") {
        let (kind, id) = rest.trim().split_once(':')?;
        let kind = SubjectKind::parse(kind)?;
        return Some(Command::Show(SubjectId {
            kind,
            id: id.to_string(),
        }));
    }

    let (head, text) = line.split_once('>')?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let message = match head.trim().split_once('@') {
        Some((sender, group)) if !sender.is_empty() && !group.is_empty() => {
            OutboundMessage::group(sender, group, text)
        }
        Some(_) => return None,
        None if !head.trim().is_empty() => {
            OutboundMessage::direct(head.trim(), REPL_RECIPIENT, text)
        }
        None => return None,
    };
    Some(Command::Send(message))
}

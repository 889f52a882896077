//! `scriptdesk` -- line-oriented script editor with auto-save.
//!
//! Every line read from stdin is appended to the document. Lines starting
//! with `:` are commands:
//!
//! | Command          | Effect                                        |
//! |------------------|-----------------------------------------------|
//! | `:save`          | save now, bypassing the debounce              |
//! | `:versions`      | list versions, newest first                   |
//! | `:diff A B`      | line diff between versions `A` and `B`        |
//! | `:restore ID`    | load version `ID` into the draft              |
//! | `:status`        | print the save status as JSON                 |
//! | `:quit`          | flush unsaved changes and exit                |
//!
//! Ctrl-C flushes unsaved changes and exits as well; a second Ctrl-C during
//! the flush is ignored.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default         |
//! |-------------------------------|----------|-----------------|
//! | `DOCUMENT_PATH`               | yes      | --              |
//! | `HISTORY_DIR`                 | no       | `data/versions` |
//! | `DOCUMENT_TITLE`              | no       | file stem       |
//! | `DOCUMENT_AUTHOR`             | no       | `$USER`         |
//! | `AUTOSAVE_INTERVAL_MS`        | no       | `30000`         |
//! | `AUTOSAVE_DELAY_MS`           | no       | `1000`          |
//! | `AUTOSAVE_FLUSH_ON_DEACTIVATE`| no       | `true`          |
//! | `AUTOSAVE_FLUSH_ON_SHUTDOWN`  | no       | `true`          |

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptdesk_autosave::{SaveOutcome, SkipReason};
use scriptdesk_core::VersionId;
use scriptdesk_session::{DocumentSession, SessionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scriptdesk=info,scriptdesk_session=info,scriptdesk_autosave=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SessionConfig::from_env()?;
    tracing::info!(
        path = %config.document_path.display(),
        history_dir = %config.history_dir.display(),
        interval_ms = config.autosave.interval.as_millis() as u64,
        delay_ms = config.autosave.delay.as_millis() as u64,
        "Starting scriptdesk",
    );

    let session = DocumentSession::open(config)
        .await
        .context("failed to open document")?;
    session.activate();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = session.shutdown_complete() => {
                tracing::info!("Interrupted, exiting");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.strip_prefix(':') {
                    Some(command) => {
                        if !run_command(&session, command.trim()).await {
                            break;
                        }
                    }
                    None => session.edit(|draft| draft.push_line(&line)),
                }
            }
        }
    }

    session.close().await;
    Ok(())
}

/// Execute one `:` command. Returns `false` when the editor should exit.
async fn run_command(session: &DocumentSession, command: &str) -> bool {
    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("quit" | "q"), None, None) => return false,
        (Some("save"), None, None) => match session.save_now().await {
            Ok(SaveOutcome::Saved) => println!("saved"),
            Ok(SaveOutcome::Skipped(SkipReason::NoChanges)) => println!("nothing to save"),
            Ok(SaveOutcome::Skipped(SkipReason::InFlight)) => println!("save already running"),
            Err(e) => eprintln!("save failed: {e}"),
        },
        (Some("versions"), None, None) => print_versions(session),
        (Some("diff"), Some(from), Some(to)) => match (parse_id(from), parse_id(to)) {
            (Some(from), Some(to)) => print_diff(session, from, to),
            _ => eprintln!("usage: :diff <from-id> <to-id>"),
        },
        (Some("restore"), Some(id), None) => match parse_id(id) {
            Some(id) => match session.restore(id) {
                Ok(version) => println!("restored version {} (#{})", version.id, version.number),
                Err(e) => eprintln!("{e}"),
            },
            None => eprintln!("usage: :restore <id>"),
        },
        (Some("status"), None, None) => match serde_json::to_string_pretty(&session.status()) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to render status: {e}"),
        },
        _ => eprintln!("unknown command: :{command}"),
    }
    true
}

fn parse_id(raw: &str) -> Option<VersionId> {
    raw.parse().ok()
}

fn print_versions(session: &DocumentSession) {
    let versions = session.versions();
    if versions.is_empty() {
        println!("no versions yet");
        return;
    }
    let current = session.current_version().map(|v| v.id);
    for version in versions {
        let marker = if Some(version.id) == current { '*' } else { ' ' };
        let local = version.timestamp.with_timezone(&chrono::Local);
        println!(
            "{marker} {id}  #{number:<4} {time}  {author:<12} {title} ({changes} changes)",
            id = version.id,
            number = version.number,
            time = local.format("%Y-%m-%d %H:%M:%S"),
            author = version.author,
            title = version.title,
            changes = version.changes.len(),
        );
    }
}

fn print_diff(session: &DocumentSession, from: VersionId, to: VersionId) {
    let Some(diff) = session.compare(from, to) else {
        eprintln!("unknown version id");
        return;
    };
    for change in &diff.changes {
        println!("{:>4} {:<6} {}", change.line, change.kind, change.content);
    }

    if let Some(aligned) = session.compare_aligned(from, to) {
        println!();
        print!("{}", aligned.to_patch());
        println!(
            "{} added, {} removed, {} unchanged",
            aligned.stats.added, aligned.stats.removed, aligned.stats.unchanged
        );
    }
}

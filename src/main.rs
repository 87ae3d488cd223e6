//! Headless host for the carousel: loads the configuration, runs the slide
//! engine and reads navigation/gesture commands from stdin.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser};
use humantime::parse_rfc3339;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use photo_carousel::clock::Clock;
use photo_carousel::config;
use photo_carousel::events::Command;
use photo_carousel::logging;
use photo_carousel::render::Frame;
use photo_carousel::sources::Fetcher;
use photo_carousel::tasks::{loader, runtime};

#[derive(Debug, Parser)]
#[command(
    name = "photo-carousel",
    version,
    about = "Rotating photo carousel driven from the terminal"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Freeze "now" at this RFC 3339 instant for timestamp fallbacks and age filtering
    #[arg(long = "now", value_name = "RFC3339")]
    now: Option<String>,
    /// Print the built slide sequence and exit
    #[arg(long = "dry-run")]
    dry_run: bool,
    /// Emit frames as JSON lines on stdout
    #[arg(long)]
    json: bool,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = try_main().await {
        error!(error = ?err, "photo-carousel exited with error");
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let cfg = config::load(&args.config)?;
    let clock = match &args.now {
        Some(ts) => {
            let frozen: DateTime<Utc> = parse_rfc3339(ts)
                .context("failed to parse --now")?
                .into();
            Clock::frozen(cfg.calendar_zone(), frozen)
        }
        None => cfg.clock(),
    };
    info!(
        config = %args.config.display(),
        zone = %clock.zone(),
        "configuration loaded"
    );

    let fetcher =
        Fetcher::with_timeout(cfg.fetch_timeout()).context("failed to set up photo fetching")?;
    let initial = loader::load_sequence(&cfg, &fetcher, &clock)
        .await
        .context("failed to load photos")?;

    if args.dry_run {
        println!("# slides: {}", initial.len());
        for (idx, photo) in initial.iter().enumerate() {
            println!(
                "  {:>3}: {} {} {:?}",
                idx,
                photo.timestamp.to_rfc3339(),
                photo.img,
                photo.desc
            );
        }
        return Ok(());
    }

    let (command_tx, command_rx) = mpsc::channel::<Command>(16); // stdin -> runtime
    let (frame_tx, mut frame_rx) = mpsc::channel::<Frame>(16); // runtime -> output
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    {
        let cancel = cancel.clone();
        let interactive = std::io::stdin().is_terminal();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match line.parse::<Command>() {
                        Ok(command) => {
                            if command_tx.send(command).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(input = line.trim(), "ignoring command: {err:#}"),
                    },
                    Ok(None) => {
                        info!("stdin closed");
                        if interactive {
                            cancel.cancel();
                        }
                        break;
                    }
                    Err(err) => {
                        warn!("stdin reader failed: {err}");
                        break;
                    }
                }
            }
        });
    }

    let json = args.json;
    let printer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if json {
                match serde_json::to_string(&frame) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!("failed to encode frame: {err}"),
                }
            } else {
                log_frame(&frame);
            }
        }
    });

    runtime::run(cfg, clock, initial, fetcher, command_rx, frame_tx, cancel)
        .await
        .context("carousel runtime failed")?;
    join_printer(printer).await;
    Ok(())
}

/// Wait for the frame printer; a panic in it is logged rather than dropped.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "frame printer task failed");
            false
        }
    }
}

fn log_frame(frame: &Frame) {
    let Some(track) = &frame.track else {
        info!(
            notice = frame.notice.as_deref().unwrap_or_default(),
            "no photos to show"
        );
        return;
    };
    let slide = frame.visible_slide();
    info!(
        current = track.current,
        slides = frame.slides.len(),
        transform = %track.transform(),
        img = slide.map(|s| s.img.as_str()),
        timestamp = slide.and_then(|s| s.timestamp.as_ref()).map(|t| t.text.as_str()),
        description = slide.and_then(|s| s.description.as_ref()).map(|t| t.text.as_str()),
        "frame"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn printer_panic_is_reported() {
        let failed: JoinHandle<()> = tokio::spawn(async { panic!("printer blew up") });
        assert!(!join_printer(failed).await);
        assert!(join_printer(tokio::spawn(async {})).await);
    }
}

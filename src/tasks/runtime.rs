//! Event loop hosting one carousel: autoplay, scheduled reloads and host commands.

use std::future::pending;
use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::builder::SlideSequence;
use crate::carousel::Carousel;
use crate::clock::Clock;
use crate::config::Configuration;
use crate::error::Error;
use crate::events::Command;
use crate::render::Frame;
use crate::sources::Fetcher;
use crate::tasks::loader::load_sequence;

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => pending().await,
    }
}

fn next_reload(every: Option<Duration>) -> Option<Instant> {
    every.and_then(|every| Instant::now().checked_add(every))
}

fn spawn_load(
    loads: &mut JoinSet<Result<SlideSequence, Error>>,
    cfg: &Configuration,
    fetcher: &Fetcher,
    clock: Clock,
) {
    let cfg = cfg.clone();
    let fetcher = fetcher.clone();
    loads.spawn(async move { load_sequence(&cfg, &fetcher, &clock).await });
}

/// Drive the carousel until cancelled or told to shut down.
///
/// Rules:
/// - `initial` is shown immediately; every state change emits a [`Frame`].
/// - Autoplay ticks, commands and load completions are handled one at a time.
/// - A reload keeps the current sequence visible until the new one is built;
///   a failed reload is logged and the next scheduled reload still runs.
/// - The reload timer is re-armed as soon as a reload starts. A load still
///   pending when the next one is due is aborted and replaced, so a stalled
///   source never holds up the schedule.
pub async fn run(
    cfg: Configuration,
    clock: Clock,
    initial: SlideSequence,
    fetcher: Fetcher,
    mut commands: Receiver<Command>,
    frames: Sender<Frame>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut carousel = Carousel::new(&cfg, clock);
    carousel.set_sequence(initial, std::time::Instant::now());

    let reload_every: Option<Duration> = cfg.reload_interval();
    match reload_every {
        Some(every) => info!(every = %humantime::format_duration(every), "reload interval started"),
        None => debug!("reload interval not configured"),
    }
    let mut reload_at = next_reload(reload_every);
    let mut loads: JoinSet<Result<SlideSequence, Error>> = JoinSet::new();
    let mut commands_open = true;

    if frames.send(carousel.frame()).await.is_err() {
        warn!("frame consumer closed before start");
        return Ok(());
    }

    loop {
        let autoplay_at = carousel.autoplay_deadline().map(Instant::from_std);
        let mut changed = false;

        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; stopping carousel");
                break;
            }

            _ = sleep_until_opt(autoplay_at) => {
                changed = carousel.tick(std::time::Instant::now()).is_some();
            }

            _ = sleep_until_opt(reload_at) => {
                reload_at = next_reload(reload_every);
                if !loads.is_empty() {
                    warn!("previous reload still pending; abandoning it");
                    loads.abort_all();
                }
                info!("reloading photo sources");
                spawn_load(&mut loads, &cfg, &fetcher, clock);
            }

            Some(joined) = loads.join_next(), if !loads.is_empty() => {
                match joined {
                    Ok(Ok(sequence)) => {
                        carousel.set_sequence(sequence, std::time::Instant::now());
                        changed = true;
                    }
                    Ok(Err(err)) => error!(error = %err, "reload failed; keeping current photos"),
                    Err(err) if err.is_cancelled() => debug!("abandoned reload cancelled"),
                    Err(err) => error!(error = %err, "reload task failed"),
                }
            }

            maybe_cmd = commands.recv(), if commands_open => match maybe_cmd {
                Some(Command::Shutdown) => {
                    info!("shutdown requested");
                    break;
                }
                Some(Command::Reload) => {
                    if loads.is_empty() {
                        info!("manual reload requested");
                        reload_at = next_reload(reload_every);
                        spawn_load(&mut loads, &cfg, &fetcher, clock);
                    } else {
                        debug!("reload already in flight");
                    }
                }
                Some(command) => {
                    debug!(?command, "command received");
                    changed = carousel.apply(&command, std::time::Instant::now());
                }
                None => {
                    debug!("command channel closed");
                    commands_open = false;
                }
            },
        }

        if changed && frames.send(carousel.frame()).await.is_err() {
            warn!("frame consumer closed");
            break;
        }
    }

    loads.abort_all();
    carousel.teardown();
    info!("carousel stopped");
    Ok(())
}

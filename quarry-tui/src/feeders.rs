use crate::tui::{TuiActor, TuiMsg};
use quarry_actors::actor::Addr;
use quarry_actors::system::ShutdownHandle;
use quarry_research::Progress;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time;

/// Keyboard input and the redraw tick. Both stop on shutdown.
pub fn spawn_tui_feeders(tui: Addr<TuiActor>, shutdown: ShutdownHandle) {
    let tui_in = tui.clone();
    let mut shutdown_input = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_input.recv() => break,
                // TODO: move to one dedicated reader thread instead of a spawn_blocking per event.
                ev = tokio::task::spawn_blocking(crossterm::event::read) => {
                    match ev {
                        Ok(Ok(e)) => {
                            if tui_in.send(TuiMsg::InputEvent(e)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Err(e)) => {
                            let _ = tui_in.send(TuiMsg::OpError(format!("input: {e}"))).await;
                        }
                        Err(_) => break,
                    }
                }
            }
        }
    });

    let tui_tick = tui;
    let mut shutdown_tick = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_millis(80));
        loop {
            tokio::select! {
                _ = shutdown_tick.recv() => break,
                _ = interval.tick() => {
                    // Dropped ticks are fine; the next one redraws.
                    let _ = tui_tick.try_send(TuiMsg::Tick);
                }
            }
        }
    });
}

/// Forward pipeline progress from the research actor into the transcript.
pub fn spawn_progress_feeder(
    tui: Addr<TuiActor>,
    mut progress: UnboundedReceiver<Progress>,
    shutdown: ShutdownHandle,
) {
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                event = progress.recv() => {
                    let Some(event) = event else { break };
                    if tui.send(TuiMsg::Progress(event)).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

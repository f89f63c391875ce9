use std::error::Error;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::info;

use crate::core::pipeline::PipelineEvent;
use crate::core::session::SessionBootstrap;
use crate::ui::chat_loop::controller::{ChatController, LoopControl, TurnResult};
use crate::ui::chat_loop::keybindings::map_key;
use crate::ui::chat_loop::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use crate::ui::renderer;

const IDLE_REDRAW: Duration = Duration::from_millis(250);

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat(session: SessionBootstrap) -> Result<(), Box<dyn Error>> {
    let (pipeline_tx, mut pipeline_rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<TurnResult>();
    let mut controller = ChatController::new(session, pipeline_tx, done_tx);

    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let event_reader_handle = spawn_event_reader(event_tx);

    let result = main_loop(
        &mut terminal,
        &mut controller,
        &mut event_rx,
        &mut pipeline_rx,
        &mut done_rx,
    )
    .await;

    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;
    info!("Chat session ended");
    result
}

async fn main_loop(
    terminal: &mut ChatTerminal,
    controller: &mut ChatController,
    event_rx: &mut mpsc::UnboundedReceiver<Event>,
    pipeline_rx: &mut mpsc::UnboundedReceiver<PipelineEvent>,
    done_rx: &mut mpsc::UnboundedReceiver<TurnResult>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| renderer::ui(f, &controller.render_model()))?;

        // Pipeline events first so a finished turn never overtakes its own
        // last display update.
        tokio::select! {
            biased;
            Some(event) = pipeline_rx.recv() => controller.apply_pipeline_event(event),
            Some(result) = done_rx.recv() => controller.finish_turn(result),
            Some(event) = event_rx.recv() => {
                if let Event::Key(key) = event {
                    if let Some(action) = map_key(key) {
                        if controller.apply(action) == LoopControl::Quit {
                            controller.shutdown(done_rx).await;
                            return Ok(());
                        }
                    }
                }
            }
            _ = tokio::time::sleep(IDLE_REDRAW) => {}
        }
    }
}

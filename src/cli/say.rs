//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::pipeline::PipelineEvent;
use crate::core::session::SessionBootstrap;

/// Sends one prompt and streams the reply to stdout.
pub async fn run_say(prompt: Vec<String>, session: SessionBootstrap) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: ollama-chat say <prompt>".into());
    }

    let SessionBootstrap {
        registry,
        pipeline,
        mut state,
        transcript,
        ..
    } = session;

    if !registry.is_connected() {
        let reason = registry.last_error().unwrap_or("no models installed");
        return Err(format!("Cannot reach a usable Ollama server: {reason}").into());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let pipeline = pipeline.with_events(tx);

    let printer = tokio::spawn(async move {
        let mut printed = 0;
        let mut stdout = io::stdout();
        while let Some(event) = rx.recv().await {
            if let PipelineEvent::Display(text) = event {
                let _ = write!(stdout, "{}", &text[printed..]);
                let _ = stdout.flush();
                printed = text.len();
            }
        }
        if printed > 0 {
            let _ = writeln!(stdout);
        }
    });

    let result = pipeline
        .submit(&mut state, &prompt, &CancellationToken::new())
        .await;
    drop(pipeline);
    printer.await?;

    if !matches!(result, Err(ref err) if err.left_store_untouched()) {
        transcript.log_messages(state.store.active_transcript())?;
    }

    result.map(|_| ()).map_err(Into::into)
}

use std::io;
use std::sync::Arc;

use sarvam_kernel_config::{load_local_model_config, ConfigError, LocalModelConfig};
use sarvam_kernel_core::{ChatEngine, KernelConfig, KernelRuntime};
use sarvam_kernel_model::CompletionsChatEngine;
use sarvam_kernel_protocol::{EventMsg, Op, Submission};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> io::Result<()> {
    // stdout carries the event stream, so logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();

    let chat_engine = chat_engine_from_config(load_local_model_config())?;

    let mut runtime = KernelRuntime::spawn_with_engine(KernelConfig::default(), chat_engine);
    let submission_tx = runtime.submission_sender();

    let stdin_task = tokio::spawn(forward_submissions(
        BufReader::new(tokio::io::stdin()),
        submission_tx,
    ));

    let mut stdout = tokio::io::stdout();
    while let Some(event) = runtime.events_mut().recv().await {
        let line = serde_json::to_string(&event)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;

        if matches!(event.msg, EventMsg::ShutdownComplete) {
            break;
        }
    }

    stdin_task.abort();

    runtime.join().await.map_err(io::Error::other)?;

    Ok(())
}

/// An invalid configuration stops the bridge instead of serving a stand-in engine.
fn chat_engine_from_config(
    config: Result<LocalModelConfig, ConfigError>,
) -> io::Result<Arc<dyn ChatEngine>> {
    match config {
        Ok(model_config) => {
            info!(
                base_url = %model_config.base_url,
                model = %model_config.model,
                thinking_enabled = model_config.thinking_enabled,
                "using completions chat engine"
            );
            Ok(Arc::new(CompletionsChatEngine::new(model_config)))
        }
        Err(err) => {
            error!(%err, "invalid model configuration");
            Err(io::Error::other(err))
        }
    }
}

/// Feeds JSONL submissions to the runtime. End of input asks the runtime to
/// shut down, since the runtime keeps its own sender alive.
async fn forward_submissions<R>(
    reader: R,
    submission_tx: mpsc::Sender<Submission>,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let submission = match serde_json::from_str::<Submission>(&line) {
            Ok(item) => item,
            Err(err) => {
                warn!(%err, "invalid submission json");
                continue;
            }
        };

        if submission_tx.send(submission).await.is_err() {
            return Ok(());
        }
    }

    info!("input closed, shutting down");
    let _ = submission_tx
        .send(Submission {
            id: "eof".to_string(),
            op: Op::Shutdown,
        })
        .await;
    Ok(())
}

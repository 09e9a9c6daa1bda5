use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sarvam_kernel_protocol::{
    AssistantReply, ErrorEvent, Event, EventMsg, Op, Role, SessionConfiguredEvent, Submission,
    TaskStartedEvent, TokenUsage, Turn, TurnAbortReason, TurnAbortedEvent, TurnCompleteEvent,
    UserTurnOptions,
};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

mod store;

pub use store::{ConversationStore, StoreError};

#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub session_id: String,
    pub channel_capacity: usize,
    pub system_prompt: Option<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            session_id: "sarvam-kernel".to_string(),
            channel_capacity: 128,
            system_prompt: None,
        }
    }
}

/// Produces the assistant reply for a history that ends on a user turn.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    async fn reply(
        &self,
        turns: &[Turn],
        options: &UserTurnOptions,
    ) -> Result<AssistantReply, String>;
}

pub struct EchoChatEngine;

#[async_trait]
impl ChatEngine for EchoChatEngine {
    async fn reply(
        &self,
        turns: &[Turn],
        _options: &UserTurnOptions,
    ) -> Result<AssistantReply, String> {
        let last = turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.clone())
            .unwrap_or_default();
        Ok(AssistantReply {
            visible: last,
            reasoning: String::new(),
            usage: TokenUsage::default(),
            finish_reason: None,
        })
    }
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("failed to send submission: runtime channel closed")]
    SubmissionChannelClosed,
    #[error("kernel join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct KernelRuntime {
    submission_tx: mpsc::Sender<Submission>,
    event_rx: mpsc::Receiver<Event>,
    loop_handle: JoinHandle<()>,
}

struct RunningTask {
    sub_id: String,
    handle: JoinHandle<()>,
    /// Set once the task has updated the store and is about to emit its
    /// final event.
    finished: Arc<AtomicBool>,
}

impl RunningTask {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire) || self.handle.is_finished()
    }
}

impl KernelRuntime {
    pub fn spawn(config: KernelConfig) -> Self {
        Self::spawn_with_engine(config, Arc::new(EchoChatEngine))
    }

    pub fn spawn_with_engine(config: KernelConfig, chat_engine: Arc<dyn ChatEngine>) -> Self {
        let (submission_tx, submission_rx) = mpsc::channel(config.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);

        let loop_handle = tokio::spawn(submission_loop(
            config,
            submission_rx,
            event_tx,
            chat_engine,
        ));

        Self {
            submission_tx,
            event_rx,
            loop_handle,
        }
    }

    pub async fn submit(&self, submission: Submission) -> Result<(), KernelError> {
        self.submission_tx
            .send(submission)
            .await
            .map_err(|_| KernelError::SubmissionChannelClosed)
    }

    pub fn submission_sender(&self) -> mpsc::Sender<Submission> {
        self.submission_tx.clone()
    }

    pub fn events_mut(&mut self) -> &mut mpsc::Receiver<Event> {
        &mut self.event_rx
    }

    pub async fn join(self) -> Result<(), KernelError> {
        self.loop_handle.await?;
        Ok(())
    }
}

async fn submission_loop(
    config: KernelConfig,
    mut submission_rx: mpsc::Receiver<Submission>,
    event_tx: mpsc::Sender<Event>,
    chat_engine: Arc<dyn ChatEngine>,
) {
    info!(session_id = %config.session_id, "session configured");
    let _ = send_event(
        &event_tx,
        "session",
        EventMsg::SessionConfigured(SessionConfiguredEvent {
            session_id: config.session_id.clone(),
        }),
    )
    .await;

    let store = Arc::new(Mutex::new(ConversationStore::new(
        config.system_prompt.clone(),
    )));
    let mut running_task: Option<RunningTask> = None;

    while let Some(submission) = submission_rx.recv().await {
        if running_task
            .as_ref()
            .is_some_and(RunningTask::is_finished)
        {
            running_task = None;
        }

        match submission.op {
            Op::UserTurn { text, options } => {
                if let Some(task) = running_task.as_ref() {
                    warn!(
                        running = %task.sub_id,
                        rejected = %submission.id,
                        "turn already in progress"
                    );
                    let _ = send_error(
                        &event_tx,
                        &submission.id,
                        format!("turn {} is still in progress", task.sub_id),
                    )
                    .await;
                    continue;
                }

                running_task = Some(spawn_task(
                    submission.id,
                    text,
                    options,
                    Arc::clone(&store),
                    event_tx.clone(),
                    Arc::clone(&chat_engine),
                ));
            }
            Op::Reset { system_prompt } => {
                if let Some(task) = running_task.as_ref() {
                    let _ = send_error(
                        &event_tx,
                        &submission.id,
                        format!("cannot reset while turn {} is in progress", task.sub_id),
                    )
                    .await;
                    continue;
                }

                let system_prompt = system_prompt.or_else(|| config.system_prompt.clone());
                store.lock().await.reset(system_prompt);
                info!("conversation history reset");
                let _ = send_event(&event_tx, &submission.id, EventMsg::HistoryReset).await;
            }
            Op::Interrupt => {
                if let Some(task) = running_task.take() {
                    let sub_id = abort_task(task, &store).await;
                    let _ = send_event(
                        &event_tx,
                        &sub_id,
                        EventMsg::TurnAborted(TurnAbortedEvent {
                            reason: TurnAbortReason::UserInterrupt,
                        }),
                    )
                    .await;
                }
            }
            Op::Shutdown => {
                if let Some(task) = running_task.take() {
                    let sub_id = abort_task(task, &store).await;
                    let _ = send_event(
                        &event_tx,
                        &sub_id,
                        EventMsg::TurnAborted(TurnAbortedEvent {
                            reason: TurnAbortReason::Shutdown,
                        }),
                    )
                    .await;
                }

                let _ = send_event(&event_tx, &submission.id, EventMsg::ShutdownComplete).await;
                break;
            }
        }
    }
}

/// Cancels the task and drops its user turn if no reply was recorded.
/// Returns the submission id the task was started for.
async fn abort_task(task: RunningTask, store: &Mutex<ConversationStore>) -> String {
    task.handle.abort();
    let _ = task.handle.await;
    if store.lock().await.discard_pending_user().is_some() {
        debug!(sub_id = %task.sub_id, "rolled back unanswered user turn");
    }
    task.sub_id
}

fn spawn_task(
    sub_id: String,
    text: String,
    options: UserTurnOptions,
    store: Arc<Mutex<ConversationStore>>,
    event_tx: mpsc::Sender<Event>,
    chat_engine: Arc<dyn ChatEngine>,
) -> RunningTask {
    let task_sub_id = sub_id.clone();

    let finished = Arc::new(AtomicBool::new(false));
    let task_finished = Arc::clone(&finished);

    let handle = tokio::spawn(async move {
        let (turns, turn_index) = {
            let mut store = store.lock().await;
            if let Err(error) = store.push_user(text) {
                task_finished.store(true, Ordering::Release);
                let _ = send_error(&event_tx, &task_sub_id, error.to_string()).await;
                return;
            }
            (store.turns().to_vec(), store.exchange_count() as u64)
        };

        let _ = send_event(
            &event_tx,
            &task_sub_id,
            EventMsg::TaskStarted(TaskStartedEvent { turn_index }),
        )
        .await;

        let final_msg = match chat_engine.reply(&turns, &options).await {
            Ok(reply) => match store.lock().await.append_assistant(&reply) {
                Ok(()) => {
                    debug!(
                        sub_id = %task_sub_id,
                        turn_index,
                        input_tokens = reply.usage.input_tokens,
                        output_tokens = reply.usage.output_tokens,
                        "turn complete"
                    );
                    EventMsg::TurnComplete(TurnCompleteEvent::from(&reply))
                }
                Err(error) => EventMsg::Error(ErrorEvent {
                    message: error.to_string(),
                }),
            },
            Err(error) => {
                store.lock().await.discard_pending_user();
                warn!(sub_id = %task_sub_id, %error, "turn failed");
                EventMsg::Error(ErrorEvent {
                    message: format!("reply failed: {error}"),
                })
            }
        };

        // The store is settled; a follow-up turn may start once the caller
        // observes the final event.
        task_finished.store(true, Ordering::Release);
        let _ = send_event(&event_tx, &task_sub_id, final_msg).await;
    });

    RunningTask {
        sub_id,
        handle,
        finished,
    }
}

async fn send_error(
    event_tx: &mpsc::Sender<Event>,
    id: &str,
    message: String,
) -> Result<(), mpsc::error::SendError<Event>> {
    send_event(event_tx, id, EventMsg::Error(ErrorEvent { message })).await
}

async fn send_event(
    event_tx: &mpsc::Sender<Event>,
    id: &str,
    msg: EventMsg,
) -> Result<(), mpsc::error::SendError<Event>> {
    event_tx
        .send(Event {
            id: id.to_string(),
            msg,
        })
        .await
}

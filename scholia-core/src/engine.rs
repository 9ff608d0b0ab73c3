//! The streaming session controller.
//!
//! `ChatEngine` owns the transcript and source map, and runs every network
//! exchange on a single processor task fed by a command channel. The UI
//! drains an event channel and reads the shared state at render time, so the
//! transcript and source map are only ever mutated from one place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use client::{ChatClient, ChatRequest, IngestClient};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::{Session, SourceMap};

enum EngineCommand {
    Submit(String),
    Ingest(String),
    Reset,
}

#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// A piece of reply text was applied to the transcript tail.
    Chunk(String),
    /// Citation metadata for the finished turn was recorded.
    SourcesRecorded { turn_key: String },
    /// The turn is over, successfully or not; the engine accepts submissions
    /// again.
    TurnComplete,
    IngestComplete,
    SessionCleared,
    Error(String),
}

pub struct ChatEngine {
    session: Arc<Mutex<Session>>,
    sources: Arc<Mutex<SourceMap>>,
    busy: Arc<AtomicBool>,
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
    #[allow(dead_code)]
    processor_handle: JoinHandle<()>,
}

impl ChatEngine {
    pub fn new(chat: ChatClient, ingest: IngestClient) -> Self {
        let session = Arc::new(Mutex::new(Session::new()));
        let sources = Arc::new(Mutex::new(SourceMap::new()));
        let busy = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let processor_handle = tokio::spawn(Self::processor_loop(
            Arc::clone(&session),
            Arc::clone(&sources),
            Arc::clone(&busy),
            chat,
            ingest,
            cmd_rx,
            event_tx,
        ));

        Self {
            session,
            sources,
            busy,
            cmd_tx,
            event_rx,
            processor_handle,
        }
    }

    /// Submit a user message. Silently ignored when the input is blank or
    /// another exchange is in flight; the busy flag is the sole concurrency
    /// guard in the system.
    pub fn submit(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.cmd_tx.send(EngineCommand::Submit(text));
    }

    /// Submit document text for server-side ingestion. Shares the single
    /// in-flight-exchange guard with chat turns.
    pub fn ingest(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.cmd_tx.send(EngineCommand::Ingest(text));
    }

    /// Discard the transcript and recorded sources.
    pub fn reset(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Reset);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// The upload entry point is available only before the conversation has
    /// started (one document per session).
    pub fn ingest_available(&self) -> bool {
        self.session
            .try_lock()
            .map(|s| s.is_empty())
            .unwrap_or(false)
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    pub fn sources(&self) -> Arc<Mutex<SourceMap>> {
        Arc::clone(&self.sources)
    }

    async fn processor_loop(
        session: Arc<Mutex<Session>>,
        sources: Arc<Mutex<SourceMap>>,
        busy: Arc<AtomicBool>,
        chat: ChatClient,
        ingest: IngestClient,
        mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
        event_tx: mpsc::UnboundedSender<EngineEvent>,
    ) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                EngineCommand::Submit(text) => {
                    Self::run_turn(&session, &sources, &chat, &text, &event_tx).await;
                    busy.store(false, Ordering::SeqCst);
                    let _ = event_tx.send(EngineEvent::TurnComplete);
                }
                EngineCommand::Ingest(text) => {
                    let result = ingest.ingest(&text).await;
                    busy.store(false, Ordering::SeqCst);
                    match result {
                        Ok(()) => {
                            let _ = event_tx.send(EngineEvent::IngestComplete);
                        }
                        Err(e) => {
                            tracing::error!("ingestion failed: {:#}", e);
                            let _ = event_tx.send(EngineEvent::Error(e.to_string()));
                        }
                    }
                }
                EngineCommand::Reset => {
                    session.lock().await.clear();
                    sources.lock().await.clear();
                    let _ = event_tx.send(EngineEvent::SessionCleared);
                }
            }
        }
    }

    async fn run_turn(
        session: &Arc<Mutex<Session>>,
        sources: &Arc<Mutex<SourceMap>>,
        chat: &ChatClient,
        text: &str,
        event_tx: &mpsc::UnboundedSender<EngineEvent>,
    ) {
        // The user message joins the transcript first; the request carries
        // the full conversation as context.
        let request = {
            let mut sess = session.lock().await;
            sess.push_user(text);
            ChatRequest {
                messages: sess.wire_messages(),
            }
        };

        let mut response = match chat.stream_chat(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("chat request failed: {:#}", e);
                let _ = event_tx.send(EngineEvent::Error(e.to_string()));
                return;
            }
        };

        // The reply stream is open: the assistant message exists from here
        // on and grows chunk by chunk.
        session.lock().await.begin_assistant();

        while let Some(chunk) = response.next_chunk().await {
            match chunk {
                Ok(chunk) => {
                    session.lock().await.append_to_tail(&chunk);
                    let _ = event_tx.send(EngineEvent::Chunk(chunk));
                }
                Err(e) => {
                    // Partial content stays in the transcript; the turn just
                    // ends early.
                    tracing::error!("chat stream failed mid-reply: {:#}", e);
                    let _ = event_tx.send(EngineEvent::Error(e.to_string()));
                    return;
                }
            }
        }

        if let Some((turn_key, docs)) = response.metadata().sources_for_turn() {
            sources.lock().await.record(turn_key.clone(), docs);
            let _ = event_tx.send(EngineEvent::SourcesRecorded { turn_key });
        }
    }
}

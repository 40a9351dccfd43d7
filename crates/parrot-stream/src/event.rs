use {
    crate::{SpeakError, SynthesisError},
    futures_core::Stream,
    std::{
        pin::Pin,
        sync::{Arc, Mutex},
        task::{Context, Poll},
        time::Duration,
    },
    tokio::sync::mpsc as tokio_mpsc,
};

/// Per-chunk record of what the engine produced and how long it took.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkSummary {
    /// Position among the non-empty chunks of the session.
    pub index: usize,
    /// Text of the fragment that produced the chunk, empty for a flush.
    pub text: String,
    pub samples: usize,
    pub audio: Duration,
    pub processing: Duration,
}

/// Progress reported by the synthesis worker.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeakerEvent {
    /// The engine refused a fragment; its audio is skipped.
    FragmentRejected { text: String, error: SynthesisError },
    /// First audio of the session, released after `delay`.
    FirstAudio { samples: usize, delay: Duration },
    Chunk(ChunkSummary),
    /// The session hit a fatal engine error.
    Failed(SpeakError),
    /// The utterance was flushed and drained.
    SessionFinished { chunks: usize, samples: usize },
}

/// Fan-out of speaker events to every live listener.
#[derive(Clone, Default)]
pub(crate) struct EventBus {
    senders: Arc<Mutex<Vec<tokio_mpsc::UnboundedSender<SpeakerEvent>>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> SpeakerListener {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        SpeakerListener { rx }
    }

    pub fn emit(&self, event: SpeakerEvent) {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Receives [`SpeakerEvent`]s, either with `recv` or as a `Stream`.
pub struct SpeakerListener {
    rx: tokio_mpsc::UnboundedReceiver<SpeakerEvent>,
}

impl SpeakerListener {
    /// Next event, `None` once the speaker is gone and the queue is empty.
    pub async fn recv(&mut self) -> Option<SpeakerEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SpeakerEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for SpeakerListener {
    type Item = SpeakerEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

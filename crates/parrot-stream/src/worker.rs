use {
    crate::{
        ChunkSummary, Command, DelayConfig, DelayInputs, FragmentReceiver, FragmentSender,
        PlatformConfig, SessionClock, SpeakError, SpeakerEvent, SynthesisStream, TextFragment,
        event::EventBus, fragment_queue,
    },
    parrot_audio::PcmSink,
    parrot_base::PcmChunk,
    std::{
        sync::{Arc, Mutex},
        thread::JoinHandle,
        time::Instant,
    },
};

/// Everything a worker needs besides the stream and the sink.
#[derive(Clone)]
pub(crate) struct WorkerSettings {
    pub sample_rate: usize,
    pub delay: DelayConfig,
    pub platform: PlatformConfig,
    pub clock: SessionClock,
    pub events: EventBus,
}

/// Counters kept by one lease.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct LeaseStats {
    /// Fragments handed to the engine, flushes included.
    pub fragments: u64,
    pub rejected: u64,
    /// Non-empty chunks forwarded to the sink.
    pub chunks: usize,
    pub samples: usize,
}

/// What a finished worker hands back.
pub(crate) struct WorkerOutcome {
    pub stream: Box<dyn SynthesisStream>,
    pub sink: Box<dyn PcmSink>,
    pub stats: LeaseStats,
    pub error: Option<SpeakError>,
}

/// Session-scoped ownership of a synthesis worker thread.
///
/// The stream and the sink move into the thread for the lifetime of the
/// lease and come back from [`finish`](WorkerLease::finish). Counters start
/// from zero for every lease.
pub(crate) struct WorkerLease {
    sender: FragmentSender,
    failure: Arc<Mutex<Option<SpeakError>>>,
    handle: Option<JoinHandle<WorkerOutcome>>,
}

impl WorkerLease {
    pub fn acquire(
        stream: Box<dyn SynthesisStream>,
        sink: Box<dyn PcmSink>,
        settings: WorkerSettings,
    ) -> Self {
        let (sender, receiver) = fragment_queue();
        let failure = Arc::new(Mutex::new(None));
        let worker = Worker {
            receiver,
            stream,
            sink,
            settings,
            failure: Arc::clone(&failure),
            stats: LeaseStats::default(),
            first_call: None,
            first_audio_sent: false,
            held: Vec::new(),
            holding: true,
            fatal: None,
        };
        let handle = std::thread::spawn(move || worker.run());
        log::debug!("Synthesis worker lease acquired");
        Self {
            sender,
            failure,
            handle: Some(handle),
        }
    }

    /// Queue a fragment. The queue only closes early when the worker
    /// thread has died.
    pub fn push(&self, fragment: TextFragment) -> Result<(), SpeakError> {
        self.sender.try_push(fragment).map_err(|fragment| {
            log::error!(
                "Synthesis worker is gone, dropping fragment {:?}",
                fragment.as_str()
            );
            SpeakError::WorkerPanicked
        })
    }

    /// Whether the worker thread exited without being asked to.
    pub fn is_dead(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_finished())
    }

    /// Fatal error reported by the worker, if any.
    pub fn failure(&self) -> Option<SpeakError> {
        self.failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Shut the worker down after everything queued so far and take back
    /// the stream and the sink.
    pub fn finish(mut self) -> Result<WorkerOutcome, SpeakError> {
        self.join().ok_or(SpeakError::WorkerPanicked)
    }

    fn join(&mut self) -> Option<WorkerOutcome> {
        let handle = self.handle.take()?;
        self.sender.shutdown();
        match handle.join() {
            Ok(outcome) => {
                log::debug!(
                    "Synthesis worker lease released after {} fragments",
                    outcome.stats.fragments
                );
                Some(outcome)
            }
            Err(_) => {
                log::error!("Synthesis worker panicked");
                None
            }
        }
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        // the stream is released only after the worker has exited
        if let Some(outcome) = self.join() {
            outcome.stream.close();
        }
    }
}

struct Worker {
    receiver: FragmentReceiver,
    stream: Box<dyn SynthesisStream>,
    sink: Box<dyn PcmSink>,
    settings: WorkerSettings,
    failure: Arc<Mutex<Option<SpeakError>>>,
    stats: LeaseStats,
    first_call: Option<Instant>,
    first_audio_sent: bool,
    held: Vec<PcmChunk>,
    holding: bool,
    fatal: Option<SpeakError>,
}

impl Worker {
    fn run(mut self) -> WorkerOutcome {
        loop {
            match self.receiver.pop() {
                Command::Fragment(fragment) => self.process(fragment),
                Command::Shutdown => {
                    self.release_held();
                    break;
                }
            }
        }
        WorkerOutcome {
            stream: self.stream,
            sink: self.sink,
            stats: self.stats,
            error: self.fatal,
        }
    }

    fn process(&mut self, fragment: TextFragment) {
        if self.fatal.is_some() {
            log::debug!("Discarding fragment after fatal error");
            return;
        }

        let clock = &self.settings.clock;
        if self.first_call.is_none() {
            self.first_call = Some(Instant::now());
            clock.mark_first_synthesis_call();
        }
        self.stats.fragments += 1;

        let started = Instant::now();
        let result = if fragment.is_flush() {
            self.stream.flush()
        } else {
            self.stream.synthesize(fragment.as_str())
        };
        let processing = started.elapsed();

        let chunk = match result {
            Ok(chunk) => chunk,
            Err(error) if error.is_fatal() => {
                log::error!("Synthesis stopped: {}", error);
                let error = SpeakError::from(error);
                self.settings.events.emit(SpeakerEvent::Failed(error.clone()));
                *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.clone());
                self.fatal = Some(error);
                return;
            }
            Err(error) => {
                log::warn!("Skipping fragment {:?}: {}", fragment.as_str(), error);
                self.stats.rejected += 1;
                self.settings.events.emit(SpeakerEvent::FragmentRejected {
                    text: fragment.as_str().to_string(),
                    error,
                });
                return;
            }
        };

        if chunk.is_empty() {
            return;
        }

        self.settings.events.emit(SpeakerEvent::Chunk(ChunkSummary {
            index: self.stats.chunks,
            text: fragment.as_str().to_string(),
            samples: chunk.len(),
            audio: chunk.duration(),
            processing,
        }));
        self.stats.chunks += 1;
        self.stats.samples += chunk.len();

        if !self.first_audio_sent {
            self.first_audio_sent = true;
            clock.mark_first_audio();
            let since = clock
                .first_synthesis_call()
                .or(self.first_call)
                .unwrap_or(started);
            let delay = self.settings.delay.initial_delay(&DelayInputs {
                samples: chunk.len(),
                sample_rate: self.settings.sample_rate,
                fragments: self.stats.fragments,
                elapsed: since.elapsed(),
                last_call: processing,
            });
            clock.set_initial_audio_delay(delay);
            self.settings.events.emit(SpeakerEvent::FirstAudio {
                samples: chunk.len(),
                delay,
            });
            log::info!(
                "First audio after {} fragments, delaying playback by {}ms",
                self.stats.fragments,
                delay.as_millis()
            );
            std::thread::sleep(delay);
        }

        self.forward(chunk);
    }

    // Hold back the first chunks of the session as the platform asks, then
    // release everything in order.
    fn forward(&mut self, chunk: PcmChunk) {
        let wait = self.settings.platform.extra_startup_wait_blocks as usize;
        if self.holding && self.held.len() < wait {
            self.held.push(chunk);
            return;
        }
        self.release_held();
        self.sink.play(&chunk);
    }

    fn release_held(&mut self) {
        self.holding = false;
        for chunk in std::mem::take(&mut self.held) {
            self.sink.play(&chunk);
        }
    }
}

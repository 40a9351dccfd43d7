use {
    crate::{
        DelayConfig, PlatformConfig, SessionClock, SpeakError, SpeakerEvent, SpeakerListener,
        Synthesizer, TextFragment, TimingReport,
        event::EventBus,
        worker::{WorkerLease, WorkerSettings},
    },
    parrot_audio::{AudioOut, AudioOutConfig, PcmSink},
};

/// Speaker configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpeakerConfig {
    pub delay: DelayConfig,
    pub platform: PlatformConfig,
    /// Close the engine stream after every flush and open a fresh one.
    pub reopen_stream_on_flush: bool,
}

/// Streams text into a synthesis engine and hands the audio to a sink.
///
/// Text pushed with [`push`](Speaker::push) is synthesized on a worker thread
/// in push order. [`flush`](Speaker::flush) ends the utterance: it waits for
/// the worker, drains the sink and starts a clean session.
pub struct Speaker {
    synthesizer: Box<dyn Synthesizer>,
    lease: Option<WorkerLease>,
    settings: WorkerSettings,
    reopen_stream_on_flush: bool,
    failure: Option<SpeakError>,
    finished: bool,
}

impl Speaker {
    pub fn new<S>(
        synthesizer: S,
        sink: Box<dyn PcmSink>,
        config: SpeakerConfig,
    ) -> Result<Self, SpeakError>
    where
        S: Synthesizer + 'static,
    {
        let mut synthesizer: Box<dyn Synthesizer> = Box::new(synthesizer);
        let stream = synthesizer.open_stream()?;
        let settings = WorkerSettings {
            sample_rate: synthesizer.sample_rate(),
            delay: config.delay,
            platform: config.platform,
            clock: SessionClock::new(),
            events: EventBus::default(),
        };
        if config.platform.extra_startup_wait_blocks > 0 {
            log::info!(
                "Holding back {} extra blocks at session start",
                config.platform.extra_startup_wait_blocks
            );
        }
        let lease = WorkerLease::acquire(stream, sink, settings.clone());
        Ok(Self {
            synthesizer,
            lease: Some(lease),
            settings,
            reopen_stream_on_flush: config.reopen_stream_on_flush,
            failure: None,
            finished: false,
        })
    }

    /// Open an audio output at the engine's sample rate and speak into it.
    ///
    /// Drop the speaker before the returned driver, or close it, so that
    /// the last utterance is not cut off.
    pub fn with_audio_out<S>(
        synthesizer: S,
        audio: AudioOutConfig,
        config: SpeakerConfig,
    ) -> Result<(Self, AudioOut), SpeakError>
    where
        S: Synthesizer + 'static,
    {
        let audio = AudioOutConfig {
            sample_rate: synthesizer.sample_rate(),
            ..audio
        };
        let (audio_out, writer) = AudioOut::open(audio);
        let speaker = Self::new(synthesizer, Box::new(writer), config)?;
        Ok((speaker, audio_out))
    }

    pub fn sample_rate(&self) -> usize {
        self.settings.sample_rate
    }

    pub fn clock(&self) -> &SessionClock {
        &self.settings.clock
    }

    pub fn report(&self) -> TimingReport {
        self.settings.clock.report()
    }

    pub fn listen(&self) -> SpeakerListener {
        self.settings.events.subscribe()
    }

    /// Start a new session and record when the text was requested.
    ///
    /// Optional: the first push after a flush starts a new session as well,
    /// without a request timestamp.
    pub fn begin(&mut self) {
        self.settings.clock.reset();
        self.settings.clock.mark_request();
        self.finished = false;
    }

    /// Queue one fragment of text. Never waits for synthesis.
    ///
    /// Fails once the engine has reported a fatal error.
    pub fn push(&mut self, text: &str) -> Result<(), SpeakError> {
        self.check()?;
        if self.finished {
            self.settings.clock.reset();
            self.finished = false;
        }
        let lease = self.lease.as_ref().ok_or(SpeakError::WorkerPanicked)?;
        self.settings.clock.mark_text();
        let result = lease.push(TextFragment::text(text));
        result.inspect_err(|error| self.fail(error))
    }

    /// End the utterance and wait until its audio has been delivered.
    pub fn flush(&mut self) -> Result<(), SpeakError> {
        self.check()?;
        if self.finished {
            self.settings.clock.reset();
            self.finished = false;
        }
        let lease = self.lease.take().ok_or(SpeakError::WorkerPanicked)?;
        self.settings.clock.mark_last_text();
        // a dead worker shows up when joining
        let _ = lease.push(TextFragment::flush());

        let outcome = lease.finish().inspect_err(|error| self.fail(error))?;
        let mut sink = outcome.sink;
        sink.drain_and_pad();
        self.finished = true;
        self.settings.events.emit(SpeakerEvent::SessionFinished {
            chunks: outcome.stats.chunks,
            samples: outcome.stats.samples,
        });
        log::debug!(
            "Utterance finished: {} chunks, {} samples, {} fragments rejected",
            outcome.stats.chunks,
            outcome.stats.samples,
            outcome.stats.rejected
        );

        if let Some(error) = outcome.error {
            outcome.stream.close();
            self.fail(&error);
            return Err(error);
        }

        let stream = if self.reopen_stream_on_flush {
            outcome.stream.close();
            self.synthesizer
                .open_stream()
                .map_err(SpeakError::from)
                .inspect_err(|error| self.fail(error))?
        } else {
            outcome.stream
        };
        self.lease = Some(WorkerLease::acquire(stream, sink, self.settings.clone()));
        Ok(())
    }

    /// Stop the worker after the queued fragments, drain the sink and close
    /// the engine stream. Buffered engine audio is not flushed.
    pub fn close(mut self) -> Result<(), SpeakError> {
        if let Some(lease) = self.lease.take() {
            let mut outcome = lease.finish()?;
            outcome.sink.drain_and_pad();
            outcome.stream.close();
            if let Some(error) = outcome.error {
                return Err(error);
            }
        }
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check(&mut self) -> Result<(), SpeakError> {
        if self.failure.is_none() {
            if let Some(lease) = &self.lease {
                self.failure = lease.failure();
                if self.failure.is_none() && lease.is_dead() {
                    self.failure = Some(SpeakError::WorkerPanicked);
                }
            }
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, error: &SpeakError) {
        if self.failure.is_none() {
            self.failure = Some(error.clone());
        }
    }
}

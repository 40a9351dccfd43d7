use {
    crate::{
        AudioError, BlockSink, NullSink, RingReader, RingStats, RingWriter, PlaybackRing,
        ring::default_block_size,
    },
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
            mpsc as std_mpsc,
        },
        thread::JoinHandle,
    },
};

/// Audio output configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioOutConfig {
    /// PulseAudio sink name, `None` for the server default.
    pub device_name: Option<String>,
    pub sample_rate: usize,
    /// Samples per block, `sample_rate / 20` when unset.
    pub block_size: Option<usize>,
}

impl Default for AudioOutConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: 16000,
            block_size: None,
        }
    }
}

impl AudioOutConfig {
    pub fn block_size(&self) -> usize {
        self.block_size
            .unwrap_or_else(|| default_block_size(self.sample_rate))
    }
}

type SinkOpener = Box<dyn FnOnce() -> Result<Box<dyn BlockSink>, AudioError> + Send>;

/// Audio output driver.
///
/// A dedicated thread owns the device sink and, once per block period, pulls
/// exactly one block from the playback ring (silence when it is empty) and
/// writes it. If the device cannot be opened, or fails later, the driver
/// carries on with a [`NullSink`] so that synthesis and draining keep working.
pub struct AudioOut {
    config: AudioOutConfig,
    reader: RingReader,
    stop: Arc<AtomicBool>,
    degraded: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for AudioOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioOut")
            .field("config", &self.config)
            .field("degraded", &self.is_degraded())
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl AudioOut {
    /// Open the configured device and start the driver thread.
    ///
    /// Returns the driver and the producer half of its playback ring.
    pub fn open(config: AudioOutConfig) -> (Self, RingWriter) {
        assert!(config.sample_rate > 0, "sample_rate must be greater than 0");
        let device = config.device_name.clone();
        let sample_rate = config.sample_rate;
        Self::spawn(
            config,
            Box::new(move || open_device(device.as_deref(), sample_rate)),
        )
    }

    /// Start the driver thread on an already constructed sink.
    pub fn with_sink<S>(sink: S, block_size: usize) -> (Self, RingWriter)
    where
        S: BlockSink + Send + 'static,
    {
        let config = AudioOutConfig {
            device_name: None,
            sample_rate: sink.sample_rate(),
            block_size: Some(block_size),
        };
        Self::spawn(config, Box::new(move || Ok(Box::new(sink) as Box<dyn BlockSink>)))
    }

    fn spawn(config: AudioOutConfig, opener: SinkOpener) -> (Self, RingWriter) {
        let sample_rate = config.sample_rate;
        let block_size = config.block_size();
        let (writer, reader) = PlaybackRing::new(block_size, sample_rate);
        let stop = Arc::new(AtomicBool::new(false));
        let degraded = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = std_mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("parrot-audio-out".to_string())
            .spawn({
                let reader = reader.clone();
                let stop = Arc::clone(&stop);
                let degraded = Arc::clone(&degraded);
                move || {
                    let mut sink = match opener() {
                        Ok(sink) => sink,
                        Err(error) => {
                            log::warn!("{}, continuing without audio output", error);
                            degraded.store(true, Ordering::Relaxed);
                            Box::new(NullSink::new(sample_rate))
                        }
                    };
                    let _ = ready_tx.send(());
                    if let Some(fallback) =
                        drive(sink.as_mut(), &reader, &stop, &degraded, sample_rate)
                    {
                        sink = fallback;
                    }
                    if let Err(error) = sink.flush() {
                        log::debug!("Audio sink flush failed: {}", error);
                    }
                    reader.close();
                }
            });

        let handle = match handle {
            Ok(handle) => {
                // the sink is opened before the first pull
                let _ = ready_rx.recv();
                Some(handle)
            }
            Err(error) => {
                log::error!("Failed to spawn audio output thread: {}", error);
                degraded.store(true, Ordering::Relaxed);
                reader.close();
                None
            }
        };

        (
            Self {
                config,
                reader,
                stop,
                degraded,
                handle,
            },
            writer,
        )
    }

    pub fn config(&self) -> &AudioOutConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> usize {
        self.config.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.reader.block_size()
    }

    /// Whether playback fell back to discarding audio.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> RingStats {
        self.reader.stats()
    }

    /// Stop the driver thread and close the ring. Pending drains return.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Audio output thread panicked");
            }
        }
        self.reader.close();
    }
}

impl Drop for AudioOut {
    fn drop(&mut self) {
        self.stop();
    }
}

// Pull and write one block per period until stopped. If the sink fails, a
// NullSink takes over and is returned so the caller flushes the right sink.
fn drive(
    sink: &mut dyn BlockSink,
    reader: &RingReader,
    stop: &AtomicBool,
    degraded: &AtomicBool,
    sample_rate: usize,
) -> Option<Box<dyn BlockSink>> {
    let mut block = vec![0i16; reader.block_size()];
    while !stop.load(Ordering::Relaxed) {
        reader.pull(&mut block);
        if let Err(error) = sink.write(&block) {
            log::warn!("{}, continuing without audio output", error);
            degraded.store(true, Ordering::Relaxed);
            let mut fallback: Box<dyn BlockSink> = Box::new(NullSink::new(sample_rate));
            while !stop.load(Ordering::Relaxed) {
                reader.pull(&mut block);
                let _ = fallback.write(&block);
            }
            return Some(fallback);
        }
    }
    None
}

#[cfg(feature = "pulse")]
fn open_device(device: Option<&str>, sample_rate: usize) -> Result<Box<dyn BlockSink>, AudioError> {
    let sink = crate::PulseSink::open(device, sample_rate)?;
    log::debug!(
        "Opened audio output {} at {} Hz",
        device.unwrap_or("(default)"),
        sample_rate
    );
    Ok(Box::new(sink))
}

#[cfg(not(feature = "pulse"))]
fn open_device(device: Option<&str>, _sample_rate: usize) -> Result<Box<dyn BlockSink>, AudioError> {
    Err(AudioError::Device(format!(
        "no audio backend compiled in for {}",
        device.unwrap_or("the default device")
    )))
}

use {
    crate::AudioError,
    parrot_base::PcmChunk,
    std::{
        fs::File,
        io::BufWriter,
        path::{Path, PathBuf},
        time::{Duration, Instant},
    },
};

/// Receiver of whole PCM chunks as they leave the synthesis worker.
pub trait PcmSink: Send {
    /// Accept one chunk. Empty chunks are a no-op.
    fn play(&mut self, chunk: &PcmChunk);

    /// Finish the current utterance: flush any partial data and wait until
    /// everything handed over so far has been delivered.
    fn drain_and_pad(&mut self);
}

/// Device-level output taking one fixed-size block per call.
///
/// `write` is expected to block for roughly one block period, which is what
/// paces the driver thread.
pub trait BlockSink {
    fn sample_rate(&self) -> usize;

    fn write(&mut self, block: &[i16]) -> Result<(), AudioError>;

    fn flush(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Discards blocks while keeping real-time pace.
///
/// Used when no audio device could be opened, so that drains still complete
/// on the same schedule as with hardware attached.
pub struct NullSink {
    sample_rate: usize,
    deadline: Option<Instant>,
}

impl NullSink {
    pub fn new(sample_rate: usize) -> Self {
        assert!(sample_rate > 0, "sample_rate must be greater than 0");
        Self {
            sample_rate,
            deadline: None,
        }
    }
}

impl BlockSink for NullSink {
    fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    fn write(&mut self, block: &[i16]) -> Result<(), AudioError> {
        let period = Duration::from_secs_f64(block.len() as f64 / self.sample_rate as f64);
        let now = Instant::now();
        // never try to catch up on time lost before this write
        let deadline = match self.deadline {
            Some(deadline) if deadline > now => deadline + period,
            _ => now + period,
        };
        self.deadline = Some(deadline);
        std::thread::sleep(deadline.saturating_duration_since(now));
        Ok(())
    }
}

/// Writes every chunk it receives into a 16-bit mono WAV file.
pub struct WavRecorder {
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    samples: usize,
}

impl WavRecorder {
    pub fn create(path: impl AsRef<Path>, sample_rate: usize) -> Result<Self, AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sample_rate as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = path.as_ref().to_path_buf();
        let writer = hound::WavWriter::create(&path, spec)?;
        Ok(Self {
            path,
            writer: Some(writer),
            samples: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples written so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Write the header and close the file.
    pub fn finalize(mut self) -> Result<usize, AudioError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(self.samples)
    }

    fn append(&mut self, samples: &[i16]) -> Result<(), AudioError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| AudioError::Stream("recorder already finalized".to_string()))?;
        let mut sample_writer = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            sample_writer.write_sample(sample);
        }
        sample_writer.flush()?;
        self.samples += samples.len();
        Ok(())
    }
}

impl PcmSink for WavRecorder {
    fn play(&mut self, chunk: &PcmChunk) {
        if chunk.is_empty() {
            return;
        }
        if let Err(error) = self.append(chunk.samples()) {
            log::error!("Failed to write {}: {}", self.path.display(), error);
        }
    }

    fn drain_and_pad(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(error) = writer.flush() {
                log::error!("Failed to flush {}: {}", self.path.display(), error);
            }
        }
    }
}

impl Drop for WavRecorder {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(error) = writer.finalize() {
                log::warn!("Failed to finalize {}: {}", self.path.display(), error);
            }
        }
    }
}

/// Hands every chunk to several sinks in turn, e.g. playback and a recording.
pub struct TeeSink {
    sinks: Vec<Box<dyn PcmSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Box<dyn PcmSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl PcmSink for TeeSink {
    fn play(&mut self, chunk: &PcmChunk) {
        for sink in &mut self.sinks {
            sink.play(chunk);
        }
    }

    fn drain_and_pad(&mut self) {
        for sink in &mut self.sinks {
            sink.drain_and_pad();
        }
    }
}

#[cfg(feature = "pulse")]
pub use pulse::PulseSink;

#[cfg(feature = "pulse")]
mod pulse {
    use {
        super::BlockSink,
        crate::AudioError,
        libpulse_binding::{
            sample::{Format, Spec},
            stream::Direction,
        },
        libpulse_simple_binding::Simple,
    };

    /// PulseAudio playback stream, mono S16NE.
    pub struct PulseSink {
        simple: Simple,
        sample_rate: usize,
        bytes: Vec<u8>,
    }

    impl PulseSink {
        pub fn open(device: Option<&str>, sample_rate: usize) -> Result<Self, AudioError> {
            let spec = Spec {
                format: Format::S16NE,
                channels: 1,
                rate: sample_rate as u32,
            };
            if !spec.is_valid() {
                return Err(AudioError::Device(format!(
                    "invalid sample specification for {} Hz",
                    sample_rate
                )));
            }
            let simple = Simple::new(
                None,
                "parrot",
                Direction::Playback,
                device,
                "speech-playback",
                &spec,
                None,
                None,
            )
            .map_err(|e| AudioError::Device(format!("Failed to connect to PulseAudio: {}", e)))?;
            Ok(Self {
                simple,
                sample_rate,
                bytes: Vec::new(),
            })
        }
    }

    impl BlockSink for PulseSink {
        fn sample_rate(&self) -> usize {
            self.sample_rate
        }

        fn write(&mut self, block: &[i16]) -> Result<(), AudioError> {
            self.bytes.clear();
            self.bytes.extend(block.iter().flat_map(|s| s.to_ne_bytes()));
            self.simple
                .write(&self.bytes)
                .map_err(|e| AudioError::Stream(format!("PulseAudio write error: {}", e)))
        }

        fn flush(&mut self) -> Result<(), AudioError> {
            self.simple
                .drain()
                .map_err(|e| AudioError::Stream(format!("PulseAudio drain error: {}", e)))
        }
    }
}

use std::time::Duration;

/// A burst of mono 16-bit PCM returned by one synthesis call.
///
/// A chunk with zero samples is a normal outcome: streaming engines often
/// need more text before they can emit audio.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PcmChunk {
    samples: Vec<i16>,
    sample_rate: usize,
}

impl PcmChunk {
    pub fn new(samples: Vec<i16>, sample_rate: usize) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A chunk with no samples.
    pub fn empty(sample_rate: usize) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length of the chunk.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.seconds())
    }

    /// Playback length in seconds, 0 when the sample rate is unknown.
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

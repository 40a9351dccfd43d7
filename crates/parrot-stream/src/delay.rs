use std::time::Duration;

// Fragments worth of audio to bank before playback starts.
const DEFAULT_LOOKAHEAD_FRAGMENTS: f64 = 4.0;

// Per-call latency grows as audio accumulates; this scales the last call's cost.
const DEFAULT_CALL_OVERHEAD_FACTOR: f64 = 3.0;

// Guards the rate estimate against a near-zero elapsed time.
const DEFAULT_MIN_ELAPSED: Duration = Duration::from_millis(1);

// Keeps the lookahead term finite when the observed rate is zero.
const RATE_EPSILON: f64 = 1e-4;

/// Tuning for the one-time start-up delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayConfig {
    pub lookahead_fragments: f64,
    pub call_overhead_factor: f64,
    pub min_elapsed: Duration,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            lookahead_fragments: DEFAULT_LOOKAHEAD_FRAGMENTS,
            call_overhead_factor: DEFAULT_CALL_OVERHEAD_FACTOR,
            min_elapsed: DEFAULT_MIN_ELAPSED,
        }
    }
}

/// What the worker has observed when the first audio of a session appears.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayInputs {
    /// Samples in the first non-empty chunk.
    pub samples: usize,
    pub sample_rate: usize,
    /// Fragments handed to the engine so far in this session, including the current one.
    pub fragments: u64,
    /// Time since the first synthesis call of the session.
    pub elapsed: Duration,
    /// Duration of the engine call that produced the chunk.
    pub last_call: Duration,
}

impl DelayInputs {
    pub fn audio_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / self.sample_rate as f64
    }

    /// Observed producer rate.
    pub fn fragments_per_second(&self, min_elapsed: Duration) -> f64 {
        let elapsed = self.elapsed.max(min_elapsed).as_secs_f64();
        self.fragments as f64 / elapsed
    }
}

impl DelayConfig {
    /// Pause to insert before the first audio of a session so that the text
    /// producer can keep ahead of playback.
    ///
    /// `max(0, lookahead / rate + factor * last_call - audio_seconds)`
    pub fn initial_delay(&self, inputs: &DelayInputs) -> Duration {
        let rate = inputs.fragments_per_second(self.min_elapsed);
        let producer_wait = self.lookahead_fragments / (rate + RATE_EPSILON);
        let engine_overhead = self.call_overhead_factor * inputs.last_call.as_secs_f64();
        let seconds = producer_wait + engine_overhead - inputs.audio_seconds();
        if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::ZERO
        }
    }
}

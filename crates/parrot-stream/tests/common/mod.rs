#![allow(dead_code)]

use parrot_audio::PcmSink;
use parrot_base::PcmChunk;
use parrot_stream::{SynthesisError, SynthesisStream, Synthesizer};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub const FLUSH: &str = "<flush>";

pub type Responder = Box<dyn FnMut(&str, bool) -> Result<PcmChunk, SynthesisError> + Send>;

#[derive(Debug, Default)]
pub struct EngineLog {
    pub calls: Vec<String>,
    pub opened: usize,
    pub closed: usize,
}

/// Engine whose answers come from a closure shared by all of its streams.
pub struct MockEngine {
    sample_rate: usize,
    responder: Arc<Mutex<Responder>>,
    log: Arc<Mutex<EngineLog>>,
}

impl MockEngine {
    pub fn new(sample_rate: usize, responder: Responder) -> (Self, Arc<Mutex<EngineLog>>) {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        (
            Self {
                sample_rate,
                responder: Arc::new(Mutex::new(responder)),
                log: Arc::clone(&log),
            },
            log,
        )
    }

    /// Every byte of the text becomes one sample; flush returns nothing.
    pub fn echo(sample_rate: usize) -> (Self, Arc<Mutex<EngineLog>>) {
        Self::new(sample_rate, Box::new(move |text, _| Ok(echo(text, sample_rate))))
    }

    /// Answers calls in order with chunks of the given sizes, filled with 1.
    pub fn scripted(sample_rate: usize, sizes: Vec<usize>) -> (Self, Arc<Mutex<EngineLog>>) {
        let mut sizes = sizes.into_iter();
        Self::new(
            sample_rate,
            Box::new(move |_, _| {
                let n = sizes.next().unwrap_or(0);
                Ok(PcmChunk::new(vec![1; n], sample_rate))
            }),
        )
    }
}

pub fn echo(text: &str, sample_rate: usize) -> PcmChunk {
    PcmChunk::new(text.bytes().map(i16::from).collect(), sample_rate)
}

impl Synthesizer for MockEngine {
    fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    fn open_stream(&mut self) -> Result<Box<dyn SynthesisStream>, SynthesisError> {
        self.log.lock().unwrap().opened += 1;
        Ok(Box::new(MockStream {
            responder: Arc::clone(&self.responder),
            log: Arc::clone(&self.log),
        }))
    }
}

struct MockStream {
    responder: Arc<Mutex<Responder>>,
    log: Arc<Mutex<EngineLog>>,
}

impl MockStream {
    fn call(&mut self, text: &str, is_flush: bool) -> Result<PcmChunk, SynthesisError> {
        let name = if is_flush { FLUSH } else { text };
        self.log.lock().unwrap().calls.push(name.to_string());
        let mut responder = self.responder.lock().unwrap();
        (*responder)(text, is_flush)
    }
}

impl SynthesisStream for MockStream {
    fn synthesize(&mut self, text: &str) -> Result<PcmChunk, SynthesisError> {
        self.call(text, false)
    }

    fn flush(&mut self) -> Result<PcmChunk, SynthesisError> {
        self.call("", true)
    }

    fn close(self: Box<Self>) {
        self.log.lock().unwrap().closed += 1;
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub chunks: Vec<Vec<i16>>,
    /// When each chunk arrived.
    pub times: Vec<Instant>,
    pub drains: usize,
}

impl Recorded {
    pub fn samples(&self) -> Vec<i16> {
        self.chunks.concat()
    }
}

/// Keeps every chunk it is handed.
pub struct RecordingSink {
    pub recorded: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> (Self, Arc<Mutex<Recorded>>) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        (
            Self {
                recorded: Arc::clone(&recorded),
            },
            recorded,
        )
    }
}

impl PcmSink for RecordingSink {
    fn play(&mut self, chunk: &PcmChunk) {
        if !chunk.is_empty() {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.chunks.push(chunk.samples().to_vec());
            recorded.times.push(Instant::now());
        }
    }

    fn drain_and_pad(&mut self) {
        self.recorded.lock().unwrap().drains += 1;
    }
}

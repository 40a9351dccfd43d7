use {crate::SynthesisError, parrot_base::PcmChunk};

/// A speech engine able to open streaming synthesis sessions.
pub trait Synthesizer: Send {
    /// Sample rate of every chunk produced by this engine.
    fn sample_rate(&self) -> usize;

    fn open_stream(&mut self) -> Result<Box<dyn SynthesisStream>, SynthesisError>;
}

/// One stateful streaming synthesis session.
///
/// Calls are order-sensitive and must come from a single thread at a time.
/// Returning an empty chunk means the engine needs more text before it can
/// produce audio.
pub trait SynthesisStream: Send {
    fn synthesize(&mut self, text: &str) -> Result<PcmChunk, SynthesisError>;

    /// Emit whatever audio is still buffered and end the utterance.
    fn flush(&mut self) -> Result<PcmChunk, SynthesisError>;

    fn close(self: Box<Self>);
}

//! Streaming text-to-speech orchestration.
//!
//! Text fragments pushed into a [`Speaker`] travel through a FIFO queue to a
//! worker thread, the only caller of the engine's [`SynthesisStream`]. The
//! worker delays the first audio of each utterance just long enough for the
//! text producer to stay ahead of playback, then forwards chunks to a
//! [`PcmSink`](parrot_audio::PcmSink).

pub mod delay;
pub mod engine;
pub mod error;
pub mod event;
pub mod fragment;
pub mod platform;
pub mod producer;
pub mod speaker;
pub mod timer;
pub mod tone;
mod worker;

pub use delay::{DelayConfig, DelayInputs};
pub use engine::{SynthesisStream, Synthesizer};
pub use error::{SpeakError, SynthesisError};
pub use event::{ChunkSummary, SpeakerEvent, SpeakerListener};
pub use fragment::{Command, FragmentReceiver, FragmentSender, TextFragment, fragment_queue};
pub use platform::PlatformConfig;
pub use producer::{DEFAULT_TOKENS_PER_SECOND, Lines, SimulatedTokens, lines, tokenize};
pub use speaker::{Speaker, SpeakerConfig};
pub use timer::{SessionClock, SessionTimer, TimingReport};
pub use tone::ToneSynthesizer;

//! Playback side of the parrot pipeline.
//!
//! PCM chunks of arbitrary length enter a [`RingWriter`], are sliced into
//! fixed-size blocks and pulled one block per period by the [`AudioOut`]
//! driver thread, which writes them to a [`BlockSink`] (PulseAudio when the
//! `pulse` feature is enabled, a paced null sink otherwise).

pub mod audio_out;
#[cfg(feature = "pulse")]
pub mod device;
pub mod error;
pub mod ring;
pub mod sink;

pub use audio_out::{AudioOut, AudioOutConfig};
#[cfg(feature = "pulse")]
pub use device::{AudioDevice, list_devices};
pub use error::AudioError;
pub use ring::{PlaybackRing, RingReader, RingStats, RingWriter};
pub use sink::{BlockSink, NullSink, PcmSink, TeeSink, WavRecorder};
#[cfg(feature = "pulse")]
pub use sink::PulseSink;

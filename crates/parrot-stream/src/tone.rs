use {
    crate::{SynthesisError, SynthesisStream, Synthesizer},
    parrot_base::PcmChunk,
    std::f64::consts::TAU,
};

const DEFAULT_SAMPLE_RATE: usize = 22050;
const MS_PER_LETTER: usize = 55;
const WORD_GAP_MS: usize = 30;
const PAUSE_MS: usize = 180;
const BASE_FREQUENCY: f64 = 180.0;
const AMPLITUDE: f64 = 6000.0;

/// Self-contained engine that renders every word as a short hum.
///
/// It behaves like a streaming engine: audio for a word comes out only once
/// the whitespace after it has arrived, and flush emits the rest.
#[derive(Clone, Copy, Debug)]
pub struct ToneSynthesizer {
    sample_rate: usize,
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl ToneSynthesizer {
    pub fn new(sample_rate: usize) -> Self {
        assert!(sample_rate > 0, "sample_rate must be greater than 0");
        Self { sample_rate }
    }
}

impl Synthesizer for ToneSynthesizer {
    fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    fn open_stream(&mut self) -> Result<Box<dyn SynthesisStream>, SynthesisError> {
        Ok(Box::new(ToneStream {
            sample_rate: self.sample_rate,
            pending: String::new(),
        }))
    }
}

struct ToneStream {
    sample_rate: usize,
    pending: String,
}

impl ToneStream {
    fn samples_for(&self, ms: usize) -> usize {
        self.sample_rate * ms / 1000
    }

    fn render_word(&self, word: &str, out: &mut Vec<i16>) {
        // spoken part of a pronunciation marker
        let word = word
            .strip_prefix('{')
            .and_then(|w| w.split('|').next())
            .unwrap_or(word);
        let letters = word.chars().filter(|c| c.is_alphanumeric()).count();
        if letters > 0 {
            let pitch = word.bytes().map(usize::from).sum::<usize>() % 12;
            let frequency = BASE_FREQUENCY * 2f64.powf(pitch as f64 / 12.0);
            let n = self.samples_for(letters * MS_PER_LETTER);
            out.extend((0..n).map(|i| {
                let t = i as f64 / self.sample_rate as f64;
                // fade in and out to avoid clicks
                let envelope = (i.min(n - i) as f64 / 200.0).min(1.0);
                (AMPLITUDE * envelope * (TAU * frequency * t).sin()) as i16
            }));
            out.resize(out.len() + self.samples_for(WORD_GAP_MS), 0);
        }
        if word.ends_with(['.', ',', '!', '?', ';', ':']) {
            out.resize(out.len() + self.samples_for(PAUSE_MS), 0);
        }
    }

    fn render(&mut self, everything: bool) -> PcmChunk {
        let end = if everything {
            self.pending.len()
        } else {
            match spoken_end(&self.pending) {
                Some(end) => end,
                None => return PcmChunk::empty(self.sample_rate),
            }
        };
        let text: String = self.pending.drain(..end).collect();
        let mut samples = Vec::new();
        for word in words(&text) {
            self.render_word(word, &mut samples);
        }
        PcmChunk::new(samples, self.sample_rate)
    }
}

// Position of the last whitespace outside a pronunciation marker.
fn spoken_end(text: &str) -> Option<usize> {
    let mut in_marker = false;
    let mut end = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' => in_marker = true,
            '}' => in_marker = false,
            c if c.is_whitespace() && !in_marker => end = Some(i),
            _ => {}
        }
    }
    end
}

// Whitespace-separated words, with each marker kept whole.
fn words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = None;
    let mut in_marker = false;
    for (i, c) in text.char_indices() {
        match c {
            '{' => in_marker = true,
            '}' => in_marker = false,
            _ => {}
        }
        if c.is_whitespace() && !in_marker {
            if let Some(s) = start.take() {
                words.push(&text[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push(&text[s..]);
    }
    words
}

impl SynthesisStream for ToneStream {
    fn synthesize(&mut self, text: &str) -> Result<PcmChunk, SynthesisError> {
        if let Some(c) = text.chars().find(|c| c.is_control() && !c.is_whitespace()) {
            return Err(SynthesisError::InvalidText(format!(
                "unsupported character {:?}",
                c
            )));
        }
        self.pending.push_str(text);
        Ok(self.render(false))
    }

    fn flush(&mut self) -> Result<PcmChunk, SynthesisError> {
        Ok(self.render(true))
    }

    fn close(self: Box<Self>) {
        if !self.pending.is_empty() {
            log::debug!("Tone stream closed with {:?} unspoken", self.pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_waits_for_whitespace() {
        let mut stream = ToneSynthesizer::new(16000).open_stream().unwrap();
        assert!(stream.synthesize("Hel").unwrap().is_empty());
        assert!(stream.synthesize("lo").unwrap().is_empty());
        let chunk = stream.synthesize(" wor").unwrap();
        // 5 letters and a gap
        assert_eq!(chunk.len(), 16 * (5 * MS_PER_LETTER + WORD_GAP_MS));
        let rest = stream.flush().unwrap();
        assert_eq!(rest.len(), 16 * (3 * MS_PER_LETTER + WORD_GAP_MS));
        assert!(stream.flush().unwrap().is_empty());
    }

    #[test]
    fn test_marker_speaks_word_only() {
        let mut stream = ToneSynthesizer::new(16000).open_stream().unwrap();
        let chunk = stream.synthesize("{read|R EH1 D} ").unwrap();
        assert_eq!(chunk.len(), 16 * (4 * MS_PER_LETTER + WORD_GAP_MS));
        assert!(stream.flush().unwrap().is_empty());
    }

    #[test]
    fn test_marker_split_across_fragments() {
        let mut stream = ToneSynthesizer::new(16000).open_stream().unwrap();
        assert!(stream.synthesize("{read|R EH1").unwrap().is_empty());
        assert!(!stream.synthesize(" D} now").unwrap().is_empty());
    }

    #[test]
    fn test_control_characters_rejected() {
        let mut stream = ToneSynthesizer::default().open_stream().unwrap();
        assert!(matches!(
            stream.synthesize("bad\u{7}"),
            Err(SynthesisError::InvalidText(_))
        ));
        assert!(stream.synthesize("fine ").is_ok());
    }
}

use std::{
    io::{self, BufRead},
    time::{Duration, Instant},
    vec,
};

/// Token rate of [`SimulatedTokens`] when none is given.
pub const DEFAULT_TOKENS_PER_SECOND: f64 = 25.0;

const MARKER_OPEN: char = '{';
const MARKER_CLOSE: char = '}';
const MARKER_SEPARATOR: char = '|';

// Length of a `{word|pronunciation}` marker starting at the beginning of `text`.
fn marker_len(text: &str) -> Option<usize> {
    let rest = text.strip_prefix(MARKER_OPEN)?;
    let close = rest.find(MARKER_CLOSE)?;
    let body = &rest[..close];
    if !body.contains(MARKER_SEPARATOR) || body.contains(MARKER_OPEN) {
        return None;
    }
    Some(close + 2)
}

/// Split text into tokens the way a language model streams them: each word
/// carries its leading whitespace and punctuation comes out on its own.
///
/// Custom pronunciation markers such as `{tomato|T AH0 M EY1 T OW2}` stay in
/// one token, and a space is inserted after a marker that is directly
/// followed by other text.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();
    let mut word = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(len) = marker_len(rest) {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            pending.clear();
            let separator = if tokens.is_empty() { "" } else { " " };
            tokens.push(format!("{}{}", separator, &rest[..len]));
            rest = &rest[len..];
            if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
                pending.push(' ');
            }
            continue;
        }

        if c.is_whitespace() {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            pending.push(c);
        } else if c.is_alphanumeric() || (c == '\'' && !word.is_empty()) {
            if word.is_empty() {
                word = std::mem::take(&mut pending);
            }
            word.push(c);
        } else {
            if !word.is_empty() {
                tokens.push(std::mem::take(&mut word));
            }
            let mut token = std::mem::take(&mut pending);
            token.push(c);
            tokens.push(token);
        }
        rest = &rest[c.len_utf8()..];
    }

    if !word.is_empty() {
        tokens.push(word);
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

/// Stand-in for a language model: yields the tokens of a text at a steady
/// rate, sleeping between them.
pub struct SimulatedTokens {
    tokens: vec::IntoIter<String>,
    interval: Duration,
    next: Option<Instant>,
}

impl SimulatedTokens {
    pub fn new(text: &str) -> Self {
        Self::with_rate(text, DEFAULT_TOKENS_PER_SECOND)
    }

    pub fn with_rate(text: &str, tokens_per_second: f64) -> Self {
        assert!(
            tokens_per_second > 0.0,
            "tokens_per_second must be greater than 0"
        );
        Self {
            tokens: tokenize(text).into_iter(),
            interval: Duration::from_secs_f64(1.0 / tokens_per_second),
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Iterator for SimulatedTokens {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.next()?;
        let now = Instant::now();
        let deadline = self.next.unwrap_or(now) + self.interval;
        std::thread::sleep(deadline.saturating_duration_since(now));
        self.next = Some(deadline.max(now));
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.tokens.size_hint()
    }
}

/// One fragment per typed line, trimmed, skipping blank lines.
pub struct Lines<R> {
    reader: R,
}

pub fn lines<R: BufRead>(reader: R) -> Lines<R> {
    Lines { reader }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        return Some(Ok(trimmed.to_string()));
                    }
                }
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

// delays below this are not worth mentioning in the summary
const NOTABLE_DELAY: Duration = Duration::from_millis(100);

/// Lifecycle timestamps of one speaking session.
///
/// Each timestamp goes from unset to set at most once per session; `reset`
/// clears them all. Request and text timestamps are written by the producer,
/// synthesis and audio timestamps by the worker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionTimer {
    pub request: Option<Instant>,
    pub first_text: Option<Instant>,
    pub last_text: Option<Instant>,
    pub first_synthesis_call: Option<Instant>,
    pub first_audio: Option<Instant>,
    pub initial_audio_delay: Option<Duration>,
    /// Text fragments pushed by the producer.
    pub fragments: u64,
}

fn set_once(slot: &mut Option<Instant>, now: Instant) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(now);
    true
}

fn between(from: Option<Instant>, to: Option<Instant>) -> Option<Duration> {
    Some(to?.saturating_duration_since(from?))
}

impl SessionTimer {
    pub fn report(&self) -> TimingReport {
        let generation = between(self.first_text, self.last_text);
        let fragments_per_second = generation
            .filter(|d| !d.is_zero())
            .map(|d| self.fragments as f64 / d.as_secs_f64());
        TimingReport {
            time_to_first_text: between(self.request, self.first_text),
            generation_time: generation,
            fragments: self.fragments,
            fragments_per_second,
            time_to_first_audio: between(self.first_text, self.first_audio),
            initial_audio_delay: self.initial_audio_delay.unwrap_or(Duration::ZERO),
        }
    }
}

struct Inner {
    timer: Mutex<SessionTimer>,
    audio: Condvar,
}

/// Shared, synchronized handle to the current [`SessionTimer`].
#[derive(Clone)]
pub struct SessionClock {
    inner: Arc<Inner>,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionClock").field(&*self.lock()).finish()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                timer: Mutex::new(SessionTimer::default()),
                audio: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionTimer> {
        self.inner.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return every field to unset. Idempotent.
    pub fn reset(&self) {
        *self.lock() = SessionTimer::default();
    }

    pub fn mark_request(&self) -> bool {
        set_once(&mut self.lock().request, Instant::now())
    }

    /// Count one pushed fragment, stamping the first one.
    pub fn mark_text(&self) {
        let now = Instant::now();
        let mut timer = self.lock();
        set_once(&mut timer.first_text, now);
        timer.fragments += 1;
    }

    pub fn mark_last_text(&self) -> bool {
        set_once(&mut self.lock().last_text, Instant::now())
    }

    pub fn mark_first_synthesis_call(&self) -> bool {
        set_once(&mut self.lock().first_synthesis_call, Instant::now())
    }

    pub fn mark_first_audio(&self) -> bool {
        let set = set_once(&mut self.lock().first_audio, Instant::now());
        if set {
            self.inner.audio.notify_all();
        }
        set
    }

    pub fn set_initial_audio_delay(&self, delay: Duration) {
        self.lock().initial_audio_delay = Some(delay);
    }

    pub fn first_synthesis_call(&self) -> Option<Instant> {
        self.lock().first_synthesis_call
    }

    pub fn before_first_audio(&self) -> bool {
        self.lock().first_audio.is_none()
    }

    /// Wait until the first audio of the session is available.
    /// Returns false on timeout.
    pub fn wait_first_audio(&self, timeout: Duration) -> bool {
        let timer = self.lock();
        let result = self
            .inner
            .audio
            .wait_timeout_while(timer, timeout, |timer| timer.first_audio.is_none());
        match result {
            Ok((_, wait)) => !wait.timed_out(),
            Err(poisoned) => !poisoned.into_inner().1.timed_out(),
        }
    }

    pub fn snapshot(&self) -> SessionTimer {
        self.lock().clone()
    }

    pub fn report(&self) -> TimingReport {
        self.lock().report()
    }
}

/// Presentation metrics derived from a session's timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingReport {
    /// From the request to the first text fragment (time to first token).
    pub time_to_first_text: Option<Duration>,
    /// From the first to the last text fragment.
    pub generation_time: Option<Duration>,
    pub fragments: u64,
    pub fragments_per_second: Option<f64>,
    /// From the first text fragment to the first audio.
    pub time_to_first_audio: Option<Duration>,
    pub initial_audio_delay: Duration,
}

fn seconds(d: Option<Duration>) -> String {
    match d {
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Delay for first text token: {}", seconds(self.time_to_first_text))?;
        write!(f, "Time to generate text: {}", seconds(self.generation_time))?;
        match self.fragments_per_second {
            Some(rate) => writeln!(f, " (tokens / second = ~{:.1})", rate)?,
            None => writeln!(f)?,
        }
        write!(
            f,
            "Time to first audio after first token: {}",
            seconds(self.time_to_first_audio)
        )?;
        if self.initial_audio_delay > NOTABLE_DELAY {
            write!(
                f,
                " (added delay of `{}` to ensure continuous audio)",
                seconds(Some(self.initial_audio_delay))
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_set_once() {
        let clock = SessionClock::new();
        assert!(clock.mark_first_synthesis_call());
        let first = clock.first_synthesis_call();
        std::thread::sleep(Duration::from_millis(2));
        assert!(!clock.mark_first_synthesis_call());
        assert_eq!(clock.first_synthesis_call(), first);
    }

    #[test]
    fn test_reset_clears_everything() {
        let clock = SessionClock::new();
        clock.mark_request();
        clock.mark_text();
        clock.mark_last_text();
        clock.mark_first_synthesis_call();
        clock.mark_first_audio();
        clock.set_initial_audio_delay(Duration::from_millis(5));
        clock.reset();
        assert_eq!(clock.snapshot(), SessionTimer::default());
        clock.reset();
        assert_eq!(clock.snapshot(), SessionTimer::default());
    }

    #[test]
    fn test_report_derives_rates() {
        let base = Instant::now();
        let timer = SessionTimer {
            request: Some(base),
            first_text: Some(base + Duration::from_millis(500)),
            last_text: Some(base + Duration::from_millis(2500)),
            first_synthesis_call: Some(base + Duration::from_millis(510)),
            first_audio: Some(base + Duration::from_millis(900)),
            initial_audio_delay: Some(Duration::from_millis(250)),
            fragments: 50,
        };
        let report = timer.report();
        assert_eq!(report.time_to_first_text, Some(Duration::from_millis(500)));
        assert_eq!(report.generation_time, Some(Duration::from_secs(2)));
        assert_eq!(report.fragments_per_second, Some(25.0));
        assert_eq!(report.time_to_first_audio, Some(Duration::from_millis(400)));

        let text = report.to_string();
        assert!(text.contains("Delay for first text token: 0.5s"));
        assert!(text.contains("tokens / second = ~25.0"));
        assert!(text.contains("added delay of `0.2s`") || text.contains("added delay of `0.3s`"));
    }

    #[test]
    fn test_report_with_missing_audio() {
        let clock = SessionClock::new();
        clock.mark_request();
        clock.mark_text();
        let report = clock.report();
        assert_eq!(report.time_to_first_audio, None);
        assert!(!report.to_string().contains("added delay"));
    }

    #[test]
    fn test_wait_first_audio() {
        let clock = SessionClock::new();
        assert!(!clock.wait_first_audio(Duration::from_millis(10)));

        let marker = clock.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            marker.mark_first_audio();
        });
        assert!(clock.wait_first_audio(Duration::from_secs(5)));
        handle.join().unwrap();
        assert!(!clock.before_first_audio());
    }
}

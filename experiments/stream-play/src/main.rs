use {
    futures_util::StreamExt,
    parrot_audio::AudioOutConfig,
    parrot_base::log,
    parrot_stream::{
        DEFAULT_TOKENS_PER_SECOND, PlatformConfig, SessionClock, SimulatedTokens, Speaker,
        SpeakerConfig, SpeakerEvent, ToneSynthesizer, lines,
    },
    std::{
        io::{self, Write},
        thread,
        time::Duration,
    },
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const TOKENS_PER_SECOND_ENV: &str = "PARROT_TOKENS_PER_SECOND";
const AUDIO_DEVICE_ENV: &str = "PARROT_AUDIO_DEVICE";
#[cfg(feature = "pulse")]
const SHOW_DEVICES_ENV: &str = "PARROT_SHOW_DEVICES";
const FIRST_AUDIO_TIMEOUT: Duration = Duration::from_secs(10);
const PROMPT: &str = "Type a sentence and press ENTER (Ctrl-D to quit)";

fn tokens_per_second() -> Result<f64, BoxError> {
    match std::env::var(TOKENS_PER_SECOND_ENV) {
        Ok(value) => {
            let rate: f64 = value.trim().parse()?;
            if rate <= 0.0 {
                return Err(format!("{} must be positive", TOKENS_PER_SECOND_ENV).into());
            }
            Ok(rate)
        }
        Err(_) => Ok(DEFAULT_TOKENS_PER_SECOND),
    }
}

#[cfg(feature = "pulse")]
fn show_devices() -> Result<(), BoxError> {
    println!("Available audio devices:");
    for device in parrot_audio::list_devices()? {
        println!("  {:<48} {}", device.name, device.description);
    }
    Ok(())
}

// Report when the utterance becomes audible, or warn if it never does.
fn watch_first_audio(clock: SessionClock) {
    thread::spawn(move || {
        if !clock.wait_first_audio(FIRST_AUDIO_TIMEOUT) {
            log::warn!(
                "No audio after {}s, is the engine keeping up?",
                FIRST_AUDIO_TIMEOUT.as_secs()
            );
            return;
        }
        let timer = clock.snapshot();
        if let (Some(text), Some(audio)) = (timer.first_text, timer.first_audio) {
            let delay = timer.initial_audio_delay.unwrap_or(Duration::ZERO);
            log::info!(
                "Audio started playing after {:.1}s",
                (audio.duration_since(text) + delay).as_secs_f64()
            );
        }
    });
}

// Read lines from stdin and speak each one as a simulated token stream.
fn converse(mut speaker: Speaker, tokens_per_second: f64) -> Result<Speaker, BoxError> {
    println!("{}", PROMPT);
    for line in lines(io::stdin().lock()) {
        let line = line?;
        speaker.begin();
        watch_first_audio(speaker.clock().clone());
        print!("Speaking: ");
        for token in SimulatedTokens::with_rate(&line, tokens_per_second) {
            print!("{}", token);
            io::stdout().flush()?;
            speaker.push(&token)?;
        }
        println!();
        speaker.flush()?;
        println!("{}\n", speaker.report());
        println!("{}", PROMPT);
    }
    Ok(speaker)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    parrot_base::init_stdout_logger();

    #[cfg(feature = "pulse")]
    if std::env::var_os(SHOW_DEVICES_ENV).is_some() {
        return show_devices();
    }

    let tokens_per_second = tokens_per_second()?;
    let audio = AudioOutConfig {
        device_name: std::env::var(AUDIO_DEVICE_ENV).ok(),
        ..Default::default()
    };
    let config = SpeakerConfig {
        platform: PlatformConfig::detect(),
        ..Default::default()
    };

    let (speaker, mut audio_out) =
        Speaker::with_audio_out(ToneSynthesizer::default(), audio, config)?;
    if audio_out.is_degraded() {
        log::warn!("No audio device available, audio is discarded");
    }
    log::info!(
        "Speaking at {} Hz, {} simulated tokens per second",
        speaker.sample_rate(),
        tokens_per_second
    );

    let mut listener = speaker.listen();
    let events = tokio::spawn(async move {
        while let Some(event) = listener.next().await {
            match event {
                SpeakerEvent::FragmentRejected { text, error } => {
                    log::warn!("Could not speak {:?}: {}", text, error)
                }
                SpeakerEvent::Failed(error) => log::error!("Speaker failed: {}", error),
                SpeakerEvent::FirstAudio { delay, .. } => {
                    log::debug!("First audio, starting in {}ms", delay.as_millis())
                }
                _ => {}
            }
        }
    });

    let speaker = tokio::task::spawn_blocking(move || converse(speaker, tokens_per_second)).await??;
    speaker.close()?;
    audio_out.stop();
    events.await?;

    log::info!("Bye");
    Ok(())
}

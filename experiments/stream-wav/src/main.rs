use {
    futures_util::StreamExt,
    parrot_audio::{AudioOut, AudioOutConfig, PcmSink, TeeSink, WavRecorder},
    parrot_base::log,
    parrot_stream::{
        ChunkSummary, DEFAULT_TOKENS_PER_SECOND, SimulatedTokens, Speaker, SpeakerConfig,
        SpeakerEvent, Synthesizer, ToneSynthesizer,
    },
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const NO_AUDIO_ENV: &str = "PARROT_NO_AUDIO";
const AUDIO_DEVICE_ENV: &str = "PARROT_AUDIO_DEVICE";

const SENTENCE: &str = "Streaming synthesis turns {tokens|T OW1 K AH0 N Z} into audio while the text is still arriving.";

fn print_summary(chunks: &[ChunkSummary]) {
    println!("\nAudio chunks:");
    for chunk in chunks {
        let text = if chunk.text.is_empty() {
            "<flush>"
        } else {
            chunk.text.as_str()
        };
        println!(
            "  #{:<3} {:<24} {:>6} samples  audio {:.3}s  processing {:.3}s",
            chunk.index,
            format!("{:?}", text),
            chunk.samples,
            chunk.audio.as_secs_f64(),
            chunk.processing.as_secs_f64()
        );
    }
    let audio: f64 = chunks.iter().map(|c| c.audio.as_secs_f64()).sum();
    let processing: f64 = chunks.iter().map(|c| c.processing.as_secs_f64()).sum();
    println!(
        "  {} chunks, {:.3}s of audio in {:.3}s of processing",
        chunks.len(),
        audio,
        processing
    );
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    parrot_base::init_stdout_logger();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <output.wav> [text]", args[0]);
        eprintln!("Set {} to only write the file", NO_AUDIO_ENV);
        std::process::exit(1);
    }
    let output_path = args[1].clone();
    let text = args.get(2).cloned().unwrap_or_else(|| SENTENCE.to_string());

    let engine = ToneSynthesizer::default();
    let recorder = WavRecorder::create(&output_path, engine.sample_rate())?;
    let mut sinks: Vec<Box<dyn PcmSink>> = vec![Box::new(recorder)];
    let mut audio_out = None;
    if std::env::var_os(NO_AUDIO_ENV).is_none() {
        let (out, writer) = AudioOut::open(AudioOutConfig {
            device_name: std::env::var(AUDIO_DEVICE_ENV).ok(),
            sample_rate: engine.sample_rate(),
            ..Default::default()
        });
        if out.is_degraded() {
            log::warn!("No audio device available, only writing {}", output_path);
        }
        sinks.push(Box::new(writer));
        audio_out = Some(out);
    }
    let sink = TeeSink::new(sinks);
    let mut speaker = Speaker::new(engine, Box::new(sink), SpeakerConfig::default())?;
    let listener = speaker.listen();

    log::info!("Synthesizing: \"{}\"", text);
    let report = tokio::task::spawn_blocking(move || -> Result<_, BoxError> {
        speaker.begin();
        for token in SimulatedTokens::with_rate(&text, DEFAULT_TOKENS_PER_SECOND) {
            speaker.push(&token)?;
        }
        speaker.flush()?;
        let report = speaker.report();
        // dropping the recorder writes the WAV header
        speaker.close()?;
        Ok(report)
    })
    .await??;
    if let Some(mut audio_out) = audio_out {
        audio_out.stop();
    }

    let chunks: Vec<ChunkSummary> = listener
        .filter_map(|event| async move {
            match event {
                SpeakerEvent::Chunk(chunk) => Some(chunk),
                _ => None,
            }
        })
        .collect()
        .await;

    print_summary(&chunks);
    println!("\n{}", report);
    if let Some(delay) = report.time_to_first_audio {
        println!("Audio started playing after {:.1}s", delay.as_secs_f64());
    }
    let samples: usize = chunks.iter().map(|c| c.samples).sum();
    println!("Wrote {} samples to {}", samples, output_path);
    Ok(())
}

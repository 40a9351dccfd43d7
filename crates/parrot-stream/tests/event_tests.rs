mod common;

use common::{MockEngine, RecordingSink};
use futures_util::StreamExt;
use parrot_stream::{Speaker, SpeakerConfig, SpeakerEvent};

#[tokio::test]
async fn test_listener_streams_session_events() {
    let (engine, _log) = MockEngine::echo(16000);
    let (sink, _recorded) = RecordingSink::new();
    let mut speaker = Speaker::new(engine, Box::new(sink), SpeakerConfig::default()).unwrap();
    let listener = speaker.listen();

    speaker.push("hello").unwrap();
    speaker.push(" there").unwrap();
    speaker.flush().unwrap();
    speaker.close().unwrap();

    // the stream ends once the speaker and its worker are gone
    let events: Vec<SpeakerEvent> = listener.collect().await;
    assert!(matches!(events[0], SpeakerEvent::Chunk(ref c) if c.index == 0 && c.text == "hello"));
    assert!(matches!(events[1], SpeakerEvent::FirstAudio { samples: 5, .. }));
    assert!(matches!(events[2], SpeakerEvent::Chunk(ref c) if c.index == 1 && c.samples == 6));
    assert_eq!(
        events[3],
        SpeakerEvent::SessionFinished {
            chunks: 2,
            samples: 11
        }
    );
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_every_listener_gets_every_event() {
    let (engine, _log) = MockEngine::echo(16000);
    let (sink, _recorded) = RecordingSink::new();
    let mut speaker = Speaker::new(engine, Box::new(sink), SpeakerConfig::default()).unwrap();
    let mut first = speaker.listen();
    let mut second = speaker.listen();

    speaker.push("hi").unwrap();
    speaker.flush().unwrap();

    for listener in [&mut first, &mut second] {
        let mut seen = Vec::new();
        while let Some(event) = listener.recv().await {
            let finished = matches!(event, SpeakerEvent::SessionFinished { .. });
            seen.push(event);
            if finished {
                break;
            }
        }
        assert_eq!(seen.len(), 3);
    }
    drop(speaker);
    assert!(first.recv().await.is_none());
}

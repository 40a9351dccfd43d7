use parrot_audio::{PcmSink, PlaybackRing, RingReader, RingWriter};
use parrot_base::PcmChunk;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

const SAMPLE_RATE: usize = 16000;

// Pull blocks on a background thread until told to stop, keeping only real blocks.
fn spawn_consumer(reader: RingReader, stop: Arc<AtomicBool>) -> thread::JoinHandle<Vec<Vec<i16>>> {
    thread::spawn(move || {
        let mut blocks = Vec::new();
        let mut out = vec![0i16; reader.block_size()];
        while !stop.load(Ordering::Relaxed) {
            if reader.pull(&mut out) {
                blocks.push(out.clone());
            } else {
                thread::sleep(Duration::from_millis(1));
            }
        }
        blocks
    })
}

fn ramp(start: i16, len: usize) -> Vec<i16> {
    (0..len).map(|i| start.wrapping_add(i as i16)).collect()
}

fn play_and_drain(writer: &mut RingWriter, reader: RingReader, chunks: &[Vec<i16>]) -> Vec<Vec<i16>> {
    let stop = Arc::new(AtomicBool::new(false));
    let consumer = spawn_consumer(reader, Arc::clone(&stop));
    for chunk in chunks {
        writer.play(&PcmChunk::new(chunk.clone(), SAMPLE_RATE));
    }
    writer.drain_and_pad();
    stop.store(true, Ordering::Relaxed);
    consumer.join().expect("consumer thread")
}

#[test]
fn test_no_sample_loss_at_boundaries() {
    let block_size = 800;
    let lengths = [0usize, 1, 799, 800, 801, 1600, 333, 0, 2047];
    let mut chunks = Vec::new();
    let mut next = 1i16;
    for &len in &lengths {
        chunks.push(ramp(next, len));
        next = next.wrapping_add(len as i16);
    }
    let input: Vec<i16> = chunks.concat();

    let (mut writer, reader) = PlaybackRing::new(block_size, SAMPLE_RATE);
    let blocks = play_and_drain(&mut writer, reader, &chunks);

    let delivered: Vec<i16> = blocks.concat();
    let expected_len = input.len().div_ceil(block_size) * block_size;
    assert_eq!(delivered.len(), expected_len);
    assert_eq!(&delivered[..input.len()], &input[..]);
    assert!(delivered[input.len()..].iter().all(|&s| s == 0));
    assert!(blocks.iter().all(|b| b.len() == block_size));
}

#[test]
fn test_empty_chunks_do_not_change_output() {
    let with_empty = vec![ramp(1, 500), vec![], vec![], ramp(501, 700), vec![], ramp(1201, 10)];
    let without_empty = vec![ramp(1, 500), ramp(501, 700), ramp(1201, 10)];

    let (mut writer_a, reader_a) = PlaybackRing::new(400, SAMPLE_RATE);
    let (mut writer_b, reader_b) = PlaybackRing::new(400, SAMPLE_RATE);
    let blocks_a = play_and_drain(&mut writer_a, reader_a, &with_empty);
    let blocks_b = play_and_drain(&mut writer_b, reader_b, &without_empty);
    assert_eq!(blocks_a, blocks_b);
}

#[test]
fn test_scenario_chunks_pad_to_one_block() {
    let (mut writer, reader) = PlaybackRing::new(800, SAMPLE_RATE);

    writer.play(&PcmChunk::empty(SAMPLE_RATE));
    writer.play(&PcmChunk::new(ramp(1, 200), SAMPLE_RATE));
    writer.play(&PcmChunk::new(ramp(201, 300), SAMPLE_RATE));
    writer.play(&PcmChunk::new(ramp(501, 100), SAMPLE_RATE));

    // 600 samples so far: nothing is queued, everything is carried
    assert_eq!(writer.pending_blocks(), 0);
    assert_eq!(writer.carried(), 600);

    let blocks = play_and_drain(&mut writer, reader, &[]);
    assert_eq!(blocks.len(), 1);
    assert_eq!(&blocks[0][..600], &ramp(1, 600)[..]);
    assert!(blocks[0][600..].iter().all(|&s| s == 0));
    assert_eq!(writer.carried(), 0);
}

#[test]
fn test_drain_returns_when_reader_closed() {
    let (mut writer, reader) = PlaybackRing::new(100, SAMPLE_RATE);
    writer.write(&ramp(1, 350));
    assert_eq!(writer.pending_blocks(), 3);

    let closer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        reader.close();
    });
    writer.drain_and_pad();
    closer.join().expect("closer thread");
    assert_eq!(writer.pending_blocks(), 0);
}

#[test]
fn test_stats_count_played_and_starved() {
    let (mut writer, reader) = PlaybackRing::new(2, SAMPLE_RATE);
    writer.write(&[1, 2, 3, 4]);
    let mut out = [0i16; 2];
    assert!(reader.pull(&mut out));
    assert!(reader.pull(&mut out));
    assert!(!reader.pull(&mut out));
    let stats = reader.stats();
    assert_eq!(stats.played, 2);
    assert_eq!(stats.starved, 1);
}

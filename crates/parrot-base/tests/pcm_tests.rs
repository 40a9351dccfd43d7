use parrot_base::PcmChunk;
use std::time::Duration;

#[test]
fn test_chunk_metadata() {
    let chunk = PcmChunk::new(vec![1i16; 800], 16000);
    assert_eq!(chunk.len(), 800);
    assert_eq!(chunk.sample_rate(), 16000);
    assert!(!chunk.is_empty());
    assert!((chunk.seconds() - 0.05).abs() < 1e-9);
    assert_eq!(chunk.duration(), Duration::from_millis(50));
}

#[test]
fn test_empty_chunk() {
    let chunk = PcmChunk::empty(22050);
    assert!(chunk.is_empty());
    assert_eq!(chunk.len(), 0);
    assert_eq!(chunk.seconds(), 0.0);
}

#[test]
fn test_zero_sample_rate_has_no_duration() {
    let chunk = PcmChunk::new(vec![0i16; 10], 0);
    assert_eq!(chunk.seconds(), 0.0);
}

#[test]
fn test_into_samples_preserves_order() {
    let chunk = PcmChunk::new(vec![3, -2, 1], 8000);
    assert_eq!(chunk.samples(), &[3, -2, 1]);
    assert_eq!(chunk.into_samples(), vec![3, -2, 1]);
}

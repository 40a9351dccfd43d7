use {
    crate::PcmSink,
    parrot_base::PcmChunk,
    std::{
        collections::VecDeque,
        sync::{
            Arc, Condvar, Mutex, MutexGuard,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
};

/// Block length used when none is configured: 50ms of audio.
pub fn default_block_size(sample_rate: usize) -> usize {
    (sample_rate / 20).max(1)
}

struct Queue {
    blocks: VecDeque<Vec<i16>>,
    closed: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    emptied: Condvar,
    played: AtomicU64,
    starved: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counters describing what the driver side has pulled so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Blocks handed to the driver with real samples.
    pub played: u64,
    /// Pulls that found the queue empty and produced silence.
    pub starved: u64,
}

/// Fixed-block playback buffer between the synthesis side and the audio driver.
pub struct PlaybackRing;

impl PlaybackRing {
    /// Create the producer and driver halves of a ring carrying blocks of
    /// `block_size` samples at `sample_rate`.
    pub fn new(block_size: usize, sample_rate: usize) -> (RingWriter, RingReader) {
        assert!(block_size > 0, "block_size must be greater than 0");
        assert!(sample_rate > 0, "sample_rate must be greater than 0");
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                blocks: VecDeque::new(),
                closed: false,
            }),
            emptied: Condvar::new(),
            played: AtomicU64::new(0),
            starved: AtomicU64::new(0),
        });
        (
            RingWriter {
                shared: Arc::clone(&shared),
                carry: Vec::with_capacity(block_size),
                block_size,
                sample_rate,
            },
            RingReader { shared, block_size },
        )
    }
}

/// Producer half. Owns the carry buffer holding the partial block left over
/// between chunk boundaries.
pub struct RingWriter {
    shared: Arc<Shared>,
    carry: Vec<i16>,
    block_size: usize,
    sample_rate: usize,
}

impl RingWriter {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    /// Samples waiting in the carry buffer for the next full block.
    pub fn carried(&self) -> usize {
        self.carry.len()
    }

    /// Blocks queued for the driver and not yet pulled.
    pub fn pending_blocks(&self) -> usize {
        self.shared.lock().blocks.len()
    }

    /// Append samples, enqueueing every completed block.
    pub fn write(&mut self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }

        let mut rest = samples;
        let mut completed = Vec::new();

        // top up the carried remainder first
        if !self.carry.is_empty() {
            let take = (self.block_size - self.carry.len()).min(rest.len());
            self.carry.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.carry.len() == self.block_size {
                completed.push(std::mem::replace(
                    &mut self.carry,
                    Vec::with_capacity(self.block_size),
                ));
            }
        }

        let mut blocks = rest.chunks_exact(self.block_size);
        completed.extend(blocks.by_ref().map(<[i16]>::to_vec));
        self.carry.extend_from_slice(blocks.remainder());

        if !completed.is_empty() {
            let mut queue = self.shared.lock();
            if queue.closed {
                log::debug!("ring closed, dropping {} blocks", completed.len());
                return;
            }
            queue.blocks.extend(completed);
        }
    }

    /// Zero-pad the carried remainder into a final block, then wait until the
    /// driver has pulled every queued block.
    ///
    /// Returns immediately when the driver side has been closed.
    pub fn drain_and_pad(&mut self) {
        if !self.carry.is_empty() {
            let mut block = std::mem::replace(&mut self.carry, Vec::with_capacity(self.block_size));
            block.resize(self.block_size, 0);
            let mut queue = self.shared.lock();
            if !queue.closed {
                queue.blocks.push_back(block);
            }
        }

        let period = self.block_period();
        let mut queue = self.shared.lock();
        while !queue.blocks.is_empty() && !queue.closed {
            queue = match self.shared.emptied.wait_timeout(queue, period) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        let closed = queue.closed;
        drop(queue);

        // the last pulled block is still being played by the device
        if !closed {
            std::thread::sleep(period);
        }
    }

    fn block_period(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}

impl PcmSink for RingWriter {
    fn play(&mut self, chunk: &PcmChunk) {
        self.write(chunk.samples());
    }

    fn drain_and_pad(&mut self) {
        RingWriter::drain_and_pad(self);
    }
}

/// Driver half, used from the real-time side.
#[derive(Clone)]
pub struct RingReader {
    shared: Arc<Shared>,
    block_size: usize,
}

impl RingReader {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Fill `out` with the next block, or with silence if none is queued.
    ///
    /// Never waits for the producer. Returns whether real samples were written.
    pub fn pull(&self, out: &mut [i16]) -> bool {
        debug_assert_eq!(out.len(), self.block_size);
        let mut queue = self.shared.lock();
        match queue.blocks.pop_front() {
            Some(block) => {
                let emptied = queue.blocks.is_empty();
                drop(queue);
                let n = block.len().min(out.len());
                out[..n].copy_from_slice(&block[..n]);
                out[n..].fill(0);
                self.shared.played.fetch_add(1, Ordering::Relaxed);
                if emptied {
                    self.shared.emptied.notify_all();
                }
                true
            }
            None => {
                drop(queue);
                out.fill(0);
                self.shared.starved.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Stop accepting blocks, discard queued ones and release any waiting drain.
    pub fn close(&self) {
        let mut queue = self.shared.lock();
        queue.closed = true;
        queue.blocks.clear();
        drop(queue);
        self.shared.emptied.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            played: self.shared.played.load(Ordering::Relaxed),
            starved: self.shared.starved.load(Ordering::Relaxed),
        }
    }
}

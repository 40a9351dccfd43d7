use std::sync::mpsc as std_mpsc;

/// One unit of incoming text: a token, a character or a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextFragment {
    text: String,
    is_flush: bool,
}

impl TextFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_flush: false,
        }
    }

    /// End of utterance: synthesize everything the engine still buffers.
    pub fn flush() -> Self {
        Self {
            text: String::new(),
            is_flush: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_flush(&self) -> bool {
        self.is_flush
    }
}

/// Message carried by the fragment queue.
#[derive(Debug)]
pub enum Command {
    Fragment(TextFragment),
    /// Release held audio and end the worker.
    Shutdown,
}

/// Create an unbounded FIFO hand-off from producers to the synthesis worker.
pub fn fragment_queue() -> (FragmentSender, FragmentReceiver) {
    let (tx, rx) = std_mpsc::channel();
    (FragmentSender { tx }, FragmentReceiver { rx })
}

/// Producer side. Cloneable for multiple producers; never blocks.
#[derive(Clone, Debug)]
pub struct FragmentSender {
    tx: std_mpsc::Sender<Command>,
}

impl FragmentSender {
    /// Enqueue a fragment.
    ///
    /// # Panics
    ///
    /// Panics if the worker side is gone: fragments must never be pushed
    /// after shutdown.
    pub fn push(&self, fragment: TextFragment) {
        if self.try_push(fragment).is_err() {
            panic!("fragment pushed after the synthesis worker shut down");
        }
    }

    /// Enqueue a fragment, handing it back if the worker side is gone.
    pub fn try_push(&self, fragment: TextFragment) -> Result<(), TextFragment> {
        self.tx
            .send(Command::Fragment(fragment))
            .map_err(|error| match error.0 {
                Command::Fragment(fragment) => fragment,
                Command::Shutdown => TextFragment::flush(),
            })
    }

    /// Ask the worker to stop once everything queued before has been handled.
    /// Returns false if the worker is already gone.
    pub fn shutdown(&self) -> bool {
        self.tx.send(Command::Shutdown).is_ok()
    }
}

/// Consumer side, owned by the synthesis worker.
#[derive(Debug)]
pub struct FragmentReceiver {
    rx: std_mpsc::Receiver<Command>,
}

impl FragmentReceiver {
    /// Block until the next command. A closed queue reads as `Shutdown`.
    pub fn pop(&self) -> Command {
        self.rx.recv().unwrap_or(Command::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = fragment_queue();
        for text in ["a", "b", "c"] {
            tx.push(TextFragment::text(text));
        }
        tx.push(TextFragment::flush());
        let mut seen = Vec::new();
        while let Command::Fragment(fragment) = rx.pop() {
            seen.push(fragment.clone());
            if fragment.is_flush() {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                TextFragment::text("a"),
                TextFragment::text("b"),
                TextFragment::text("c"),
                TextFragment::flush()
            ]
        );
    }

    #[test]
    fn test_dropped_sender_reads_as_shutdown() {
        let (tx, rx) = fragment_queue();
        drop(tx);
        assert!(matches!(rx.pop(), Command::Shutdown));
    }

    #[test]
    fn test_try_push_returns_fragment_when_closed() {
        let (tx, rx) = fragment_queue();
        assert_eq!(tx.try_push(TextFragment::text("a")), Ok(()));
        drop(rx);
        assert_eq!(
            tx.try_push(TextFragment::text("late")),
            Err(TextFragment::text("late"))
        );
    }

    #[test]
    #[should_panic(expected = "after the synthesis worker shut down")]
    fn test_push_after_receiver_dropped_panics() {
        let (tx, rx) = fragment_queue();
        drop(rx);
        tx.push(TextFragment::text("late"));
    }
}

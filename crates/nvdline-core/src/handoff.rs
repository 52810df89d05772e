//! Single-producer / single-consumer hand-off queue with explicit end-of-stream
//!
//! Wraps an unbounded `std::sync::mpsc` channel. The producer side enqueues
//! [`Message::EndOfStream`] exactly once, either through [`HandoffSender::finish`]
//! or when it is dropped, so the consumer never blocks forever even when the
//! producer bails out early with an error or a panic.

use std::sync::mpsc::{self, Receiver, Sender};

/// Item carried through the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    Item(T),
    EndOfStream,
}

/// Consumer-side error: the producer vanished without sending end-of-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

impl std::fmt::Display for RecvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("hand-off channel closed without end-of-stream")
    }
}

impl std::error::Error for RecvError {}

/// Producer half. Not `Clone`: there is exactly one producer per run.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: Sender<Message<T>>,
    finished: bool,
    sent: usize,
}

impl<T> HandoffSender<T> {
    /// Enqueue one item.
    ///
    /// Returns the item back if the consumer has already gone away
    /// (e.g. the writer thread aborted on a write failure).
    pub fn send(&mut self, item: T) -> Result<(), T> {
        match self.tx.send(Message::Item(item)) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(mpsc::SendError(Message::Item(item))) => Err(item),
            Err(mpsc::SendError(Message::EndOfStream)) => unreachable!(),
        }
    }

    /// Number of items enqueued so far
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Enqueue end-of-stream and close the producer side.
    pub fn finish(mut self) -> usize {
        self.send_end();
        self.sent
    }

    fn send_end(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        // Consumer may already be gone; nothing left to signal then
        if self.tx.send(Message::EndOfStream).is_err() {
            log::debug!("hand-off consumer gone before end-of-stream");
        }
    }
}

impl<T> Drop for HandoffSender<T> {
    fn drop(&mut self) {
        self.send_end();
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: Receiver<Message<T>>,
}

impl<T> HandoffReceiver<T> {
    /// Block until the next message.
    ///
    /// An empty queue is not the end: this waits for the producer
    /// (which may be sleeping between pages) until it sends an item or end-of-stream.
    pub fn recv(&self) -> Result<Message<T>, RecvError> {
        self.rx.recv().map_err(|_| RecvError)
    }
}

/// Create a connected sender/receiver pair.
pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (
        HandoffSender {
            tx,
            finished: false,
            sent: 0,
        },
        HandoffReceiver { rx },
    )
}

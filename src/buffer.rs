//! Bounded buffering of wire lines between producers and the flush task

use crossbeam_queue::ArrayQueue;

/// Fixed-capacity lock-free queue of formatted lines.
///
/// Producers never block: pushing into a full buffer fails immediately and
/// the caller decides how loudly to complain. The flush task drains it with
/// [`LineBuffer::drain_all`] and puts failed batches back with
/// [`LineBuffer::restore`].
#[derive(Debug)]
pub struct LineBuffer {
    queue: ArrayQueue<String>,
}

impl LineBuffer {
    /// Create a buffer holding at most `capacity` lines. `capacity` must be
    /// greater than zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// Enqueue one line without blocking. The line is handed back when the
    /// buffer is full.
    pub fn try_push(&self, line: String) -> Result<(), String> {
        self.queue.push(line)
    }

    /// Remove and return everything currently queued, oldest first
    pub fn drain_all(&self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.queue.pop() {
            lines.push(line);
        }
        lines
    }

    /// Put an undelivered batch back, keeping its order. Returns how many
    /// lines no longer fit.
    pub fn restore(&self, lines: Vec<String>) -> usize {
        let mut dropped = 0;
        for line in lines {
            if self.queue.push(line).is_err() {
                dropped += 1;
            }
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

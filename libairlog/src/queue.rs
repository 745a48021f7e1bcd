//! The shared transit queue between instrument readers and the log router.
//!
//! A thin wrapper over `std::sync::mpsc`: unbounded, many producers, one
//! consumer. Pushing never blocks; popping blocks the single consumer. Order
//! is FIFO per producer; the interleaving across producers is whatever the
//! channel delivers. Nothing here survives a crash, by design.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, SendError, Sender};
use std::time::Duration;

/// The producing half of the transit queue. Cloned once per instrument reader.
#[derive(Debug)]
pub struct Producer<T> {
    tx: Sender<T>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Producer {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Producer<T> {
    /// Enqueue an item. Fails only if the consumer has been dropped.
    pub fn push(&self, item: T) -> Result<(), SendError<T>> {
        self.tx.send(item)
    }
}

/// The consuming half of the transit queue. There is exactly one.
#[derive(Debug)]
pub struct Consumer<T> {
    rx: Receiver<T>,
}

impl<T> Consumer<T> {
    /// Block until an item is available. Returns None once every producer is gone
    /// and the queue has drained.
    pub fn pop(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Block for at most `timeout`, so the consumer can poll a stop flag between items.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Create a connected producer/consumer pair.
pub fn transit_queue<T>() -> (Producer<T>, Consumer<T>) {
    let (tx, rx) = channel();
    (Producer { tx }, Consumer { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_producer_fifo() {
        const PRODUCERS: usize = 4;
        const ITEMS: usize = 250;

        let (producer, consumer) = transit_queue();
        let mut handles = Vec::new();
        for id in 0..PRODUCERS {
            let tx = producer.clone();
            handles.push(std::thread::spawn(move || {
                for seq in 0..ITEMS {
                    tx.push((id, seq)).unwrap();
                }
            }));
        }
        drop(producer);

        let mut next_expected = [0usize; PRODUCERS];
        let mut total = 0usize;
        while let Some((id, seq)) = consumer.pop() {
            assert_eq!(
                seq, next_expected[id],
                "producer {id} delivered out of order"
            );
            next_expected[id] += 1;
            total += 1;
        }
        assert_eq!(total, PRODUCERS * ITEMS);

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_pop_timeout_elapses_when_empty() {
        let (producer, consumer) = transit_queue::<u32>();
        match consumer.pop_timeout(Duration::from_millis(10)) {
            Err(RecvTimeoutError::Timeout) => (),
            other => panic!("expected timeout, got {other:?}"),
        }
        drop(producer);
        match consumer.pop_timeout(Duration::from_millis(10)) {
            Err(RecvTimeoutError::Disconnected) => (),
            other => panic!("expected disconnect, got {other:?}"),
        }
    }
}

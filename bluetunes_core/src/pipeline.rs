// Hand-off between the bus listener thread and the UI tick.

use crate::notification::ChangeNotification;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

type Queue = Arc<Mutex<VecDeque<ChangeNotification>>>;

/// Create a connected producer/consumer pair sharing one unbounded FIFO.
pub fn pipeline() -> (PipelineSender, PipelineReceiver) {
    let queue: Queue = Default::default();
    (PipelineSender { queue: queue.clone() }, PipelineReceiver { queue })
}

// A panic on the other side must not stop notifications from flowing, so poisoning is ignored.
fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<ChangeNotification>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct PipelineSender {
    queue: Queue,
}
impl PipelineSender {
    /// Enqueue a notification. Never blocks on anything but the short queue lock.
    pub fn put(&self, notification: ChangeNotification) {
        lock(&self.queue).push_back(notification);
    }
}

pub struct PipelineReceiver {
    queue: Queue,
}
impl PipelineReceiver {
    /// Take everything queued so far, oldest first, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<ChangeNotification> {
        let drained = std::mem::take(&mut *lock(&self.queue));
        drained.into()
    }
    pub fn len(&self) -> usize {
        lock(&self.queue).len()
    }
    pub fn is_empty(&self) -> bool {
        lock(&self.queue).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{PropertyMap, Value};
    use proptest::prelude::*;

    fn numbered(i: u32) -> ChangeNotification {
        let mut changed = PropertyMap::new();
        changed.insert("Position".into(), Value::U32(i));
        ChangeNotification::new(crate::PLAYER_IFACE, changed)
    }

    fn index(n: &ChangeNotification) -> u32 {
        n.changed["Position"].as_u32().unwrap()
    }

    #[test]
    fn drain_on_empty_pipeline_is_empty() {
        let (_tx, rx) = pipeline();
        assert!(rx.drain_all().is_empty());
        assert!(rx.is_empty());
    }

    #[test]
    fn concurrent_producer_loses_nothing() {
        const COUNT: u32 = 10_000;
        let (tx, rx) = pipeline();
        let producer = std::thread::spawn(move || {
            for i in 0..COUNT {
                tx.put(numbered(i));
            }
        });
        let mut seen = Vec::with_capacity(COUNT as usize);
        while seen.len() < COUNT as usize {
            seen.extend(rx.drain_all().iter().map(index));
            std::thread::yield_now();
        }
        producer.join().unwrap();
        assert_eq!(seen, (0..COUNT).collect::<Vec<_>>());
        assert!(rx.is_empty());
    }

    proptest! {
        #[test]
        fn drain_preserves_submission_order(batches in prop::collection::vec(0usize..20, 0..10)) {
            let (tx, rx) = pipeline();
            let mut next = 0u32;
            for batch in batches {
                let start = next;
                for _ in 0..batch {
                    tx.put(numbered(next));
                    next += 1;
                }
                prop_assert_eq!(rx.len(), batch);
                let drained: Vec<u32> = rx.drain_all().iter().map(index).collect();
                prop_assert_eq!(drained, (start..next).collect::<Vec<_>>());
                prop_assert!(rx.is_empty());
            }
        }
    }
}

//! Property tests for the bounded queue.

use std::sync::Arc;
use std::thread;

use causal_clock::BoundedQueue;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fifo_when_everything_fits(items in prop::collection::vec(any::<u32>(), 0..32)) {
        let queue = BoundedQueue::new(items.len() + 2).unwrap();
        for &item in &items {
            queue.enqueue(item).unwrap();
        }
        let out: Vec<u32> = (0..items.len()).map(|_| queue.dequeue().unwrap()).collect();
        prop_assert_eq!(out, items);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn no_loss_or_duplication_through_a_small_ring(
        items in prop::collection::vec(any::<u64>(), 0..200),
        capacity in 2usize..6,
    ) {
        let queue = Arc::new(BoundedQueue::new(capacity).unwrap());
        let producer = {
            let queue = Arc::clone(&queue);
            let items = items.clone();
            thread::spawn(move || {
                for item in items {
                    queue.enqueue(item).unwrap();
                }
            })
        };
        let out: Vec<u64> = (0..items.len()).map(|_| queue.dequeue().unwrap()).collect();
        producer.join().unwrap();

        prop_assert_eq!(out, items);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn many_producers_keep_their_own_order(
        per_producer in 1usize..50,
        producers in 1usize..4,
        capacity in 2usize..5,
    ) {
        let queue = Arc::new(BoundedQueue::new(capacity).unwrap());
        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for seq in 0..per_producer {
                        queue.enqueue((p, seq)).unwrap();
                    }
                })
            })
            .collect();

        let out: Vec<(usize, usize)> = (0..producers * per_producer)
            .map(|_| queue.dequeue().unwrap())
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for p in 0..producers {
            let seqs: Vec<usize> = out.iter().filter(|(from, _)| *from == p).map(|(_, s)| *s).collect();
            prop_assert_eq!(seqs, (0..per_producer).collect::<Vec<_>>());
        }
        prop_assert!(queue.is_empty());
    }
}

use crate::SyncQueue;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use test_log::test;

#[test]
fn test_fifo_and_batches() {
    let q = SyncQueue::new();
    q.push_all(0..10);
    assert_eq!(q.len(), 10);
    assert_eq!(q.pop_batch(3), vec![0, 1, 2]);
    assert_eq!(q.pop(), Some(3));
    assert_eq!(q.drain_all(), vec![4, 5, 6, 7, 8, 9]);
    assert!(q.is_empty());
}

#[test]
fn test_push_capped() {
    let q = SyncQueue::new();
    assert!(q.push_capped(1, 2));
    assert!(q.push_capped(2, 2));
    assert!(!q.push_capped(3, 2));
    assert_eq!(q.len(), 2);
}

#[test]
fn test_wait_for_len_across_threads() {
    let q = Arc::new(SyncQueue::new());
    let producer = {
        let q = q.clone();
        thread::spawn(move || {
            for i in 0..5 {
                q.push(i);
                thread::sleep(Duration::from_millis(2));
            }
        })
    };
    let n = q.wait_for_len(5, Duration::from_secs(5));
    assert_eq!(n, 5);
    producer.join().unwrap();
}

#[test]
fn test_wait_for_times_out() {
    let q: SyncQueue<i32> = SyncQueue::new();
    assert_eq!(q.wait_for(1, Duration::from_millis(5)), 0);
}

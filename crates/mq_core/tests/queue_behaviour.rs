use mq_core::{BoundedMessageQueue, Interrupt, QueueError, WaitPolicy};
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(30);

#[test]
fn messages_come_out_in_enqueue_order() {
    let queue = BoundedMessageQueue::create(8, 16).unwrap();
    let messages: Vec<Vec<u8>> = (0..8).map(|i| format!("message-{i}").into_bytes()).collect();

    for m in &messages {
        queue.enqueue(m, WaitPolicy::Forever).unwrap();
    }
    for m in &messages {
        assert_eq!(&queue.dequeue(16, WaitPolicy::Forever).unwrap(), m);
    }
}

#[test]
fn oversized_payload_is_truncated_to_element_size() {
    let queue = BoundedMessageQueue::create(2, 4).unwrap();
    assert_eq!(queue.enqueue(b"abcdefg", WaitPolicy::Forever), Ok(4));
    assert_eq!(queue.dequeue(100, WaitPolicy::Forever).unwrap(), b"abcd");
}

#[test]
fn short_read_drops_the_remainder() {
    let queue = BoundedMessageQueue::create(4, 16).unwrap();
    queue.enqueue(b"0123456789", WaitPolicy::Forever).unwrap();
    queue.enqueue(b"next", WaitPolicy::Forever).unwrap();

    assert_eq!(queue.dequeue(7, WaitPolicy::Forever).unwrap(), b"0123456");
    assert_eq!(queue.dequeue(16, WaitPolicy::Forever).unwrap(), b"next");
    assert!(queue.snapshot().unwrap().pending.is_empty());
}

#[test]
fn full_queue_blocks_writer_until_a_read() {
    let queue = BoundedMessageQueue::create(3, 4).unwrap();
    for m in [b"a", b"b", b"c"] {
        queue.enqueue(m, WaitPolicy::Forever).unwrap();
    }

    thread::scope(|s| {
        let writer = s.spawn(|| queue.enqueue(b"d", WaitPolicy::Forever));
        thread::sleep(SETTLE);
        assert!(!writer.is_finished());
        // nothing undelivered was overwritten while the writer waited
        assert_eq!(queue.snapshot().unwrap().pending, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        assert_eq!(queue.dequeue(4, WaitPolicy::Forever).unwrap(), b"a");
        assert_eq!(writer.join().unwrap(), Ok(1));
    });

    for expected in [b"b", b"c", b"d"] {
        assert_eq!(queue.dequeue(4, WaitPolicy::Forever).unwrap(), expected);
    }
}

#[test]
fn two_slot_walkthrough() {
    let queue = BoundedMessageQueue::create(2, 4).unwrap();
    assert_eq!(queue.enqueue(b"ab", WaitPolicy::Forever), Ok(2));
    assert_eq!(queue.enqueue(b"cdef", WaitPolicy::Forever), Ok(4));

    thread::scope(|s| {
        let blocked = s.spawn(|| queue.enqueue(b"z", WaitPolicy::Forever));
        thread::sleep(SETTLE);
        assert!(!blocked.is_finished());

        assert_eq!(queue.dequeue(4, WaitPolicy::Forever).unwrap(), b"ab");
        assert_eq!(blocked.join().unwrap(), Ok(1));
    });

    assert_eq!(queue.dequeue(4, WaitPolicy::Forever).unwrap(), b"cdef");
    assert_eq!(queue.dequeue(4, WaitPolicy::Forever).unwrap(), b"z");
}

#[test]
fn interrupted_writer_leaves_no_trace() {
    let queue = BoundedMessageQueue::create(1, 4).unwrap();
    queue.enqueue(b"keep", WaitPolicy::Forever).unwrap();
    let before = queue.snapshot().unwrap();
    let interrupt = Interrupt::new();

    thread::scope(|s| {
        let writer = s.spawn(|| queue.enqueue(b"lost", WaitPolicy::Interruptible(&interrupt)));
        thread::sleep(SETTLE);
        interrupt.raise();
        assert_eq!(writer.join().unwrap(), Err(QueueError::Interrupted));
    });

    assert_eq!(queue.snapshot().unwrap(), before);
    interrupt.clear();
    assert_eq!(queue.dequeue(4, (&interrupt).into()).unwrap(), b"keep");
    assert_eq!(queue.enqueue(b"next", (&interrupt).into()), Ok(4));
}

#[test]
fn blocked_reader_wakes_on_enqueue() {
    let queue = BoundedMessageQueue::create(2, 8).unwrap();

    thread::scope(|s| {
        let reader = s.spawn(|| queue.dequeue(8, WaitPolicy::Forever));
        thread::sleep(SETTLE);
        assert!(!reader.is_finished());
        queue.enqueue(b"wake", WaitPolicy::Forever).unwrap();
        assert_eq!(reader.join().unwrap().unwrap(), b"wake");
    });
}

use anyhow::{Result, bail, ensure};
use mq_core::{BoundedMessageQueue, QueueConfig, WaitPolicy};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::info;

/// Pushes `messages` payloads of `payload` bytes through the queue and
/// reports the sustained rate.
///
/// Writers run on the rayon pool; readers are dedicated threads so a
/// writer parked on a full ring never starves the threads that drain it.
pub fn run_benchmark(
    config: &QueueConfig,
    messages: usize,
    payload: usize,
    readers: usize,
) -> Result<()> {
    ensure!(readers > 0, "need at least one reader");
    let queue = BoundedMessageQueue::with_config(config)?;
    let claimed = AtomicUsize::new(0);
    let body = vec![0xA5u8; payload];

    println!(
        "Slots: {}, Element size: {}, Payload: {} bytes",
        config.capacity, config.elem_size, payload
    );
    println!(
        "Starting Benchmark ({} messages, {} rayon writers, {} readers)...",
        messages,
        rayon::current_num_threads(),
        readers
    );

    info!(messages, payload, readers, "benchmark starting");
    let start = Instant::now();
    let (written, read) = thread::scope(|s| -> Result<(usize, usize)> {
        let queue = &queue;
        let claimed = &claimed;
        let reader_handles: Vec<_> = (0..readers)
            .map(|_| {
                s.spawn(move || -> Result<usize> {
                    let mut bytes = 0;
                    while claimed.fetch_add(1, Ordering::Relaxed) < messages {
                        bytes += queue.dequeue(config.elem_size, WaitPolicy::Forever)?.len();
                    }
                    Ok(bytes)
                })
            })
            .collect();

        let written = (0..messages)
            .into_par_iter()
            .map(|_| queue.enqueue(&body, WaitPolicy::Forever))
            .try_reduce(|| 0, |a, b| Ok(a + b))?;

        let mut read = 0;
        for handle in reader_handles {
            match handle.join() {
                Ok(bytes) => read += bytes?,
                Err(_) => bail!("reader thread panicked"),
            }
        }
        Ok((written, read))
    })?;

    let seconds = start.elapsed().as_secs_f64();
    ensure!(
        written == read,
        "byte mismatch: {} written, {} read",
        written,
        read
    );
    queue.destroy()?;

    println!("Results");
    println!("Time: {:.4} s", seconds);
    println!("Throughput: {:.2} msgs/s", messages as f64 / seconds);
    println!("Bandwidth: {:.2} MiB/s", read as f64 / seconds / (1024.0 * 1024.0));
    if payload > config.elem_size {
        println!(
            "Note: payloads truncated from {} to {} bytes",
            payload, config.elem_size
        );
    }
    Ok(())
}

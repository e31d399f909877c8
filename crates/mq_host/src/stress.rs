//! Multi-writer, multi-reader stress run with delivery verification.

use crate::stats::LatencyStats;
use anyhow::{Result, bail, ensure};
use mq_core::{BoundedMessageQueue, QueueConfig, WaitPolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::info;

/// Parses the "<writer>:<seq>" tag at the front of a message.
fn parse_tag(message: &[u8]) -> Option<(usize, usize)> {
    let text = std::str::from_utf8(message).ok()?;
    let mut parts = text.split(':');
    let writer = parts.next()?.parse().ok()?;
    let seq = parts.next()?.parse().ok()?;
    Some((writer, seq))
}

/// Runs `writers` producer threads and `readers` consumer threads against one
/// queue and checks that every message arrives exactly once.
///
/// Each reader sees messages from a given writer in increasing sequence
/// order, which follows from the queue's global FIFO delivery; the run fails
/// if that ever breaks.
///
/// # Arguments
///
/// * `config` - Queue geometry; the element size must hold a whole tag
/// * `writers` - Number of producer threads
/// * `readers` - Number of consumer threads
/// * `per_writer` - Messages sent by each producer
pub fn run_stress(
    config: &QueueConfig,
    writers: usize,
    readers: usize,
    per_writer: usize,
) -> Result<()> {
    ensure!(writers > 0 && readers > 0, "need at least one writer and one reader");
    let longest_tag = format!("{}:{}:", writers - 1, per_writer.saturating_sub(1)).len();
    ensure!(
        longest_tag <= config.elem_size,
        "element size {} cannot hold {}-byte message tags",
        config.elem_size,
        longest_tag
    );
    let queue = BoundedMessageQueue::with_config(config)?;
    let total = writers * per_writer;
    let claimed = AtomicUsize::new(0);

    println!("QUEUE STRESS");
    println!("Slots: {}, Element size: {}", config.capacity, config.elem_size);
    println!("Writers: {}, Readers: {}, Messages: {}", writers, readers, total);
    println!("-------------------------------");

    info!(writers, readers, total, "stress run starting");
    let start = Instant::now();
    let (write_stats, per_reader) = thread::scope(|s| -> Result<_> {
        let queue = &queue;
        let claimed = &claimed;
        let reader_handles: Vec<_> = (0..readers)
            .map(|_| {
                s.spawn(move || -> Result<(Vec<Vec<u8>>, LatencyStats)> {
                    let mut seen = Vec::new();
                    let mut stats = LatencyStats::new();
                    while claimed.fetch_add(1, Ordering::Relaxed) < total {
                        let t = Instant::now();
                        seen.push(queue.dequeue(config.elem_size, WaitPolicy::Forever)?);
                        stats.record(t.elapsed());
                    }
                    Ok((seen, stats))
                })
            })
            .collect();

        let writer_handles: Vec<_> = (0..writers)
            .map(|writer| {
                s.spawn(move || -> Result<LatencyStats> {
                    let mut stats = LatencyStats::new();
                    for seq in 0..per_writer {
                        let message = format!("{writer}:{seq}:").into_bytes();
                        let t = Instant::now();
                        queue.enqueue(&message, WaitPolicy::Forever)?;
                        stats.record(t.elapsed());
                    }
                    Ok(stats)
                })
            })
            .collect();

        let mut write_stats = LatencyStats::new();
        for handle in writer_handles {
            match handle.join() {
                Ok(stats) => write_stats.merge(&stats?),
                Err(_) => bail!("writer thread panicked"),
            }
        }
        let mut per_reader = Vec::with_capacity(readers);
        for handle in reader_handles {
            match handle.join() {
                Ok(result) => per_reader.push(result?),
                Err(_) => bail!("reader thread panicked"),
            }
        }
        Ok((write_stats, per_reader))
    })?;
    let elapsed = start.elapsed();
    info!(?elapsed, "all messages drained");

    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    let mut read_stats = LatencyStats::new();
    for (seen, stats) in &per_reader {
        read_stats.merge(stats);
        let mut last_seq: HashMap<usize, usize> = HashMap::new();
        for message in seen {
            let Some((writer, seq)) = parse_tag(message) else {
                bail!("corrupt message {:?}", String::from_utf8_lossy(message));
            };
            if let Some(prev) = last_seq.insert(writer, seq) {
                ensure!(prev < seq, "writer {writer}: {seq} delivered after {prev}");
            }
            *counts.entry((writer, seq)).or_default() += 1;
        }
    }

    ensure!(counts.len() == total, "lost {} messages", total - counts.len());
    if let Some(((writer, seq), n)) = counts.iter().find(|&(_, &n)| n != 1) {
        bail!("message {writer}:{seq} delivered {n} times");
    }

    let snap = queue.snapshot()?;
    ensure!(
        snap.free == config.capacity && snap.filled == 0,
        "queue accounting off after drain: free {}, filled {}",
        snap.free,
        snap.filled
    );
    queue.destroy()?;

    println!("Delivered {} messages exactly once in {:?}", total, elapsed);
    write_stats.print_report("Enqueue Latency (incl. blocking)");
    read_stats.print_report("Dequeue Latency (incl. blocking)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        assert_eq!(parse_tag(b"3:17:"), Some((3, 17)));
        assert_eq!(parse_tag(b"garbage"), None);
    }

    #[test]
    fn small_run_succeeds() {
        run_stress(&QueueConfig::new(3, 16), 3, 2, 50).unwrap();
    }

    #[test]
    fn truncating_geometry_is_reported() {
        assert!(run_stress(&QueueConfig::new(3, 2), 1, 1, 5).is_err());
    }
}

//! Scripted walk through the device interface.
//!
//! Fills a small queue, shows a writer blocking on the full ring, and drains
//! it again, printing every call and its result.

use anyhow::{Context, Result, ensure};
use mq_common::ioctl;
use mq_device::params::parse_params;
use mq_device::{MessageDevice, Session};
use std::thread;
use std::time::Duration;

fn write(session: &Session, data: &[u8]) -> Result<usize> {
    let written = session.write(data, data.len())?;
    println!(
        "write({:?}) -> {}",
        String::from_utf8_lossy(data),
        written
    );
    Ok(written)
}

fn read(session: &Session, count: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    let n = session.read(&mut buf, count)?;
    buf.truncate(n);
    println!("read({}) -> {:?}", count, String::from_utf8_lossy(&buf));
    Ok(buf)
}

pub fn run_demo(params: &str) -> Result<()> {
    let params = parse_params(params)?;
    println!("MESSAGE QUEUE DEMO");
    println!("Slots: {}", params.fifo_size);
    println!("Element size: {} bytes", params.fifo_elemsz);
    println!("-------------------------------");

    let device = MessageDevice::load(&params).context("Failed to load device")?;
    let writer = device.open();
    let reader = device.open();

    let elem_size = reader.ioctl(ioctl::GET_ELEMSZ)?;
    println!("ioctl(GET_ELEMSZ) -> {}", elem_size);
    let read_size = usize::try_from(elem_size)?;

    // Fill every slot, cycling through short and full-size messages.
    let fill: Vec<Vec<u8>> = (0..params.fifo_size)
        .map(|i| {
            let len = if i % 2 == 0 { 2 } else { params.fifo_elemsz };
            (0..len).map(|j| b'a' + ((i * 2 + j) % 26) as u8).collect()
        })
        .collect();
    for message in &fill {
        write(&writer, message)?;
    }

    let late = b"z".to_vec();
    let mut drained = thread::scope(|s| -> Result<Vec<Vec<u8>>> {
        let blocked = s.spawn(|| write(&writer, &late));
        thread::sleep(Duration::from_millis(100));
        println!(
            "write({:?}) blocked: {}",
            String::from_utf8_lossy(&late),
            !blocked.is_finished()
        );

        let first = read(&reader, read_size)?;
        blocked
            .join()
            .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
        Ok(vec![first])
    })?;

    for _ in 0..params.fifo_size {
        drained.push(read(&reader, read_size)?);
    }

    let mut expected = fill;
    expected.push(late);
    ensure!(drained == expected, "messages came back out of order");

    drop(writer);
    drop(reader);
    device.unload()?;
    println!("Done.");
    Ok(())
}

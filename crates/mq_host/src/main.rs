mod demo;
mod stats;
mod stress;
mod throughput;
mod trace;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mq_common::params::{DEFAULT_FIFO_ELEMSZ, DEFAULT_FIFO_SIZE};
use mq_core::QueueConfig;

#[derive(Parser)]
struct Cli {
    /// Log every enqueue and dequeue.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueueArgs {
    #[arg(long, default_value_t = DEFAULT_FIFO_SIZE)]
    capacity: usize,
    #[arg(long, default_value_t = DEFAULT_FIFO_ELEMSZ)]
    elem_size: usize,
}

impl QueueArgs {
    fn config(&self) -> QueueConfig {
        QueueConfig::new(self.capacity, self.elem_size)
    }
}

#[derive(Subcommand)]
enum Commands {
    Demo {
        #[arg(long, default_value = "fifo_size=2 fifo_elemsz=4")]
        params: String,
    },
    Stress {
        #[command(flatten)]
        queue: QueueArgs,
        #[arg(short, long, default_value_t = 4)]
        writers: usize,
        #[arg(short, long, default_value_t = 4)]
        readers: usize,
        #[arg(short, long, default_value_t = 10_000)]
        messages: usize,
    },
    Bench {
        #[command(flatten)]
        queue: QueueArgs,
        #[arg(short, long, default_value_t = 1_000_000)]
        messages: usize,
        #[arg(short, long, default_value_t = 64)]
        payload: usize,
        #[arg(short, long, default_value_t = 2)]
        readers: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    trace::init_tracing(cli.verbose);
    match cli.command {
        Commands::Demo { params } => {
            demo::run_demo(&params)?;
        }
        Commands::Stress {
            queue,
            writers,
            readers,
            messages,
        } => {
            stress::run_stress(&queue.config(), writers, readers, messages)?;
        }
        Commands::Bench {
            queue,
            messages,
            payload,
            readers,
        } => {
            throughput::run_benchmark(&queue.config(), messages, payload, readers)?;
        }
    }
    Ok(())
}

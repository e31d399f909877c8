use anyhow::{Context, Result, anyhow, bail};
use mq_common::params::{DEFAULT_FIFO_ELEMSZ, DEFAULT_FIFO_SIZE, FIFO_ELEMSZ, FIFO_SIZE};
use mq_core::QueueConfig;
use nom::IResult;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, digit1, multispace0, multispace1};
use nom::combinator::{all_consuming, map_res};
use nom::multi::separated_list0;
use nom::sequence::{delimited, separated_pair};

/// Queue geometry supplied when the device is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceParams {
    /// Number of slots (`fifo_size`).
    pub fifo_size: usize,

    /// Maximum payload bytes per message (`fifo_elemsz`).
    pub fifo_elemsz: usize,
}

impl Default for DeviceParams {
    fn default() -> Self {
        Self {
            fifo_size: DEFAULT_FIFO_SIZE,
            fifo_elemsz: DEFAULT_FIFO_ELEMSZ,
        }
    }
}

impl DeviceParams {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(self.fifo_size, self.fifo_elemsz)
    }
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn param(input: &str) -> IResult<&str, (&str, usize)> {
    separated_pair(name, char('='), map_res(digit1, str::parse::<usize>))(input)
}

fn param_list(input: &str) -> IResult<&str, Vec<(&str, usize)>> {
    delimited(multispace0, separated_list0(multispace1, param), multispace0)(input)
}

/// Parses a load-time parameter string.
///
/// Parameters that are not mentioned keep their defaults. Later occurrences
/// of the same name override earlier ones, as repeated module options do.
///
/// # Arguments
///
/// * `input` - Whitespace separated `name=value` pairs
///
/// # Returns
///
/// The parsed parameters, or an error naming the unknown parameter or the
/// malformed input.
pub fn parse_params(input: &str) -> Result<DeviceParams> {
    let (_, pairs) = all_consuming(param_list)(input)
        .map_err(|e| anyhow!("{e:?}"))
        .with_context(|| format!("Malformed device parameters: {input:?}"))?;

    let mut params = DeviceParams::default();
    for (key, value) in pairs {
        match key {
            FIFO_SIZE => params.fifo_size = value,
            FIFO_ELEMSZ => params.fifo_elemsz = value,
            other => bail!("Unknown device parameter {other:?}"),
        }
    }
    Ok(params)
}

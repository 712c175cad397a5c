use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use bridgewire_channel::{AsyncChannel, Inbound};
use bridgewire_transport::{pipe, MemoryReceiver, MemorySender};
use serde_json::Value;

use crate::cmd::{parse_duration, LoopbackArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_record, OutputFormat};

type Channel = AsyncChannel<MemorySender>;

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    let timeout = parse_duration(&args.timeout)?;

    let stats = run_loopback(args.count, args.size, timeout)?;
    print_record(
        &[
            ("count", Value::from(stats.count)),
            ("payload_size", Value::from(args.size)),
            ("min_us", Value::from(stats.min_us)),
            ("p50_us", Value::from(stats.p50_us)),
            ("p99_us", Value::from(stats.p99_us)),
            ("max_us", Value::from(stats.max_us)),
            ("mean_us", Value::from(stats.mean_us)),
            ("total_ms", Value::from(stats.total_ms)),
        ],
        format,
    );
    Ok(SUCCESS)
}

#[derive(Debug)]
struct Stats {
    count: usize,
    min_us: u64,
    p50_us: u64,
    p99_us: u64,
    max_us: u64,
    mean_us: u64,
    total_ms: u64,
}

fn run_loopback(count: usize, size: usize, timeout: Duration) -> CliResult<Stats> {
    let (host_tx, script_rx) = pipe();
    let (script_tx, host_rx) = pipe();
    let host = Arc::new(AsyncChannel::new(host_tx));
    let script = Arc::new(AsyncChannel::new(script_tx));

    let pumps = [
        spawn_pump("host", Arc::downgrade(&host), host_rx),
        spawn_pump("script", Arc::downgrade(&script), script_rx),
    ];

    let payload = vec![0xA5u8; size];
    let mut samples = Vec::with_capacity(count);
    let started = Instant::now();
    let outcome = (0..count).try_for_each(|_| {
        let sent = Instant::now();
        let reply = host
            .call(&payload, Some(timeout))
            .map_err(|err| channel_error("round-trip failed", err))?;
        if reply.len() != payload.len() {
            return Err(CliError::new(
                crate::exit::FAILURE,
                format!("echo returned {} bytes, sent {}", reply.len(), payload.len()),
            ));
        }
        samples.push(sent.elapsed());
        Ok(())
    });
    let total = started.elapsed();

    // Dropping both channels closes both pipes, which ends the pumps.
    drop(host);
    drop(script);
    for pump in pumps {
        let _ = pump.join();
    }

    outcome?;
    Ok(summarize(samples, total))
}

/// Route frames from `rx` into `channel`, echoing every peer request.
fn spawn_pump(side: &'static str, channel: Weak<Channel>, rx: MemoryReceiver) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for frame in rx.iter() {
            let Some(channel) = channel.upgrade() else {
                break;
            };
            match channel.handle_incoming(&frame) {
                Ok(Inbound::Request(msg)) => {
                    if let Err(err) = channel.respond(msg.id(), msg.payload()) {
                        tracing::warn!(side, id = msg.id(), error = %err, "echo failed");
                    }
                }
                Ok(Inbound::Discarded { id, kind }) => {
                    tracing::debug!(side, id, %kind, "late reply discarded");
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(side, error = %err, "dropping malformed frame"),
            }
        }
        tracing::trace!(side, "pump stopped");
    })
}

fn summarize(mut samples: Vec<Duration>, total: Duration) -> Stats {
    samples.sort_unstable();
    let micros = |d: &Duration| u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
    let percentile = |p: usize| {
        let idx = (samples.len() * p / 100).min(samples.len().saturating_sub(1));
        samples.get(idx).map(micros).unwrap_or(0)
    };
    let sum: u128 = samples.iter().map(Duration::as_micros).sum();
    let mean = sum.checked_div(samples.len() as u128).unwrap_or(0);

    Stats {
        count: samples.len(),
        min_us: samples.first().map(micros).unwrap_or(0),
        p50_us: percentile(50),
        p99_us: percentile(99),
        max_us: samples.last().map(micros).unwrap_or(0),
        mean_us: u64::try_from(mean).unwrap_or(u64::MAX),
        total_ms: u64::try_from(total.as_millis()).unwrap_or(u64::MAX),
    }
}

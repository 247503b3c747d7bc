//! # sysstack - Main Entry Point
//!
//! Loads the probe for one process, then drains the ring buffer until SIGINT or
//! SIGTERM, the `--duration` limit, or the target's exit. Each syscall is printed with
//! its symbolized user stack; `--export` also writes them as JSON lines.

use anyhow::{bail, Context, Result};
use aya::maps::{RingBuf, StackTraceMap};
use clap::Parser;
use log::{info, warn};
use std::time::{Duration, Instant};
use tokio::io::{unix::AsyncFd, Interest};

use sysstack::cli::Args;
use sysstack::consumer::{display_summary, BootClock, EventProcessor};
use sysstack::domain::Pid;
use sysstack::export::JsonLinesExporter;
use sysstack::preflight::{process_alive, run_preflight_checks};
use sysstack::probe::{load_and_attach, validate_target, ProbeOutcomes};
use sysstack::process_lookup::find_process_by_name;
use sysstack::signals::StopSignals;
use sysstack::symbolization::Symbolizer;
use sysstack_common::{SyscallEvent, EVENT_CHANNEL_BYTES};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

/// Upper bound on how long the loop waits before re-checking stop conditions
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Most records the final drain reads: one full ring of events with their
/// 8-byte kernel headers. The probe stays attached, so the ring keeps filling.
const FINAL_DRAIN_RECORDS: usize =
    EVENT_CHANNEL_BYTES as usize / (SyscallEvent::SIZE + RINGBUF_HEADER_BYTES);
const RINGBUF_HEADER_BYTES: usize = 8;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") || msg.contains("invalid target") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Resolve the target from `PROCESS` or `--pid`
fn resolve_pid(args: &Args) -> Result<Pid> {
    if let Some(ref name) = args.process {
        let process = find_process_by_name(name)?;
        info!("Found '{}' as PID {} ({})", name, process.pid.0, process.exe_path.display());
        return Ok(process.pid);
    }

    if let Some(pid) = args.pid {
        return Ok(validate_target(Pid(pid))?);
    }

    bail!(
        "Missing required argument: PROCESS or --pid\n\n\
         Usage:\n  \
         sysstack my-app              Find the process by name\n  \
         sysstack --pid 1234          Explicit PID\n\n\
         Run 'sysstack --help' for more options"
    )
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let pid = resolve_pid(&args)?;
    run_preflight_checks(pid)?;

    if !quiet {
        println!("sysstack v{}", env!("CARGO_PKG_VERSION"));
        println!("pid: {}", pid.0);
    }

    // Symbolize against the maps as they are before tracing starts
    let symbolizer = Symbolizer::for_process(pid).context("Failed to create symbolizer")?;

    let mut bpf = load_and_attach(pid)?;
    let ring_buf = RingBuf::try_from(bpf.take_map("EVENTS").context("EVENTS map not found")?)?;
    let stack_traces: StackTraceMap<_> = StackTraceMap::try_from(
        bpf.take_map("STACK_TRACES").context("STACK_TRACES map not found")?,
    )?;

    let exporter = args.export.as_deref().map(JsonLinesExporter::create).transpose()?;
    if !quiet {
        if let Some(ref export_path) = args.export {
            println!("export: {}", export_path.display());
        }
    }

    let mut processor = EventProcessor::new(symbolizer, BootClock::capture()?, exporter, quiet);
    let mut events = AsyncFd::with_interest(ring_buf, Interest::READABLE)?;

    let mut stop_signals = StopSignals::install().context("Failed to install signal handlers")?;

    let tracing_start = Instant::now();
    let duration_limit = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    let exit_reason;

    loop {
        if let Some(limit) = duration_limit {
            if tracing_start.elapsed() >= limit {
                exit_reason = "duration limit reached";
                break;
            }
        }

        if !process_alive(pid) {
            exit_reason = "process exited";
            break;
        }

        processor.refresh_symbols();

        tokio::select! {
            guard = events.readable_mut() => {
                let mut guard = guard?;
                processor.drain(guard.get_inner_mut(), &stack_traces, usize::MAX)?;
                guard.clear_ready();
            }
            () = tokio::time::sleep(POLL_INTERVAL) => {}
            stop = stop_signals.recv() => {
                exit_reason = stop.exit_reason();
                break;
            }
        }
    }

    // Records submitted after the last wakeup are still in the ring
    let late = processor.drain(events.get_mut(), &stack_traces, FINAL_DRAIN_RECORDS)?;
    if late > 0 {
        info!("Drained {late} records after stopping");
    }

    let outcomes = match ProbeOutcomes::read(&bpf) {
        Ok(outcomes) => Some(outcomes),
        Err(e) => {
            warn!("Failed to read probe counters: {e:#}");
            None
        }
    };
    display_summary(exit_reason, tracing_start.elapsed(), &processor.stats, outcomes.as_ref());

    if let (Some(written), Some(export_path)) = (processor.finish_export()?, args.export.as_ref()) {
        if !quiet {
            println!("saved: {} ({written} events)", export_path.display());
        }
    }

    Ok(())
}

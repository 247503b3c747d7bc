//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sysstack",
    about = "Print the user-space call stack behind every syscall of a process",
    after_help = "\
EXAMPLES:
    sudo sysstack my-app                      Find the process by name
    sudo sysstack --pid 1234                  Explicit PID
    sudo sysstack --pid 1234 --duration 10    Stop after 10 seconds
    sudo sysstack my-app --export out.jsonl   Also write events as JSON lines"
)]
pub struct Args {
    /// Process name to trace (looked up in /proc)
    #[arg(value_name = "PROCESS", conflicts_with = "pid")]
    pub process: Option<String>,

    /// Process ID to trace
    #[arg(short, long)]
    pub pid: Option<u32>,

    /// Write every event to FILE, one JSON object per line
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Do not print events, only the final summary
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_and_duration() {
        let args = Args::try_parse_from(["sysstack", "--pid", "1234", "--duration", "5"]).unwrap();
        assert_eq!(args.pid, Some(1234));
        assert_eq!(args.duration, 5);
        assert!(args.process.is_none());
    }

    #[test]
    fn test_process_name_conflicts_with_pid() {
        assert!(Args::try_parse_from(["sysstack", "node", "--pid", "1"]).is_err());
    }

    #[test]
    fn test_negative_pid_is_rejected() {
        assert!(Args::try_parse_from(["sysstack", "--pid", "-5"]).is_err());
    }
}

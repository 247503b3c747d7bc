use anyhow::{Context, Result};
use clap::Parser;
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Cross-compile the `sys_enter` probe
    BuildEbpf {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        #[arg(long)]
        release: bool,
    },
    /// Build the probe and the tracer, then run the tracer under sudo
    Run {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        /// Arguments passed through to sysstack
        #[arg(last = true)]
        run_args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildEbpf { target, release } => build_ebpf(&target, release)?,
        Cmd::Run { target, run_args } => run(&target, &run_args)?,
    }

    Ok(())
}

fn build_ebpf(target: &str, _release: bool) -> Result<()> {
    // Debug builds of the probe pull in formatting code the BPF linker rejects,
    // so the probe is always built with the release profile.
    let mut cmd = Command::new("cargo");
    cmd.arg("+nightly")
        .arg("build")
        .arg("--package")
        .arg("sysstack-ebpf")
        .arg("--target")
        .arg(target)
        .arg("-Z")
        .arg("build-std=core")
        .arg("--release");

    let status = cmd.status().context("Failed to build eBPF program")?;

    if !status.success() {
        anyhow::bail!("Failed to build eBPF program");
    }

    println!("✓ eBPF program built successfully");
    println!("  Target: {target}");
    println!("  Profile: release (always)");

    Ok(())
}

fn run(target: &str, run_args: &[String]) -> Result<()> {
    build_ebpf(target, true)?;

    let status = Command::new("cargo")
        .args(["build", "--release", "--package", "sysstack"])
        .status()
        .context("Failed to build sysstack")?;
    if !status.success() {
        anyhow::bail!("Failed to build sysstack");
    }

    // Loading eBPF programs needs root; keep RUST_LOG across sudo
    let status = Command::new("sudo")
        .arg("-E")
        .arg("target/release/sysstack")
        .args(run_args)
        .status()
        .context("Failed to run sysstack")?;

    if !status.success() {
        anyhow::bail!("sysstack exited with {status}");
    }

    Ok(())
}

use anyhow::{Context, Result};
use aya::maps::PerCpuArray;
use aya::Ebpf;
use std::fmt;
use sysstack_common::{OUTCOME_CHANNEL_FULL, OUTCOME_EMITTED, OUTCOME_STACK_FAILED};

/// Probe outcome counters, summed over all CPUs
///
/// Filter misses are not counted: for other processes the probe touches no
/// map beyond the target slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcomes {
    pub emitted: u64,
    pub stack_failed: u64,
    pub channel_full: u64,
}

impl ProbeOutcomes {
    /// Read `PROBE_OUTCOMES`
    ///
    /// # Errors
    /// Returns an error if the map is missing or a slot cannot be read
    pub fn read(bpf: &Ebpf) -> Result<Self> {
        let outcomes: PerCpuArray<_, u64> = PerCpuArray::try_from(
            bpf.map("PROBE_OUTCOMES").context("PROBE_OUTCOMES map not found")?,
        )?;

        let sum = |slot: u32| -> Result<u64> {
            let per_cpu = outcomes.get(&slot, 0)?;
            Ok(per_cpu.iter().sum())
        };

        Ok(Self {
            emitted: sum(OUTCOME_EMITTED)?,
            stack_failed: sum(OUTCOME_STACK_FAILED)?,
            channel_full: sum(OUTCOME_CHANNEL_FULL)?,
        })
    }

    /// Syscalls of the target that reached the capture step
    #[must_use]
    pub fn matched(&self) -> u64 {
        self.emitted + self.stack_failed + self.channel_full
    }
}

impl fmt::Display for ProbeOutcomes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "probe: {} matched, {} emitted, {} stack capture failed, {} channel full",
            self.matched(),
            self.emitted,
            self.stack_failed,
            self.channel_full
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_counter() {
        let outcomes = ProbeOutcomes { emitted: 10, stack_failed: 2, channel_full: 1 };
        assert_eq!(
            outcomes.to_string(),
            "probe: 13 matched, 10 emitted, 2 stack capture failed, 1 channel full"
        );
    }
}

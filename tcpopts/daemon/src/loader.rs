//! eBPF program loader
//!
//! Reads the compiled object, hands the XDP program to the kernel verifier,
//! and reads back the per-CPU statistics map.

use std::path::{Path, PathBuf};

use aya::{maps::PerCpuArray, programs::Xdp, Ebpf};
use aya_log::EbpfLogger;
use log::{info, warn};
use tcpopts_common::constants::{MAX_STATS, STATS_MAP_NAME};

use crate::{error::ProbeError, types::ParserStats};

/// eBPF object loader and owner
///
/// Dropping the loader unloads the program and closes any link it still owns.
pub struct ProgramLoader {
    ebpf: Ebpf,
    path: PathBuf,
}

impl ProgramLoader {
    /// Load the eBPF object at `path`
    ///
    /// Parses the ELF and creates its maps; programs are verified later by
    /// [`ProgramLoader::load_xdp`].
    ///
    /// # Arguments
    ///
    /// * `path` - Compiled object file (`--obj`)
    ///
    /// # Returns
    ///
    /// The loader, or `ProbeError::Load` if the file is missing or is not a
    /// usable eBPF object
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        info!("Loading eBPF object from: {:?}", path);

        let data = std::fs::read(path)
            .map_err(|e| ProbeError::load(path, "cannot read object file", e))?;
        let ebpf = Ebpf::load(&data)
            .map_err(|e| ProbeError::load(path, "invalid or incompatible object", e))?;

        info!("eBPF object loaded successfully");

        Ok(Self {
            ebpf,
            path: path.to_path_buf(),
        })
    }

    /// Forward kernel-side aya-log records to the `log` facade
    ///
    /// Non-fatal: objects built without the `trace-options` feature carry no
    /// log map.
    pub fn init_logger(&mut self) {
        if let Err(e) = EbpfLogger::init(&mut self.ebpf) {
            warn!("eBPF logger not initialized, kernel-side tracing will not be captured: {}", e);
        }
    }

    /// Verify and load the XDP program `name` into the kernel
    ///
    /// # Arguments
    ///
    /// * `name` - Program section name (`--program`)
    ///
    /// # Returns
    ///
    /// The loaded program, ready to attach; the verifier diagnostic is kept
    /// as the source of `ProbeError::Load` on rejection
    pub fn load_xdp(&mut self, name: &str) -> Result<&mut Xdp, ProbeError> {
        info!("Loading XDP program {}...", name);

        let path = self.path.clone();
        let program = self.xdp_mut(name)?;
        program
            .load()
            .map_err(|e| ProbeError::load(path, format!("kernel rejected program `{name}`"), e))?;

        info!("  ✓ {} passed the verifier", name);

        Ok(program)
    }

    /// Already loaded XDP program `name`
    pub fn xdp_mut(&mut self, name: &str) -> Result<&mut Xdp, ProbeError> {
        let path = &self.path;
        let program = self.ebpf.program_mut(name).ok_or_else(|| {
            ProbeError::load(
                path,
                format!("program `{name}` not found in object"),
                "missing program section",
            )
        })?;

        program
            .try_into()
            .map_err(|e| ProbeError::load(path, format!("program `{name}` is not an XDP program"), e))
    }

    /// Sum the per-CPU parser counters
    ///
    /// # Returns
    ///
    /// Totals across all CPUs, or `ProbeError::Stats` if the map is missing
    /// or unreadable
    pub fn read_stats(&self) -> Result<ParserStats, ProbeError> {
        let map = self
            .ebpf
            .map(STATS_MAP_NAME)
            .ok_or_else(|| ProbeError::Stats(format!("{STATS_MAP_NAME} map not found in eBPF object")))?;
        let stats: PerCpuArray<_, u64> =
            PerCpuArray::try_from(map).map_err(|e| ProbeError::Stats(e.to_string()))?;

        let mut totals = [0u64; MAX_STATS as usize];
        for (index, total) in totals.iter_mut().enumerate() {
            let per_cpu = stats
                .get(&(index as u32), 0)
                .map_err(|e| ProbeError::Stats(e.to_string()))?;
            *total = per_cpu.iter().sum();
        }

        Ok(ParserStats::from_counters(&totals))
    }
}

use log::{debug, info};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use super::elf_symbols::{ElfSymbols, SourceLocation};
use super::memory_maps::{read_memory_maps, MemoryRegion};
use super::perf_map::{PerfMap, RELOAD_INTERVAL};
use crate::domain::{Pid, TracerError};

/// What an address resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// Function from the process's JIT perf map
    Jit { name: String },
    /// Function found in a mapped ELF file
    Native { function: String, location: Option<SourceLocation>, object: String },
    /// Address inside a mapping with no symbol for it
    Unnamed { addr: u64, object: String },
    /// Address outside every known mapping
    Unknown { addr: u64 },
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jit { name } => write!(f, "[JIT] {name}"),
            Self::Native { function, location: Some(loc), .. } => match loc.line {
                Some(line) => write!(f, "{function} ({}:{line})", loc.file),
                None => write!(f, "{function} ({})", loc.file),
            },
            Self::Native { function, location: None, object } => write!(f, "{function} ({object})"),
            Self::Unnamed { addr, object } => write!(f, "0x{addr:x} [{object}]"),
            Self::Unknown { addr } => write!(f, "0x{addr:x} [unknown]"),
        }
    }
}

/// Resolves user-space addresses of one process
///
/// Lookup order: JIT perf map, then the ELF file backing the address. Parsed
/// ELF files and resolved addresses are cached; a file that fails to parse is
/// remembered as having no symbols.
pub struct Symbolizer {
    regions: Vec<MemoryRegion>,
    jit: PerfMap,
    objects: RefCell<HashMap<PathBuf, Option<Rc<ElfSymbols>>>>,
    cache: RefCell<HashMap<u64, Symbol>>,
}

impl Symbolizer {
    /// Symbolizer for a running process
    ///
    /// # Errors
    /// Returns an error if `/proc/<pid>/maps` cannot be read
    pub fn for_process(pid: Pid) -> Result<Self, TracerError> {
        let regions = read_memory_maps(pid)?;
        info!("Loaded {} memory regions for {pid}", regions.len());
        Ok(Self::new(regions, PerfMap::for_process(pid)))
    }

    /// Symbolizer over known regions and JIT map
    #[must_use]
    pub fn new(regions: Vec<MemoryRegion>, mut jit: PerfMap) -> Self {
        jit.reload();
        Self {
            regions,
            jit,
            objects: RefCell::new(HashMap::new()),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Re-read the JIT map if it is older than the reload interval
    ///
    /// Cached results are dropped on reload, since unknown addresses may now
    /// belong to freshly compiled functions.
    pub fn refresh_jit(&mut self) {
        if self.jit.reload_if_stale(RELOAD_INTERVAL) {
            debug!("Reloaded {} JIT symbols", self.jit.len());
            self.cache.get_mut().clear();
        }
    }

    /// Resolve an instruction pointer
    pub fn resolve(&self, addr: u64) -> Symbol {
        if let Some(cached) = self.cache.borrow().get(&addr) {
            return cached.clone();
        }

        let symbol = self.resolve_uncached(addr);
        self.cache.borrow_mut().insert(addr, symbol.clone());
        symbol
    }

    /// Resolve a whole stack, stopping at the first zero address
    pub fn resolve_stack(&self, frames: &[u64]) -> Vec<Symbol> {
        frames.iter().take_while(|&&ip| ip != 0).map(|&ip| self.resolve(ip)).collect()
    }

    fn resolve_uncached(&self, addr: u64) -> Symbol {
        if let Some(jit) = self.jit.lookup(addr) {
            return Symbol::Jit { name: jit.name.clone() };
        }

        let Some(region) = self.regions.iter().find(|r| r.contains(addr)) else {
            return Symbol::Unknown { addr };
        };
        let object = region.object_name();

        let found = self.object_symbols(region).and_then(|elf| {
            let address = elf.file_offset_to_address(region.file_offset(addr));
            elf.resolve(address)
        });

        match found {
            Some(info) => Symbol::Native { function: info.function, location: info.location, object },
            None => Symbol::Unnamed { addr, object },
        }
    }

    fn object_symbols(&self, region: &MemoryRegion) -> Option<Rc<ElfSymbols>> {
        if !region.is_file_backed() {
            return None;
        }

        self.objects
            .borrow_mut()
            .entry(region.path.clone())
            .or_insert_with(|| match ElfSymbols::load(&region.path) {
                Ok(elf) => Some(Rc::new(elf)),
                Err(e) => {
                    debug!("No symbols for {}: {e:#}", region.path.display());
                    None
                }
            })
            .clone()
    }
}

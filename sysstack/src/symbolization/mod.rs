//! # Symbol Resolution and Address Translation
//!
//! Converts the raw instruction pointers stored in `STACK_TRACES` into
//! function names. The target can be any user-space program: a native binary
//! with shared libraries, or a JIT runtime such as Node.js.
//!
//! ## Address Translation Flow
//!
//! ```text
//! 1. Stack map entry
//!    [0x7f8a9b0291a0, 0x55d4c6b31f00, 0x3fbd8a1010, 0, 0, ...]
//!
//! 2. JIT perf map (/tmp/perf-<pid>.map)
//!    0x3fbd8a1000 +0x250 LazyCompile:*app.get  →  [JIT] LazyCompile:*app.get
//!
//! 3. /proc/<pid>/maps region containing the address
//!    7f8a9b000000-7f8a9b200000 r-xp 00028000 ... /usr/lib/libc.so.6
//!    file offset = addr - start + offset
//!
//! 4. ELF segments: file offset → virtual address
//!
//! 5. DWARF (addr2line), then .symtab/.dynsym, demangled
//!    →  __write (libc.so.6)
//! ```
//!
//! ## Module Structure
//!
//! - **`memory_maps`**: `/proc/<pid>/maps` parsing
//! - **`perf_map`**: JIT symbol files, throttled reload
//! - **`elf_symbols`**: per-file DWARF and symbol-table lookup
//! - **`symbolizer`**: process-level resolution with caches
//!
//! ## Limitations
//!
//! - Memory maps are read once at startup; libraries loaded later show as
//!   `[unknown]`
//! - Only Rust mangling is demangled; C++ names are shown mangled

pub mod elf_symbols;
pub mod memory_maps;
pub mod perf_map;
pub mod symbolizer;

pub use memory_maps::{parse_memory_maps, read_memory_maps, MemoryRegion};
pub use perf_map::PerfMap;
pub use symbolizer::{Symbol, Symbolizer};

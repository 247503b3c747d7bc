use addr2line::Context;
use anyhow::{Context as _, Result};
use gimli::{EndianRcSlice, RunTimeEndian};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, SymbolKind};
use cpp_demangle::DemangleOptions;
use rustc_demangle::try_demangle;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Symbol information for one ELF file: DWARF first, symbol tables second
pub struct ElfSymbols {
    ctx: Context<EndianRcSlice<RunTimeEndian>>,
    /// Text symbols from `.symtab` and `.dynsym`, sorted by address
    symbols: Vec<ElfSymbol>,
    /// Loadable segments as (file offset, file size, virtual address)
    segments: Vec<(u64, u64, u64)>,
}

#[derive(Debug, Clone)]
struct ElfSymbol {
    address: u64,
    size: u64,
    name: String,
}

/// A function found for a file address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub function: String,
    pub location: Option<SourceLocation>,
}

/// Source code location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<u32>,
}

impl ElfSymbols {
    /// Parse an ELF file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid object file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        let obj = object::File::parse(&*data).context("Failed to parse object file")?;

        let endian = if obj.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        // Missing sections load as empty; a stripped binary yields an empty context
        let load_section =
            |id: gimli::SectionId| -> Result<EndianRcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianRcSlice::new(Rc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf).context("Failed to load DWARF debug information")?;

        let mut symbols: Vec<ElfSymbol> = obj
            .symbols()
            .chain(obj.dynamic_symbols())
            .filter(|sym| sym.kind() == SymbolKind::Text && sym.size() > 0)
            .filter_map(|sym| {
                let name = sym.name().ok()?;
                Some(ElfSymbol { address: sym.address(), size: sym.size(), name: name.to_string() })
            })
            .collect();
        symbols.sort_by_key(|s| s.address);
        symbols.dedup_by_key(|s| s.address);

        let segments = obj
            .segments()
            .map(|seg| {
                let (offset, size) = seg.file_range();
                (offset, size, seg.address())
            })
            .collect();

        Ok(Self { ctx, symbols, segments })
    }

    /// Translate a file offset into the virtual address used by DWARF and symbols
    ///
    /// Offsets outside every loadable segment are returned unchanged.
    #[must_use]
    pub fn file_offset_to_address(&self, offset: u64) -> u64 {
        self.segments
            .iter()
            .find(|(start, size, _)| offset >= *start && offset < start + size)
            .map_or(offset, |(start, _, vaddr)| vaddr + (offset - start))
    }

    /// Resolve a virtual address to the innermost function containing it
    #[must_use]
    pub fn resolve(&self, address: u64) -> Option<FunctionInfo> {
        self.resolve_dwarf(address).or_else(|| self.resolve_symbol(address))
    }

    fn resolve_dwarf(&self, address: u64) -> Option<FunctionInfo> {
        let mut frames = self.ctx.find_frames(address).skip_all_loads().ok()?;
        // First frame is the innermost (possibly inlined) function
        let frame = frames.next().ok()??;
        let function = frame.function.and_then(|f| f.demangle().ok().map(|s| s.to_string()))?;
        let location = frame.location.and_then(|loc| {
            loc.file.map(|file| SourceLocation { file: file.to_string(), line: loc.line })
        });
        Some(FunctionInfo { function, location })
    }

    fn resolve_symbol(&self, address: u64) -> Option<FunctionInfo> {
        let idx = self.symbols.partition_point(|s| s.address <= address);
        let sym = self.symbols.get(idx.checked_sub(1)?)?;
        (address < sym.address + sym.size).then(|| FunctionInfo {
            function: demangle_symbol(&sym.name),
            location: None,
        })
    }
}

/// Demangle a Rust or C++ (Itanium) symbol name; other names pass through
///
/// C++ names are rendered without parameter lists.
#[must_use]
pub fn demangle_symbol(symbol: &str) -> String {
    if let Ok(rust) = try_demangle(symbol) {
        return format!("{rust:#}");
    }
    if symbol.starts_with("_Z") {
        if let Some(cpp) = demangle_cpp(symbol) {
            return cpp;
        }
    }
    symbol.to_string()
}

fn demangle_cpp(symbol: &str) -> Option<String> {
    let parsed = cpp_demangle::Symbol::new(symbol).ok()?;
    parsed.demangle(&DemangleOptions::new().no_params()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demangle_rust_symbol() {
        assert_eq!(
            demangle_symbol("_ZN4core3ptr13drop_in_place17h0123456789abcdefE"),
            "core::ptr::drop_in_place"
        );
    }

    #[test]
    fn test_demangle_cpp_symbol_without_params() {
        assert_eq!(demangle_symbol("_ZN4node5StartEiPPc"), "node::Start");
        assert_eq!(
            demangle_symbol("_ZN2v88internal7Isolate4InitEv"),
            "v8::internal::Isolate::Init"
        );
    }

    #[test]
    fn test_demangle_leaves_malformed_mangling() {
        assert_eq!(demangle_symbol("_Z999x"), "_Z999x");
    }

    #[test]
    fn test_demangle_passes_c_names_through() {
        assert_eq!(demangle_symbol("__open64"), "__open64");
    }

    #[test]
    fn test_load_rejects_non_elf() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not an object file").unwrap();
        assert!(ElfSymbols::load(file.path()).is_err());
    }

    #[test]
    fn test_load_own_executable() {
        let exe = std::env::current_exe().unwrap();
        let symbols = ElfSymbols::load(&exe).expect("test binary parses");
        assert!(!symbols.segments.is_empty());
    }
}

//! Memory interface files: `memory.stat`, `memory.current` and `memory.max`.

use std::io::BufRead;

use crate::info::{MEMORY_LIMIT_UNSET, MemoryStats};

use super::StatParseError;
use super::parser::{KeyedStat, read_single_value};

impl KeyedStat for MemoryStats {
    const NESTED: bool = false;
    const KEYS: &'static [&'static str] = &["anon", "file"];

    fn apply(&mut self, key: &str, value: u64) {
        match key {
            "anon" => self.anon_bytes = value,
            "file" => self.file_bytes = value,
            _ => {}
        }
    }
}

/// Parses `memory.current`; an empty file reads as zero.
pub fn parse_memory_current<R: BufRead>(buf: &mut R) -> Result<u64, StatParseError> {
    Ok(read_single_value(buf)?.unwrap_or(0))
}

/// Parses `memory.max`, mapping `max` to [`MEMORY_LIMIT_UNSET`].
pub fn parse_memory_max<R: BufRead>(buf: &mut R) -> Result<u64, StatParseError> {
    Ok(read_single_value(buf)?.unwrap_or(MEMORY_LIMIT_UNSET))
}

//! CPU interface files: `cpu.stat` and `cpu.max`.

use std::io::BufRead;

use crate::info::{CpuSpec, CpuStats};

use super::StatParseError;
use super::parser::{KeyedStat, parse_value};

impl KeyedStat for CpuStats {
    const NESTED: bool = false;
    const KEYS: &'static [&'static str] = &["usage_usec", "user_usec", "system_usec"];

    fn apply(&mut self, key: &str, value: u64) {
        match key {
            "usage_usec" => self.usage_usec = value,
            "user_usec" => self.user_usec = value,
            "system_usec" => self.system_usec = value,
            _ => {}
        }
    }
}

/// Parses `cpu.max`, formatted as `<quota|max> [<period>]`.
///
/// # Errors
///
/// Returns [`StatParseError::InvalidValue`] if the quota or period is malformed.
pub fn parse_cpu_max<R: BufRead>(buf: &mut R) -> Result<CpuSpec, StatParseError> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    let mut fields = line.split_whitespace();

    let mut spec = CpuSpec::default();
    if let Some(quota) = fields.next() {
        spec.quota = parse_value(quota, 1)?;
    }
    if let Some(period) = fields.next().map(|p| parse_value(p, 1)).transpose()?.flatten() {
        spec.period = period;
    }
    Ok(spec)
}

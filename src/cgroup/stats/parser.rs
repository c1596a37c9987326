//! Generic readers for the cgroup v2 interface file formats.
//!
//! - Flat keyed files (`cpu.stat`, `memory.stat`): one `key value` pair per line.
//! - Nested keyed files (`io.stat`): `<device> key=value key=value ...` per line.
//! - Single value files (`memory.current`, `memory.max`): one number or `max`.

use std::collections::HashSet;
use std::io::BufRead;

use super::StatParseError;

/// A statistic read from a flat or nested keyed cgroup file.
///
/// Only keys listed in [`KEYS`](KeyedStat::KEYS) are parsed; everything else is
/// skipped without looking at its value.
pub trait KeyedStat: Default {
    /// `true` for nested keyed files, where values of all lines are accumulated.
    const NESTED: bool;

    /// Keys this statistic consumes.
    const KEYS: &'static [&'static str];

    /// Applies the value of a key from [`KEYS`](KeyedStat::KEYS).
    fn apply(&mut self, key: &str, value: u64);

    /// Parses a keyed cgroup file.
    ///
    /// # Errors
    ///
    /// Returns [`StatParseError::InvalidKeyValue`] if a known key has a non-numeric
    /// value and [`StatParseError::DuplicateField`] if a flat file repeats a known key.
    fn from_reader<R: BufRead>(buf: &mut R) -> Result<Self, StatParseError> {
        let mut stat = Self::default();
        let mut seen = HashSet::with_capacity(Self::KEYS.len());
        let mut line = String::new();
        let mut lineno = 0;

        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut fields = line.split_whitespace();
            if Self::NESTED {
                // Skip the device identifier.
                fields.next();
                for (key, value) in fields.filter_map(|pair| pair.split_once('=')) {
                    stat.apply_known(key, value, lineno)?;
                }
            } else if let (Some(key), Some(value)) = (fields.next(), fields.next()) {
                if stat.apply_known(key, value, lineno)? && !seen.insert(key.to_owned()) {
                    return Err(StatParseError::DuplicateField {
                        field: key.to_owned(),
                        line: lineno,
                    });
                }
            }
            line.clear();
        }

        Ok(stat)
    }

    /// Parses and applies `value` if `key` is known. Returns whether it was.
    fn apply_known(&mut self, key: &str, value: &str, line: usize) -> Result<bool, StatParseError> {
        if !Self::KEYS.iter().any(|known| *known == key) {
            return Ok(false);
        }
        let parsed = value
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_owned(),
                value: value.to_owned(),
                line,
                source,
            })?;
        self.apply(key, parsed);
        Ok(true)
    }
}

/// Reads a single value file. Returns `None` for `max` or an empty file.
///
/// # Errors
///
/// Returns [`StatParseError::InvalidValue`] if the value is neither `max` nor a number.
pub fn read_single_value<R: BufRead>(buf: &mut R) -> Result<Option<u64>, StatParseError> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    parse_value(line.trim(), 1)
}

/// Parses a number or the keyword `max` at `line`.
pub(super) fn parse_value(value: &str, line: usize) -> Result<Option<u64>, StatParseError> {
    match value {
        "" | "max" => Ok(None),
        value => value
            .parse::<u64>()
            .map(Some)
            .map_err(|source| StatParseError::InvalidValue {
                value: value.to_owned(),
                line,
                source,
            }),
    }
}

//! Block I/O interface file `io.stat`, summed over all devices.

use crate::info::IoStats;

use super::parser::KeyedStat;

impl KeyedStat for IoStats {
    const NESTED: bool = true;
    const KEYS: &'static [&'static str] = &["rbytes", "wbytes", "rios", "wios"];

    fn apply(&mut self, key: &str, value: u64) {
        match key {
            "rbytes" => self.read_bytes += value,
            "wbytes" => self.write_bytes += value,
            "rios" => self.read_ios += value,
            "wios" => self.write_ios += value,
            _ => {}
        }
    }
}

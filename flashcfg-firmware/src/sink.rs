//! Line-buffered text sink over defmt
//!
//! Lets `core::fmt::Write` producers such as the config dump print
//! through defmt, one log line per text line.

use core::fmt;
use defmt::*;
use heapless::String;

/// Longest line emitted in one piece; longer lines are split
const LINE_LEN: usize = 96;

/// `fmt::Write` adapter that logs each completed line with `info!`
pub struct DefmtLines {
    line: String<LINE_LEN>,
}

impl DefmtLines {
    pub fn new() -> Self {
        Self {
            line: String::new(),
        }
    }

    /// Emit a pending partial line
    pub fn flush(&mut self) {
        if !self.line.is_empty() {
            info!("{}", self.line.as_str());
            self.line.clear();
        }
    }
}

impl Default for DefmtLines {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for DefmtLines {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if c == '\n' {
                info!("{}", self.line.as_str());
                self.line.clear();
                continue;
            }
            if self.line.push(c).is_err() {
                self.flush();
                // Cannot fail: the line was just emptied
                let _ = self.line.push(c);
            }
        }
        Ok(())
    }
}

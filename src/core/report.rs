//! Human-readable output lines.

use std::fmt::Display;
use std::io::{self, Write};

use crate::core::record::{ThreadRecord, ThreadSink};

/// Default minimum number of hex digits of a printed affinity mask.
pub const DEFAULT_MASK_WIDTH: usize = 8;

/// Writes the scan report to an output stream, one line per event.
pub struct Report<W> {
    out: W,
    mask_width: usize,
    show_cpus: bool,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mask_width: DEFAULT_MASK_WIDTH,
            show_cpus: false,
        }
    }

    pub fn mask_width(mut self, width: usize) -> Self {
        self.mask_width = width;
        self
    }

    pub fn show_cpus(mut self, show: bool) -> Self {
        self.show_cpus = show;
        self
    }

    pub fn usage(&mut self, program: &str) -> io::Result<()> {
        writeln!(self.out, "Please specify PID to scan (usage: {program} <pid>)")
    }

    pub fn missing_capability(&mut self, symbol: &str) -> io::Result<()> {
        writeln!(self.out, "Missing {symbol} function")
    }

    pub fn header(&mut self, pid: u32) -> io::Result<()> {
        writeln!(self.out, "Listing threads in PID {pid}")
    }

    pub fn failure(&mut self, pid: u32, err: &dyn Display) -> io::Result<()> {
        writeln!(self.out, "could not list threads for PID {pid}: {err}")
    }

    pub fn thread(&mut self, record: &ThreadRecord) -> io::Result<()> {
        write!(
            self.out,
            "    - thread id {:08} - priority {:02} (delta {:02}) - ",
            record.thread_id, record.base_priority, record.priority_delta
        )?;

        match record.affinity {
            Some(mask) => {
                write!(self.out, "affinity 0x{}", mask.to_hex(self.mask_width))?;
                if self.show_cpus {
                    write!(self.out, " (cpus {})", mask.cpu_list())?;
                }
                writeln!(self.out)
            }
            None => writeln!(self.out, "affinity unavailable"),
        }
    }

    pub fn summary(&mut self, pid: u32, count: usize) -> io::Result<()> {
        writeln!(self.out, "Found {count} threads in PID {pid}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ThreadSink for Report<W> {
    fn emit(&mut self, record: ThreadRecord) -> io::Result<()> {
        self.thread(&record)
    }

    fn finish(&mut self, pid: u32, count: usize) -> io::Result<()> {
        self.summary(pid, count)?;
        self.flush()
    }
}

// src/system/tailer.rs

//! Polling log tailer. No filesystem notifications: the file is re-read at a
//! fixed interval and every newly completed line is forwarded to a sink.
//! Delivery is best-effort; lines truncated away between polls are gone, so
//! callers stop the tailer before any writer truncates the same path.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Where tailed lines go.
pub trait LineSink {
    fn push_line(&mut self, line: &str);
}

/// Prints each line to stdout while keeping a bounded scrollback, so a
/// long-following session holds a fixed amount of memory.
#[derive(Debug)]
pub struct ConsoleSink {
    scrollback: BoundedLineBuffer,
}

impl ConsoleSink {
    pub fn new(scrollback_lines: usize) -> Self {
        Self {
            scrollback: BoundedLineBuffer::new(scrollback_lines),
        }
    }

    pub fn scrollback(&self) -> &BoundedLineBuffer {
        &self.scrollback
    }
}

impl LineSink for ConsoleSink {
    fn push_line(&mut self, line: &str) {
        println!("{line}");
        self.scrollback.push_line(line);
    }
}

/// Keeps the newest `capacity` lines, evicting the oldest, so a long-running
/// session cannot grow without bound.
#[derive(Debug)]
pub struct BoundedLineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl BoundedLineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

impl LineSink for BoundedLineBuffer {
    fn push_line(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }
}

/// Follows `path` until `keep_running` clears, polling at `poll_interval`
/// and forwarding each complete line to `sink`. A missing file is tolerated
/// (the producer may not have opened it yet). After the flag clears, one
/// final drain picks up anything written before the producer exited.
pub fn tail(
    path: &Path,
    sink: &mut dyn LineSink,
    keep_running: &Arc<AtomicBool>,
    poll_interval: Duration,
) -> std::io::Result<()> {
    let mut offset: u64 = 0;
    let mut pending = String::new();

    loop {
        let active = keep_running.load(Ordering::SeqCst);
        drain_new_lines(path, &mut offset, &mut pending, sink)?;
        if !active {
            break;
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

fn drain_new_lines(
    path: &Path,
    offset: &mut u64,
    pending: &mut String,
    sink: &mut dyn LineSink,
) -> std::io::Result<()> {
    let Ok(mut file) = File::open(path) else {
        // Not created yet; keep polling.
        return Ok(());
    };
    let len = file.metadata()?.len();
    if len < *offset {
        // The file was truncated behind our back; earlier content is not
        // recoverable. Restart from the top.
        *offset = 0;
        pending.clear();
    }
    if len == *offset {
        return Ok(());
    }

    file.seek(SeekFrom::Start(*offset))?;
    let mut chunk = String::new();
    file.read_to_string(&mut chunk)?;
    *offset = file.stream_position()?;
    pending.push_str(&chunk);

    while let Some(newline) = pending.find('\n') {
        let line: String = pending.drain(..=newline).collect();
        sink.push_line(line.trim_end_matches(['\n', '\r']));
    }
    Ok(())
}

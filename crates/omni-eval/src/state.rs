//! Shared process-wide state used by intrinsics: the stdin reader,
//! file-handle table, testing registry, log level, and CLI arguments.
//! Everything here is guarded by mutual exclusion so concurrent async tasks
//! spawned for `_async` intrinsics and promise-returning calls never race.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Stdin, Write};
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;

/// First handle given out by `std.file.open`.
const FIRST_FILE_HANDLE: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn parse(name: &str) -> Option<LogLevel> {
        match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" | "ERR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn from_u8(v: u8) -> LogLevel {
        match v {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// A single open file, keyed by handle in [`FileTable`].
pub struct OpenFile {
    pub file: File,
    pub path: String,
}

/// The process-wide file-handle table. Handles are small integers handed
/// out monotonically starting at 3; closed handles are rejected, not
/// recycled.
pub struct FileTable {
    next_handle: AtomicI64,
    open: Mutex<HashMap<i64, OpenFile>>,
}

impl FileTable {
    pub fn new() -> Self {
        FileTable {
            next_handle: AtomicI64::new(FIRST_FILE_HANDLE),
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, path: &str, mode: &str) -> std::io::Result<i64> {
        let mode = mode.trim_end_matches('b');
        let mut opts = OpenOptions::new();
        match mode {
            "r" => {
                opts.read(true);
            }
            "r+" => {
                opts.read(true).write(true);
            }
            "w" => {
                opts.write(true).create(true).truncate(true);
            }
            "w+" => {
                opts.read(true).write(true).create(true).truncate(true);
            }
            "a" => {
                opts.append(true).create(true);
            }
            "a+" => {
                opts.read(true).append(true).create(true);
            }
            _ => return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown mode")),
        }
        let file = opts.open(path)?;
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.open.lock().expect("file table poisoned").insert(
            handle,
            OpenFile {
                file,
                path: path.to_string(),
            },
        );
        Ok(handle)
    }

    pub fn close(&self, handle: i64) -> bool {
        self.open.lock().expect("file table poisoned").remove(&handle).is_some()
    }

    pub fn read(&self, handle: i64, size: usize) -> std::io::Result<Vec<u8>> {
        let mut guard = self.open.lock().expect("file table poisoned");
        let entry = guard
            .get_mut(&handle)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "bad handle"))?;
        let mut buf = vec![0u8; size];
        let n = entry.file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    pub fn write(&self, handle: i64, data: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.open.lock().expect("file table poisoned");
        let entry = guard
            .get_mut(&handle)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "bad handle"))?;
        entry.file.write_all(data)?;
        Ok(data.len())
    }

    pub fn seek(&self, handle: i64, offset: i64, whence: i64) -> std::io::Result<u64> {
        let mut guard = self.open.lock().expect("file table poisoned");
        let entry = guard
            .get_mut(&handle)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "bad handle"))?;
        let pos = match whence {
            0 => SeekFrom::Start(offset as u64),
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            _ => return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad whence")),
        };
        entry.file.seek(pos)
    }

    pub fn tell(&self, handle: i64) -> std::io::Result<u64> {
        self.seek(handle, 0, 1)
    }

    pub fn exists(&self, handle: i64) -> bool {
        self.open.lock().expect("file table poisoned").contains_key(&handle)
    }

    pub fn size(&self, handle: i64) -> std::io::Result<u64> {
        let guard = self.open.lock().expect("file table poisoned");
        let entry = guard
            .get(&handle)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "bad handle"))?;
        Ok(entry.file.metadata()?.len())
    }
}

impl Default for FileTable {
    fn default() -> Self {
        FileTable::new()
    }
}

/// A single test suite's counters (`std.testing`).
#[derive(Debug, Default, Clone)]
pub struct TestSuite {
    pub total: i64,
    pub failures: i64,
    pub passed: i64,
}

/// Process-wide registry of test suites, keyed by integer suite id.
pub struct TestingRegistry {
    next_id: AtomicI64,
    suites: DashMap<i64, TestSuite>,
}

impl TestingRegistry {
    pub fn new() -> Self {
        TestingRegistry {
            next_id: AtomicI64::new(1),
            suites: DashMap::new(),
        }
    }

    pub fn create_suite(&self) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.suites.insert(id, TestSuite::default());
        id
    }

    pub fn record(&self, suite: i64, passed: bool, message: &str, test_name: &str) {
        let mut entry = self.suites.entry(suite).or_default();
        entry.total += 1;
        if passed {
            entry.passed += 1;
            eprintln!("[PASS] {test_name}");
        } else {
            entry.failures += 1;
            eprintln!("[FAIL] {test_name}: {message}");
        }
    }

    pub fn total(&self, suite: i64) -> i64 {
        self.suites.get(&suite).map(|s| s.total).unwrap_or(0)
    }

    pub fn failures(&self, suite: i64) -> i64 {
        self.suites.get(&suite).map(|s| s.failures).unwrap_or(0)
    }

    pub fn passed(&self, suite: i64) -> i64 {
        self.suites.get(&suite).map(|s| s.passed).unwrap_or(0)
    }

    pub fn summary(&self, suite: i64) -> String {
        let s = self.suites.get(&suite).map(|s| s.clone()).unwrap_or_default();
        format!("{}/{} passed, {} failed", s.passed, s.total, s.failures)
    }
}

impl Default for TestingRegistry {
    fn default() -> Self {
        TestingRegistry::new()
    }
}

/// A guarded, process-wide stdin reader so concurrent `read_line` calls
/// never interleave partial lines.
pub struct StdinGuard {
    reader: Mutex<BufReader<Stdin>>,
}

impl StdinGuard {
    pub fn new() -> Self {
        StdinGuard {
            reader: Mutex::new(BufReader::new(std::io::stdin())),
        }
    }

    /// Reads one line, stripping a single trailing CR and/or LF. Returns an
    /// empty string at EOF.
    pub fn read_line(&self) -> String {
        let mut buf = String::new();
        let mut guard = self.reader.lock().expect("stdin guard poisoned");
        let _ = guard.read_line(&mut buf);
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        buf
    }
}

impl Default for StdinGuard {
    fn default() -> Self {
        StdinGuard::new()
    }
}

/// CLI arguments surfaced to `std.os.*`: a program-name-stripped positional
/// list plus parsed `--name`/`--name=value` flags. Copy-on-read.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub positional: Vec<String>,
    pub flags: HashMap<String, Option<String>>,
}

impl CliArgs {
    pub fn parse(raw: &[String]) -> CliArgs {
        let mut positional = Vec::new();
        let mut flags = HashMap::new();
        for arg in raw {
            if let Some(rest) = arg.strip_prefix("--") {
                match rest.split_once('=') {
                    Some((name, value)) => {
                        flags.insert(name.to_string(), Some(value.to_string()));
                    }
                    None => {
                        flags.insert(rest.to_string(), None);
                    }
                }
            } else {
                positional.push(arg.clone());
            }
        }
        CliArgs { positional, flags }
    }
}

/// Every piece of shared state an intrinsic might touch, bundled so the
/// evaluator only needs to thread one handle through call dispatch.
pub struct ProcessState {
    pub stdin: StdinGuard,
    pub files: FileTable,
    pub testing: TestingRegistry,
    pub log_level: AtomicU8,
    pub args: CliArgs,
}

impl ProcessState {
    pub fn new(args: CliArgs) -> Self {
        ProcessState {
            stdin: StdinGuard::new(),
            files: FileTable::new(),
            testing: TestingRegistry::new(),
            log_level: AtomicU8::new(LogLevel::Info as u8),
            args,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.log_level.store(level as u8, Ordering::SeqCst);
    }
}

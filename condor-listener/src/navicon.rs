//! Process-backed coordinate converter.
//!
//! The per-landscape conversion lives in an external helper executable
//! (it links the landscape's NaviCon library). The helper runs for the
//! whole session: it prints `READY` once loaded, answers one `X Y` line
//! with one `LON,LAT` line, and exits on `EXIT`.
//!
//! A dead or wedged helper is restarted transparently and the request is
//! retried once; if that also fails the request degrades (the caller gets
//! an error and the telemetry tick goes out without geo). Only the
//! initial startup is fatal.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use condor_core::{CondorError, CoordinateConverter, Result};

/// Landscape data can take a while to load on first start.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// One running helper process with a line-reader thread.
#[derive(Debug)]
struct Helper {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
}

impl Helper {
    fn spawn(path: &Path, landscape: Option<&str>) -> Result<Helper> {
        let mut cmd = Command::new(path);
        if let Some(l) = landscape {
            cmd.arg(l);
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CondorError::Init(format!("cannot start helper {}: {e}", path.display()))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CondorError::Init("helper stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CondorError::Init("helper stdout unavailable".into()))?;

        // Reader thread: blocking line reads, handed over a channel so
        // requests can time out.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let helper = Helper {
            child,
            stdin,
            lines: rx,
        };
        match helper.lines.recv_timeout(STARTUP_TIMEOUT) {
            Ok(line) if line.trim() == "READY" => Ok(helper),
            Ok(line) => Err(CondorError::Init(format!(
                "unexpected helper banner: {line}"
            ))),
            Err(_) => Err(CondorError::Init("helper never reported READY".into())),
        }
    }

    fn request(&mut self, x: f32, y: f32, timeout: Duration) -> Result<(f64, f64)> {
        writeln!(self.stdin, "{x} {y}")
            .map_err(|e| CondorError::HelperUnavailable(format!("write failed: {e}")))?;
        let line = self
            .lines
            .recv_timeout(timeout)
            .map_err(|_| CondorError::HelperUnavailable("response timeout".into()))?;
        parse_response(&line)
    }

    /// Ask the helper to exit; kill it if it doesn't.
    fn shutdown(mut self) {
        let _ = writeln!(self.stdin, "EXIT");
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if matches!(self.child.try_wait(), Ok(Some(_))) {
                return;
            }
            thread::sleep(Duration::from_millis(50));
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for Helper {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Parse one `LON,LAT` response line.
fn parse_response(line: &str) -> Result<(f64, f64)> {
    let line = line.trim();
    if line.starts_with("ERROR") {
        return Err(CondorError::HelperUnavailable(line.to_string()));
    }
    let (lon, lat) = line
        .split_once(',')
        .ok_or_else(|| CondorError::HelperUnavailable(format!("malformed response: {line}")))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| CondorError::HelperUnavailable(format!("malformed response: {line}")))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| CondorError::HelperUnavailable(format!("malformed response: {line}")))?;
    Ok((lon, lat))
}

/// Converter backed by the persistent helper process.
#[derive(Debug)]
pub struct NaviconBridge {
    path: PathBuf,
    landscape: Option<String>,
    timeout: Duration,
    helper: Option<Helper>,
    pub restarts: u64,
}

impl NaviconBridge {
    /// Start the helper. Startup failure is fatal for the run.
    pub fn new(path: PathBuf, landscape: Option<String>, timeout: Duration) -> Result<Self> {
        let helper = Helper::spawn(&path, landscape.as_deref())?;
        Ok(NaviconBridge {
            path,
            landscape,
            timeout,
            helper: Some(helper),
            restarts: 0,
        })
    }

    fn respawn(&mut self) -> Result<&mut Helper> {
        self.restarts += 1;
        let helper = Helper::spawn(&self.path, self.landscape.as_deref())
            .map_err(|e| CondorError::HelperUnavailable(e.to_string()))?;
        Ok(self.helper.insert(helper))
    }

    /// Graceful shutdown at end of run.
    pub fn shutdown(mut self) {
        if let Some(helper) = self.helper.take() {
            helper.shutdown();
        }
    }
}

impl CoordinateConverter for NaviconBridge {
    fn xy_to_lon_lat(&mut self, x: f32, y: f32) -> Result<(f64, f64)> {
        if let Some(helper) = self.helper.as_mut() {
            match helper.request(x, y, self.timeout) {
                Ok(v) => return Ok(v),
                Err(_) => {
                    // Process is suspect: drop it, restart, retry once.
                    self.helper = None;
                }
            }
        }
        let timeout = self.timeout;
        self.respawn()?.request(x, y, timeout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long output readers may run after a timed-out child is killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    pub(crate) exit_code: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) timed_out: bool,
    pub(crate) duration: Duration,
}

impl CommandOutput {
    pub(crate) fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Last `n` lines of stderr, falling back to stdout (Maven logs errors there).
    pub(crate) fn tail(&self, n: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        tail_lines(source, n)
    }
}

pub(crate) fn tail_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.lines().collect();
    if lines.len() <= n {
        lines.join("\n")
    } else {
        lines[lines.len() - n..].join("\n")
    }
}

/// Run `program` to completion, killing it once `timeout` elapses.
///
/// Spawn failures (program not found, not executable) surface as `Err`;
/// a non-zero exit is reported through [`CommandOutput::exit_code`].
pub(crate) fn run_command_with_timeout(
    program: &str,
    args: &[String],
    working_dir: &Path,
    timeout: Option<Duration>,
) -> io::Result<CommandOutput> {
    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes on their own threads so a chatty tool cannot block on
    // a full pipe while we poll for exit.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let (exit_code, timed_out) = wait(&mut child, timeout)?;

    // A killed child can leave grandchildren holding the pipes open, so after
    // a timeout the readers only get a short grace period.
    let grace = timed_out.then(|| Instant::now() + DRAIN_GRACE);
    let stdout = join_output(stdout, grace);
    let mut stderr = join_output(stderr, grace);
    if timed_out && let Some(t) = timeout {
        stderr.push_str(&format!(
            "\ncommand timed out after {}",
            humantime::format_duration(t)
        ));
    }

    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
        timed_out,
        duration: start.elapsed(),
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<(i32, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait()?;
        return Ok((status.code().unwrap_or(-1), false));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status.code().unwrap_or(-1), false));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok((-1, true));
        }
        thread::sleep(Duration::from_millis(100));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            buf
        })
    })
}

/// Join a reader thread. With a deadline, a reader still blocked when it
/// passes is detached and its output dropped.
fn join_output(handle: Option<JoinHandle<Vec<u8>>>, deadline: Option<Instant>) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    if let Some(deadline) = deadline {
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return "[output unavailable: pipe still held open after kill]".to_string();
            }
            thread::sleep(Duration::from_millis(20));
        }
    }
    handle
        .join()
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

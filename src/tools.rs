//! External Tool Invocation Module
//!
//! The pipeline never builds shell strings. Every external program (EDirect,
//! EMBOSS, Clustal Omega, BLAST+, pullseq) is described by a [`ToolSpec`] and
//! run through a [`ToolRunner`], so stages can be tested against a fake
//! runner and real runs never depend on the process working directory.
//!
//! # Example
//! ```no_run
//! use protscout::tools::{SystemRunner, ToolRunner, ToolSpec};
//!
//! let runner = SystemRunner;
//! let out = runner.invoke(&ToolSpec::new("blastp").arg("-version")).unwrap();
//! println!("{}", out.text());
//! ```

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::ToolFailure;

// ============================================================================
// Tool Spec
// ============================================================================

/// Description of a single external program invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    pub program: String,
    pub args: Vec<OsString>,
    /// Bytes fed to the program's stdin.
    pub stdin: Option<Vec<u8>>,
    /// Redirects stdout into this file instead of capturing it.
    pub stdout_path: Option<PathBuf>,
    /// Working directory for the child process only.
    pub current_dir: Option<PathBuf>,
}

impl ToolSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_path = Some(path.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Human-readable command line, for logs.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let Some(ref out) = self.stdout_path {
            line.push_str(&format!(" > {}", out.display()));
        }
        line
    }
}

/// Captured result of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Empty when stdout was redirected to a file.
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs external programs.
pub trait ToolRunner: Sync {
    fn invoke(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolFailure>;
}

/// Feeds the captured stdout of `first` into the stdin of `second`.
pub fn pipe(
    runner: &dyn ToolRunner,
    first: &ToolSpec,
    second: ToolSpec,
) -> Result<ToolOutput, ToolFailure> {
    let upstream = runner.invoke(first)?;
    runner.invoke(&second.stdin(upstream.stdout))
}

/// Runs programs on the host with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn invoke(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolFailure> {
        let program = find_executable(&spec.program)?;
        tracing::debug!("running: {}", spec.display());

        let spawn_err = |source| ToolFailure::Spawn {
            program: spec.program.clone(),
            source,
        };

        let mut cmd = Command::new(&program);
        cmd.args(&spec.args).stderr(Stdio::piped());
        if let Some(ref dir) = spec.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() });
        match spec.stdout_path {
            Some(ref path) => {
                let file = File::create(path).map_err(spawn_err)?;
                cmd.stdout(Stdio::from(file));
            }
            None => {
                cmd.stdout(Stdio::piped());
            }
        }

        let mut child = cmd.spawn().map_err(spawn_err)?;

        // stdin is written from a separate thread so a chatty child cannot
        // deadlock against a full stdout pipe.
        let output = std::thread::scope(|s| {
            if let (Some(bytes), Some(mut stdin)) = (spec.stdin.as_deref(), child.stdin.take()) {
                let program = &spec.program;
                s.spawn(move || {
                    if let Err(e) = write_stdin(&mut stdin, bytes) {
                        tracing::debug!("{}: failed to write stdin: {}", program, e);
                    }
                });
            }
            child.wait_with_output()
        })
        .map_err(spawn_err)?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ToolFailure::NonZeroExit {
                program: spec.program.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}

/// Writes `bytes` to a child's stdin. A child that exits without reading
/// all of its input closes the pipe; that is not an error here.
fn write_stdin<W: Write>(stdin: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    match stdin.write_all(bytes) {
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Resolves a program name against `PATH`.
///
/// Absolute or relative paths containing a separator are accepted as-is when
/// they exist.
pub fn find_executable(name: &str) -> Result<PathBuf, ToolFailure> {
    let path = Path::new(name);
    if path.components().count() > 1 {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ToolFailure::NotFound { program: name.to_string() });
    }

    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            let full_path = dir.join(name);
            if full_path.is_file() {
                return Ok(full_path);
            }
        }
    }

    Err(ToolFailure::NotFound { program: name.to_string() })
}

// ============================================================================
// Test Runner
// ============================================================================

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation and answers from a closure.
    pub struct FakeRunner<F>
    where
        F: Fn(&ToolSpec) -> Result<ToolOutput, ToolFailure> + Sync,
    {
        pub calls: Mutex<Vec<String>>,
        respond: F,
    }

    impl<F> FakeRunner<F>
    where
        F: Fn(&ToolSpec) -> Result<ToolOutput, ToolFailure> + Sync,
    {
        pub fn new(respond: F) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                respond,
            }
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.split(' ').next().unwrap_or("").to_string())
                .collect()
        }
    }

    impl<F> ToolRunner for FakeRunner<F>
    where
        F: Fn(&ToolSpec) -> Result<ToolOutput, ToolFailure> + Sync,
    {
        fn invoke(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolFailure> {
            self.calls.lock().unwrap().push(spec.display());
            (self.respond)(spec)
        }
    }

    pub fn stdout(text: &str) -> Result<ToolOutput, ToolFailure> {
        Ok(ToolOutput {
            stdout: text.as_bytes().to_vec(),
            stderr: String::new(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

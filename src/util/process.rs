//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::util::diagnostic::UserNotification;

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    path_prefix: Vec<PathBuf>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            path_prefix: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Prepend directories to `PATH` for the child process, in the given order.
    pub fn prepend_path<'a>(mut self, dirs: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        self.path_prefix.extend(dirs.into_iter().cloned());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Compute the `PATH` value the child will see, if it differs from ours.
    pub fn effective_path(&self) -> Option<std::ffi::OsString> {
        if self.path_prefix.is_empty() {
            return None;
        }
        let current = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .path_prefix
            .iter()
            .cloned()
            .chain(std::env::split_paths(&current));
        std::env::join_paths(dirs).ok()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(path) = self.effective_path() {
            cmd.env("PATH", path);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute and require success.
    ///
    /// A non-zero exit is reported as a [`UserNotification`] carrying the
    /// captured stdout and stderr.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            bail!(UserNotification::new(with_captured_output(
                format!(
                    "`{}` failed with exit code {:?}",
                    self.display_command(),
                    output.status.code()
                ),
                &output
            )));
        }
        Ok(output)
    }

    /// Execute with the child's output forwarded to ours as it arrives,
    /// while also capturing it.
    pub fn exec_streaming(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let (stdout, stderr) = std::thread::scope(|s| {
            let out = s.spawn(move || tee(child_stdout, std::io::stdout()));
            let err = s.spawn(move || tee(child_stderr, std::io::stderr()));
            (out.join(), err.join())
        });
        let status = child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(Output {
            status,
            stdout: stdout.map_err(|_| anyhow!("stdout reader panicked"))?,
            stderr: stderr.map_err(|_| anyhow!("stderr reader panicked"))?,
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Copy `source` into `sink` until EOF, returning everything copied.
fn tee(source: Option<impl Read>, mut sink: impl Write) -> Vec<u8> {
    let mut captured = Vec::new();
    let Some(mut source) = source else {
        return captured;
    };
    let mut buf = [0u8; 8192];
    loop {
        match source.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let _ = sink.write_all(&buf[..n]);
                let _ = sink.flush();
                captured.extend_from_slice(&buf[..n]);
            }
        }
    }
    captured
}

/// Append the captured stdout and stderr of `output` to `message`.
pub fn with_captured_output(message: impl Into<String>, output: &Output) -> String {
    let mut message = message.into();
    for stream in [&output.stdout, &output.stderr] {
        let text = String::from_utf8_lossy(stream);
        let text = text.trim_end();
        if !text.is_empty() {
            message.push('\n');
            message.push_str(text);
        }
    }
    message
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an executable, searching the given directories before `PATH`.
pub fn find_executable_in(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    if dirs.is_empty() {
        return find_executable(name);
    }
    let current = std::env::var_os("PATH").unwrap_or_default();
    let search = std::env::join_paths(
        dirs.iter()
            .cloned()
            .chain(std::env::split_paths(&current)),
    )
    .ok()?;
    let cwd = std::env::current_dir().ok()?;
    which::which_in(name, Some(search), cwd).ok()
}

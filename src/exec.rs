#![forbid(unsafe_code)]

//! Subprocess seams for the external tools (yt-dlp, gallery-dl, ffmpeg).
//! Tests repoint each seam at a stub script; everything else goes through
//! `run_logged`, which stays quiet on success and echoes the captured output
//! when a tool fails.

use anyhow::{Context, Result, bail};
use std::process::{Command, Output, Stdio};

#[cfg(test)]
use std::path::PathBuf;
#[cfg(test)]
use std::sync::{Mutex, MutexGuard};

pub const YT_DLP: &str = "yt-dlp";
pub const GALLERY_DL: &str = "gallery-dl";
pub const FFMPEG: &str = "ffmpeg";

#[cfg(test)]
#[derive(Default)]
struct StubPaths {
    yt_dlp: Option<PathBuf>,
    gallery_dl: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
}

#[cfg(test)]
static STUBS: Mutex<StubPaths> = Mutex::new(StubPaths {
    yt_dlp: None,
    gallery_dl: None,
    ffmpeg: None,
});
#[cfg(test)]
static STUB_USE_LOCK: Mutex<()> = Mutex::new(());

pub fn yt_dlp_command() -> Command {
    #[cfg(test)]
    {
        if let Some(path) = STUBS.lock().unwrap().yt_dlp.clone() {
            return Command::new(path);
        }
    }
    Command::new(YT_DLP)
}

pub fn gallery_dl_command() -> Command {
    #[cfg(test)]
    {
        if let Some(path) = STUBS.lock().unwrap().gallery_dl.clone() {
            return Command::new(path);
        }
    }
    Command::new(GALLERY_DL)
}

pub fn ffmpeg_command() -> Command {
    #[cfg(test)]
    {
        if let Some(path) = STUBS.lock().unwrap().ffmpeg.clone() {
            return Command::new(path);
        }
    }
    Command::new(FFMPEG)
}

/// Replaces one or more tool seams for the duration of the returned guard.
/// The guard also serializes stub-using tests so they never observe each
/// other's scripts.
#[cfg(test)]
pub(crate) fn set_stubs(
    yt_dlp: Option<PathBuf>,
    gallery_dl: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
) -> StubGuard {
    let guard = STUB_USE_LOCK.lock().unwrap();
    {
        let mut stubs = STUBS.lock().unwrap();
        stubs.yt_dlp = yt_dlp;
        stubs.gallery_dl = gallery_dl;
        stubs.ffmpeg = ffmpeg;
    }
    StubGuard { lock: Some(guard) }
}

#[cfg(test)]
pub(crate) struct StubGuard {
    lock: Option<MutexGuard<'static, ()>>,
}

#[cfg(test)]
impl Drop for StubGuard {
    fn drop(&mut self) {
        *STUBS.lock().unwrap() = StubPaths::default();
        self.lock.take();
    }
}

/// Runs `<name> --version` to fail loudly when a required tool is missing.
pub fn ensure_program_available(name: &str) -> Result<()> {
    let status = Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => bail!("{} is installed but returned a failure status", name),
        Err(err) => bail!("{} is not installed or not in PATH: {}", name, err),
    }
}

/// Runs a command with captured output. Success is silent; on a non-zero
/// exit the command line and whatever the tool printed are echoed so the
/// operator sees the reason without rerunning by hand.
pub fn run_logged(command: &mut Command, label: &str) -> Result<Output> {
    let output = command
        .output()
        .with_context(|| format!("running {label}"))?;
    if !output.status.success() {
        eprintln!("  Warning: {label} exited with {}", output.status);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            eprintln!("{}", stdout.trim_end());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            eprintln!("{}", stderr.trim_end());
        }
    }
    Ok(output)
}

/// Drops an executable `#!/bin/sh` script into `dir` for stubbing a tool.
#[cfg(all(test, unix))]
pub(crate) fn write_stub_script(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

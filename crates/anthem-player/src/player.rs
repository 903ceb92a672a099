//! Sequential playback through an external player process.
//!
//! Audio decoding and output stay outside the process: each track is
//! handed to a configured player command (mpv by default) and playback is
//! considered done when the child exits. Preview mode kills the child
//! after a fixed duration instead.

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("player command is empty")]
    EmptyCommand,
    #[error("failed to spawn player {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("player exited with status {0}")]
    Failed(std::process::ExitStatus),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// External player invocation: program plus fixed arguments; the track
/// reference is appended as the last argument.
#[derive(Debug, Clone)]
pub struct Player {
    program: String,
    args: Vec<String>,
}

impl Player {
    /// Build from a whitespace-separated command line, e.g.
    /// `"mpv --no-video --really-quiet"`.
    pub fn from_command(command: &str) -> Result<Self, PlayerError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(PlayerError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn spawn(&self, track: &str) -> Result<Child, PlayerError> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(track)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PlayerError::Spawn {
                command: self.program.clone(),
                source,
            })
    }

    /// Play tracks one after another, blocking until each finishes.
    pub fn play(&self, tracks: &[String]) -> Result<(), PlayerError> {
        for track in tracks {
            tracing::info!(track = %track, "playing");
            let status = self.spawn(track)?.wait()?;
            if !status.success() {
                return Err(PlayerError::Failed(status));
            }
        }
        Ok(())
    }

    /// Play each track for at most `duration`, then stop it.
    ///
    /// Preview playback: the child is killed once the window elapses. A
    /// child that finishes early is left alone.
    pub fn play_for(&self, tracks: &[String], duration: Duration) -> Result<(), PlayerError> {
        for track in tracks {
            tracing::info!(track = %track, secs = duration.as_secs(), "playing preview");
            let mut child = self.spawn(track)?;
            std::thread::sleep(duration);
            match child.try_wait()? {
                Some(_) => {}
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                }
            }
        }
        Ok(())
    }
}

//! Alarm sound playback through an external player

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{process::Command, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use super::platform::{AudioPlayer, OutputHandle};
use crate::error::PlatformError;

/// Sound files tried in order when none is configured
const SOUND_CANDIDATES: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga"),
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("aplay", "/usr/share/sounds/generic.wav"),
];

/// Loops a sound file by re-running a player command until released
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    sound_file: Option<PathBuf>,
}

impl CommandPlayer {
    /// Use `sound_file` if given, else the first known system sound present
    pub fn new(sound_file: Option<PathBuf>) -> Self {
        let chosen = sound_file
            .map(|file| (player_for(&file), file))
            .or_else(|| {
                SOUND_CANDIDATES
                    .iter()
                    .map(|(program, file)| (*program, PathBuf::from(file)))
                    .find(|(_, file)| file.exists())
            });

        match chosen {
            Some((program, file)) => Self {
                args: volume_args(program),
                program: program.to_string(),
                sound_file: Some(file),
            },
            None => Self {
                program: String::new(),
                args: Vec::new(),
                sound_file: None,
            },
        }
    }

    pub fn sound_file(&self) -> Option<&Path> {
        self.sound_file.as_deref()
    }
}

fn player_for(file: &Path) -> &'static str {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("wav") => "aplay",
        _ => "paplay",
    }
}

fn volume_args(program: &str) -> Vec<String> {
    match program {
        // 65536 is 100% for PulseAudio
        "paplay" => vec!["--volume=65536".to_string()],
        _ => Vec::new(),
    }
}

impl AudioPlayer for CommandPlayer {
    fn play_looping(&self) -> Result<Box<dyn OutputHandle>, PlatformError> {
        let Some(file) = self.sound_file.clone() else {
            return Err(PlatformError::NoSoundSource);
        };
        if !file.exists() {
            return Err(PlatformError::NoSoundSource);
        }

        let mut first = Command::new(&self.program);
        first
            .args(&self.args)
            .arg(&file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        // Spawn the first run here so a missing player is reported to the caller
        let child = first.spawn().map_err(|source| PlatformError::Spawn {
            command: self.program.clone(),
            source,
        })?;

        info!("Playing alarm sound {}", file.display());
        let program = self.program.clone();
        let args = self.args.clone();
        let task = tokio::spawn(async move {
            let mut child = child;
            loop {
                match child.wait().await {
                    Ok(status) if !status.success() => {
                        warn!("Alarm sound player exited with {}", status);
                        sleep(Duration::from_secs(1)).await;
                    }
                    Err(e) => {
                        warn!("Lost alarm sound player: {}", e);
                        sleep(Duration::from_secs(1)).await;
                    }
                    Ok(_) => {}
                }

                child = match Command::new(&program)
                    .args(&args)
                    .arg(&file)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                {
                    Ok(child) => child,
                    Err(e) => {
                        warn!("Could not restart alarm sound: {}", e);
                        return;
                    }
                };
            }
        });

        Ok(Box::new(LoopingPlayback { task: Some(task) }))
    }
}

struct LoopingPlayback {
    task: Option<JoinHandle<()>>,
}

impl OutputHandle for LoopingPlayback {
    fn release(&mut self) {
        // Aborting drops the child, and kill_on_drop stops the player
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Alarm sound stopped");
        }
    }
}

impl Drop for LoopingPlayback {
    fn drop(&mut self) {
        self.release();
    }
}

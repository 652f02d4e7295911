//! Video engine command tables.
//!
//! Each supported video backend exposes a different OSC namespace; the
//! tables map the abstract actions the players use onto backend-specific
//! addresses and argument shapes. Tables are static data, resolved once per
//! command; a genuinely unmapped action is a configuration error surfaced
//! at startup, never at play time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::osc::OscMessage;

/// Which video engine the session drives, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoBackend {
    /// Scene-based projection mapper: `/play`, `/pause` (toggle), cue
    /// selection by name, position reset.
    MadMapper,
    /// Media player with a flat `/vlc_*` namespace.
    Vlc,
    /// No video device configured.
    #[default]
    None,
}

impl std::fmt::Display for VideoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoBackend::MadMapper => write!(f, "madmapper"),
            VideoBackend::Vlc => write!(f, "vlc"),
            VideoBackend::None => write!(f, "none"),
        }
    }
}

/// Abstract actions the playback layer issues to a video engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoAction {
    /// Start (or, for toggle-style backends, resume) playback.
    Play,
    /// Pause playback.
    Pause,
    /// Stop playback.
    Stop,
    /// Select the media/scene named by the stimulus video ref.
    Select,
    /// Rewind the selected media to its start.
    Reset,
    /// Blank the display between trials.
    BlackScreen,
    /// Tear the player down at questionnaire end.
    Finish,
}

impl std::fmt::Display for VideoAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VideoAction::Play => "play",
            VideoAction::Pause => "pause",
            VideoAction::Stop => "stop",
            VideoAction::Select => "select",
            VideoAction::Reset => "reset",
            VideoAction::BlackScreen => "black_screen",
            VideoAction::Finish => "finish",
        };
        write!(f, "{}", name)
    }
}

/// Argument shape of a table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ArgShape {
    /// No argument.
    None,
    /// Fixed float argument.
    Float(f32),
    /// The stimulus video ref is appended to the address path.
    NameInAddress,
    /// The stimulus video ref is passed as a string argument.
    NameAsArg,
    /// Literal string `"1"` (the VLC resume convention).
    ResumeLiteral,
}

/// One resolved table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandTemplate {
    address: &'static str,
    arg: ArgShape,
}

impl CommandTemplate {
    /// Materializes the template into a message.
    ///
    /// `name` is the stimulus video ref; templates that don't reference it
    /// ignore it.
    #[must_use]
    pub fn message(&self, name: Option<&str>) -> OscMessage {
        match self.arg {
            ArgShape::None => OscMessage::new(self.address),
            ArgShape::Float(v) => OscMessage::new(self.address).arg(v),
            ArgShape::NameInAddress => {
                OscMessage::new(format!("{}{}", self.address, name.unwrap_or_default()))
            }
            ArgShape::NameAsArg => OscMessage::new(self.address).arg(name.unwrap_or_default()),
            ArgShape::ResumeLiteral => OscMessage::new(self.address).arg("1"),
        }
    }
}

/// Command table misses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// The selected backend has no mapping for the action (and no documented
    /// fallback applies).
    #[error("video backend '{backend}' does not support action '{action}'")]
    UnsupportedAction {
        /// The configured backend.
        backend: VideoBackend,
        /// The unmapped action.
        action: VideoAction,
    },
}

fn madmapper(action: VideoAction) -> Option<CommandTemplate> {
    use VideoAction::*;
    let entry = match action {
        Play => CommandTemplate {
            address: "/play",
            arg: ArgShape::None,
        },
        // The mapper's /pause is a dual-purpose toggle; it also serves as
        // the stop mapping since the scene keeps its state.
        Pause | Stop => CommandTemplate {
            address: "/pause",
            arg: ArgShape::None,
        },
        Select => CommandTemplate {
            address: "/cues/Bank-1/scenes/by_name/",
            arg: ArgShape::NameInAddress,
        },
        Reset => CommandTemplate {
            address: "/medias/selected/position_sec",
            arg: ArgShape::Float(0.0),
        },
        BlackScreen | Finish => return None,
    };
    Some(entry)
}

fn vlc(action: VideoAction) -> Option<CommandTemplate> {
    use VideoAction::*;
    let entry = match action {
        Play => CommandTemplate {
            address: "/vlc_start",
            arg: ArgShape::NameAsArg,
        },
        Stop => CommandTemplate {
            address: "/vlc_stop",
            arg: ArgShape::None,
        },
        // A still frame both pauses and blanks the display.
        Pause | BlackScreen => CommandTemplate {
            address: "/vlc_still",
            arg: ArgShape::None,
        },
        Finish => CommandTemplate {
            address: "/vlc_finish",
            arg: ArgShape::None,
        },
        Select | Reset => return None,
    };
    Some(entry)
}

/// Resolves `action` against the `backend` table.
///
/// A backend lacking [`VideoAction::BlackScreen`] resolves it to its own
/// stop mapping: blanking degrades to stopping, it never errors.
///
/// # Errors
///
/// [`TableError::UnsupportedAction`] when the backend genuinely lacks the
/// action (including everything on [`VideoBackend::None`]).
pub fn resolve(backend: VideoBackend, action: VideoAction) -> Result<CommandTemplate, TableError> {
    let lookup = match backend {
        VideoBackend::MadMapper => madmapper,
        VideoBackend::Vlc => vlc,
        VideoBackend::None => {
            return Err(TableError::UnsupportedAction { backend, action });
        }
    };

    if let Some(entry) = lookup(action) {
        return Ok(entry);
    }

    // Required fallback: blanking degrades to the backend's stop command.
    if action == VideoAction::BlackScreen {
        if let Some(entry) = lookup(VideoAction::Stop) {
            return Ok(entry);
        }
    }

    Err(TableError::UnsupportedAction { backend, action })
}

/// Resolves and materializes in one step.
///
/// # Errors
///
/// Same as [`resolve`].
pub fn command(
    backend: VideoBackend,
    action: VideoAction,
    name: Option<&str>,
) -> Result<OscMessage, TableError> {
    resolve(backend, action).map(|t| t.message(name))
}

/// The resume message for a backend, where resuming differs from playing.
///
/// The media player resumes via its start endpoint with the literal `"1"`;
/// the projection mapper's pause toggle already resumes.
#[must_use]
pub fn resume_template(backend: VideoBackend) -> Option<CommandTemplate> {
    match backend {
        VideoBackend::Vlc => Some(CommandTemplate {
            address: "/vlc_start",
            arg: ArgShape::ResumeLiteral,
        }),
        VideoBackend::MadMapper => Some(CommandTemplate {
            address: "/pause",
            arg: ArgShape::None,
        }),
        VideoBackend::None => None,
    }
}

//! What the client remembers between runs (the player's name and the last
//! game they were in) and shareable invite links.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Query parameter carrying the game id in invite links.
pub const INVITE_PARAM: &str = "game";
pub const DEFAULT_INVITE_BASE: &str = "https://raja-mantri.app/game";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to access profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("profile {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "playerName", default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(rename = "gameId", default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
}

impl Profile {
    /// Loads the profile, treating a missing file as an empty profile.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No profile at {}, starting fresh", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ProfileError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| ProfileError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        let io_err = |source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ProfileError::Format {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }
}

/// `$RAJA_MANTRI_PROFILE`, else `~/.raja-mantri/profile.json`, else a file in
/// the working directory.
pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var("RAJA_MANTRI_PROFILE") {
        return PathBuf::from(path);
    }
    match std::env::var("HOME") {
        Ok(home) => Path::new(&home).join(".raja-mantri").join("profile.json"),
        Err(_) => PathBuf::from("raja-mantri-profile.json"),
    }
}

pub fn invite_link(base: &str, game_id: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, separator, INVITE_PARAM, game_id)
}

/// Extracts a game id from either a bare id or an invite link.
pub fn parse_invite(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None if input.contains('=') => input,
        None if input.contains('/') => return None,
        None => return Some(input.to_string()),
    };
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == INVITE_PARAM)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

//! User-facing notifications. Every error or state change the player should
//! hear about ends up as a [`Notice`] and goes through one channel.

use log::{error, info};
use std::fmt;
use tokio::sync::mpsc;

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// Mirrors the notice into the log so terminal output and logs agree.
    pub fn log(&self) {
        match self.level {
            Level::Error => error!("{}", self.message),
            Level::Success | Level::Info => info!("{}", self.message),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Success => write!(f, "Success: {}", self.message),
            Level::Info => write!(f, "{}", self.message),
            Level::Error => write!(f, "Error: {}", self.message),
        }
    }
}

pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

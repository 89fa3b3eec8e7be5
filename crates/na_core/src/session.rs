use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

pub const AUTH_TOKEN_KEY: &str = "auth_token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
}

/// Signed-in state, persisted to a small JSON file.
///
/// A session is loaded once at startup and handed to whatever needs it; the
/// stored token is the only thing that decides whether the user is signed in.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    data: SessionData,
}

impl Session {
    /// Loads the session stored at `path`, or an empty one if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => SessionData::default(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionData::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), authenticated = data.auth_token.is_some(), "loaded session");
        Ok(Self { path, data })
    }

    pub fn sign_in(&mut self, token: impl Into<String>, user: Option<UserProfile>) -> Result<()> {
        self.data.auth_token = Some(token.into());
        self.data.user = user;
        self.persist()
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.data = SessionData::default();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.auth_token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.data.auth_token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.data.user.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.data)?)?;
        Ok(())
    }
}

//! Remote descriptor parsing.
//!
//! A proxy file names its publish target on its first line:
//!
//! ```text
//! scheme://[user[:password]@]host/path
//! ```
//!
//! Leading path separators are stripped before parsing, and a line without a
//! scheme is read as a plain local path.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{io_err, DescriptorError};

pub const FILE_SCHEME: &str = "file";

const REDACTED: &str = "***";

/// Parsed publish destination of a proxy file.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    location: String,
    scheme: String,
    username: Option<String>,
    password: Option<String>,
    host: String,
    path: String,
}

impl RemoteDescriptor {
    /// Read the first line of `source` and parse it.
    pub fn read_from(source: &Path) -> Result<Self, DescriptorError> {
        let file = File::open(source).map_err(|e| io_err(source, e))?;
        let mut first_line = String::new();
        BufReader::new(file)
            .read_line(&mut first_line)
            .map_err(|e| io_err(source, e))?;
        Self::parse(&first_line)
    }

    /// Parse a serialized descriptor.
    pub fn parse(line: &str) -> Result<Self, DescriptorError> {
        let location = line.trim().trim_start_matches(['/', '\\']).trim_start();
        if location.is_empty() {
            return Err(DescriptorError::Empty);
        }

        if !location.contains("://") {
            return Ok(Self {
                location: location.to_string(),
                scheme: FILE_SCHEME.to_string(),
                username: None,
                password: None,
                host: String::new(),
                path: format!("/{location}"),
            });
        }

        let url = Url::parse(location).map_err(|source| DescriptorError::Malformed { source })?;

        let username = Some(url.username())
            .filter(|user| !user.is_empty())
            .map(str::to_string);
        let password = url
            .password()
            .filter(|_| username.is_some())
            .map(str::to_string);
        let host = match (url.host_str().filter(|h| !h.is_empty()), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        let path = if url.scheme() == FILE_SCHEME {
            url.to_file_path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|()| url.path().to_string())
        } else {
            url.path().to_string()
        };

        let descriptor = Self {
            location: location.to_string(),
            scheme: url.scheme().to_string(),
            username,
            password,
            host,
            path,
        };

        if descriptor.host.is_empty() && descriptor.scheme != FILE_SCHEME {
            return Err(DescriptorError::MissingHost {
                descriptor: descriptor.to_string(),
            });
        }
        Ok(descriptor)
    }

    /// Canonical target string: the first line with leading separators
    /// stripped. This is what the copy service publishes to.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the descriptor to a local filesystem path, if it denotes one.
    ///
    /// Any descriptor whose path exists locally counts. A `file` descriptor
    /// also counts when only its parent directory exists, so the very first
    /// publish to a new local file is not mistaken for a remote target.
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() {
            return None;
        }
        let path = Path::new(&self.path);
        if path.exists() {
            return Some(path.to_path_buf());
        }
        let parent_exists = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .is_some_and(Path::is_dir);
        if self.scheme == FILE_SCHEME && parent_exists {
            return Some(path.to_path_buf());
        }
        None
    }

    pub fn is_local(&self) -> bool {
        self.local_path().is_some()
    }

    /// Identity the mount service knows this remote by.
    pub fn mount_identity(&self) -> MountIdentity {
        MountIdentity {
            scheme: self.scheme.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
        }
    }
}

impl fmt::Display for RemoteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_authority(
            f,
            &self.scheme,
            self.username.as_deref(),
            self.password.as_ref().map(|_| REDACTED),
            &self.host,
        )?;
        f.write_str(&self.path)
    }
}

impl fmt::Debug for RemoteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RemoteDescriptor")
            .field(&self.to_string())
            .finish()
    }
}

/// `scheme://[user[:password]@]host` of a remote descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct MountIdentity {
    scheme: String,
    username: Option<String>,
    password: Option<String>,
    host: String,
}

impl MountIdentity {
    /// Full identity, password included, as handed to the mount service.
    pub fn uri(&self) -> String {
        let mut out = String::new();
        let _ = write_authority(
            &mut out,
            &self.scheme,
            self.username.as_deref(),
            self.password.as_deref(),
            &self.host,
        );
        out
    }

    /// Password-free identity used for membership in the mount list.
    pub fn key(&self) -> String {
        let mut out = String::new();
        let _ = write_authority(
            &mut out,
            &self.scheme,
            self.username.as_deref(),
            None,
            &self.host,
        );
        out
    }
}

impl fmt::Display for MountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_authority(
            f,
            &self.scheme,
            self.username.as_deref(),
            self.password.as_ref().map(|_| REDACTED),
            &self.host,
        )
    }
}

impl fmt::Debug for MountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MountIdentity").field(&self.to_string()).finish()
    }
}

fn write_authority(
    out: &mut impl fmt::Write,
    scheme: &str,
    username: Option<&str>,
    password: Option<&str>,
    host: &str,
) -> fmt::Result {
    write!(out, "{scheme}://")?;
    if let Some(user) = username {
        out.write_str(user)?;
        if let Some(password) = password {
            write!(out, ":{password}")?;
        }
        out.write_char('@')?;
    }
    out.write_str(host)
}

//! Socket path derivation for the peer endpoint.

use crate::error::ConnectionError;
use mprisbee_core::BridgeConfig;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Capacity of `sockaddr_un.sun_path` on Linux, including the trailing NUL.
pub const SUN_PATH_CAPACITY: usize = 108;

const SOCKET_ROOT: &str = "/tmp";

/// A validated filesystem address for a Unix stream socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    path: PathBuf,
}

impl SocketAddress {
    /// Rejects paths the kernel could not fit into `sun_path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConnectionError> {
        let path = path.into();
        let bytes = path.as_os_str().as_bytes();
        if bytes.is_empty() {
            return Err(ConnectionError::InvalidAddress {
                path,
                reason: "path is empty",
            });
        }
        if bytes.contains(&0) {
            return Err(ConnectionError::InvalidAddress {
                path,
                reason: "path contains a NUL byte",
            });
        }
        if bytes.len() >= SUN_PATH_CAPACITY {
            return Err(ConnectionError::InvalidAddress {
                path,
                reason: "path too long for a Unix socket",
            });
        }
        Ok(Self { path })
    }

    /// `/tmp/<prefix><uid>/<socket_name>`
    pub fn for_user(uid: u32, config: &BridgeConfig) -> Result<Self, ConnectionError> {
        let dir = format!("{}{}", config.socket_prefix, uid);
        Self::new(Path::new(SOCKET_ROOT).join(dir).join(&config.socket_name))
    }

    /// Address for the real user id of this process, so that concurrent
    /// sessions of different users never share a socket.
    pub fn for_current_user(config: &BridgeConfig) -> Result<Self, ConnectionError> {
        Self::for_user(nix::unistd::getuid().as_raw(), config)
    }

    /// Filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

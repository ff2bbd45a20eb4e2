use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Storage backend protocols the catalog knows how to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Protocol {
    Local,
    Smb,
    Ftp,
    Nfs,
    Webdav,
}

impl Protocol {
    pub const ALL: [Protocol; 5] = [
        Protocol::Local,
        Protocol::Smb,
        Protocol::Ftp,
        Protocol::Nfs,
        Protocol::Webdav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Local => "local",
            Protocol::Smb => "smb",
            Protocol::Ftp => "ftp",
            Protocol::Nfs => "nfs",
            Protocol::Webdav => "webdav",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "file" => Ok(Protocol::Local),
            "smb" | "cifs" => Ok(Protocol::Smb),
            "ftp" => Ok(Protocol::Ftp),
            "nfs" => Ok(Protocol::Nfs),
            "webdav" | "dav" => Ok(Protocol::Webdav),
            other => Err(ModelError::UnknownProtocol(other.to_string())),
        }
    }
}

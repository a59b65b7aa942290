//! Server version parsing and feature thresholds.

use crate::error::{TsqlError, TsqlResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A SQL Server product version such as `16.0.1000.6`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl ServerVersion {
    /// SQL Server 2012: first release with `OFFSET .. FETCH`.
    pub const SQL_SERVER_2012: ServerVersion = ServerVersion::new(11, 0, 0, 0);
    /// SQL Server 2022: first release with native `GREATEST`/`LEAST`.
    pub const SQL_SERVER_2022: ServerVersion = ServerVersion::new(16, 0, 0, 0);

    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse a dotted version string. Missing trailing parts are zero.
    pub fn parse(s: &str) -> TsqlResult<Self> {
        let s = s.trim();
        let mut parts = [0u32; 4];
        let mut count = 0;
        for (i, piece) in s.split('.').enumerate() {
            if i >= 4 {
                break;
            }
            parts[i] = piece.trim().parse().map_err(|_| {
                TsqlError::invalid_argument(format!("invalid server version: {s:?}"))
            })?;
            count += 1;
        }
        if count == 0 {
            return Err(TsqlError::invalid_argument("empty server version"));
        }
        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }

    pub fn at_least(&self, other: &ServerVersion) -> bool {
        self >= other
    }

    /// `OFFSET n ROWS FETCH NEXT m ROWS ONLY` is available.
    pub fn supports_offset_fetch(&self) -> bool {
        self.at_least(&Self::SQL_SERVER_2012)
    }

    /// `GREATEST(..)` and `LEAST(..)` are available.
    pub fn supports_greatest_least(&self) -> bool {
        self.at_least(&Self::SQL_SERVER_2022)
    }
}

impl Default for ServerVersion {
    fn default() -> Self {
        Self::SQL_SERVER_2012
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.build, self.revision).cmp(&(
            other.major,
            other.minor,
            other.build,
            other.revision,
        ))
    }
}

impl FromStr for ServerVersion {
    type Err = TsqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

//! Server version and feature capabilities.

use std::fmt;

/// Statement kinds that can carry a `RETURNING` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReturningKind {
    Insert,
    Update,
    Delete,
    UpdateOrInsert,
    Merge,
}

impl ReturningKind {
    /// All kinds, in declaration order.
    pub const ALL: [ReturningKind; 5] = [
        ReturningKind::Insert,
        ReturningKind::Update,
        ReturningKind::Delete,
        ReturningKind::UpdateOrInsert,
        ReturningKind::Merge,
    ];

    /// Configuration token naming this kind.
    pub fn token(&self) -> &'static str {
        match self {
            ReturningKind::Insert => "insert",
            ReturningKind::Update => "update",
            ReturningKind::Delete => "delete",
            ReturningKind::UpdateOrInsert => "update_or_insert",
            ReturningKind::Merge => "merge",
        }
    }
}

/// Features the connected server offers.
///
/// Built from the server version reported at attach time; individual flags
/// can be overridden when the server reports them explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCapabilities {
    major: u32,
    minor: u32,
    boolean: bool,
    decfloat: bool,
    int128: bool,
    time_zones: bool,
}

impl ServerCapabilities {
    /// Capabilities implied by a server version.
    pub fn new(major: u32, minor: u32) -> Self {
        let at_least_4 = major >= 4;
        Self {
            major,
            minor,
            boolean: major >= 3,
            decfloat: at_least_4,
            int128: at_least_4,
            time_zones: at_least_4,
        }
    }

    /// Parse a version such as `"3.0"`, `"4.0.2"` or `"WI-V5.0.1.1469"`.
    pub fn parse(version: &str) -> Option<Self> {
        let start = version.find(|c: char| c.is_ascii_digit())?;
        let mut parts = version[start..]
            .split(|c: char| !c.is_ascii_digit())
            .filter(|p| !p.is_empty());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some(Self::new(major, minor))
    }

    /// Override DECFLOAT availability.
    pub fn with_decfloat(mut self, supported: bool) -> Self {
        self.decfloat = supported;
        self
    }

    /// Override INT128 availability.
    pub fn with_int128(mut self, supported: bool) -> Self {
        self.int128 = supported;
        self
    }

    /// Override time zone type availability.
    pub fn with_time_zones(mut self, supported: bool) -> Self {
        self.time_zones = supported;
        self
    }

    /// Override BOOLEAN availability.
    pub fn with_boolean(mut self, supported: bool) -> Self {
        self.boolean = supported;
        self
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Whether the server is at least `major.minor`.
    pub fn is_at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    pub fn supports_returning(&self) -> bool {
        self.is_at_least(2, 0)
    }

    /// `RETURNING *` is available from Firebird 4.0.
    pub fn supports_returning_all(&self) -> bool {
        self.is_at_least(4, 0)
    }

    pub fn supports_boolean(&self) -> bool {
        self.boolean
    }

    pub fn supports_decfloat(&self) -> bool {
        self.decfloat
    }

    pub fn supports_int128(&self) -> bool {
        self.int128
    }

    pub fn supports_time_zones(&self) -> bool {
        self.time_zones
    }

    /// Precision NUMERIC and DECIMAL are widened to when declared with a
    /// precision above 18, or `None` if the server caps them at 18.
    pub fn extended_numeric_precision(&self) -> Option<u8> {
        if self.int128 {
            Some(38)
        } else if self.decfloat {
            Some(34)
        } else {
            None
        }
    }

    /// Statement kinds with `RETURNING` support on this server version.
    pub fn returning_kinds(&self) -> Vec<ReturningKind> {
        if self.is_at_least(3, 0) {
            ReturningKind::ALL.to_vec()
        } else if self.is_at_least(2, 5) {
            vec![
                ReturningKind::Insert,
                ReturningKind::Update,
                ReturningKind::Delete,
                ReturningKind::UpdateOrInsert,
            ]
        } else if self.is_at_least(2, 0) {
            vec![ReturningKind::Insert]
        } else {
            Vec::new()
        }
    }
}

impl fmt::Display for ServerCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Firebird {}.{}", self.major, self.minor)
    }
}

//! Locations inside a nested argument tree.
//!
//! A [`Path`] is the list of keys leading from the argument root to a value.
//! Array positions are stored as their decimal form, so a path built while
//! encoding compares equal to the same path parsed back from the wire.
//!
//! The wire form joins segments with `.`. A `.` or `\` inside an object key is
//! escaped with `\`. The empty string is the root, so a path made of a single
//! empty key cannot be told apart from it on the wire.
//!
//! Escaping is an extension of the plain dotted grammar. Peers that split on
//! `.` without unescaping agree with it only while no object key on a callback
//! path contains `.` or `\`.
//!
//! ```text
//! ["0", "opts", "onData"]   <->   "0.opts.onData"
//! ["1", "a.b"]              <->   "1.a\.b"
//! ```

use crate::config::ProtocolConfig;
use std::fmt;
use std::str::FromStr;

/// Ordered sequence of keys from the argument root to a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    keys: Vec<String>,
}

impl Path {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from raw segments.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Segments from root to leaf.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    /// Append an object key.
    pub fn push_key(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    /// Append an array index.
    pub fn push_index(&mut self, index: usize) {
        self.keys.push(index.to_string());
    }

    /// Remove the last segment.
    pub fn pop(&mut self) -> Option<String> {
        self.keys.pop()
    }

    /// Parse the wire form. Never fails: any string names some path.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }

        let mut keys = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars();

        while let Some(c) = chars.next() {
            if c == ProtocolConfig::PATH_ESCAPE {
                // A trailing escape is kept literally.
                current.push(chars.next().unwrap_or(c));
            } else if c == ProtocolConfig::PATH_SEPARATOR {
                keys.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        keys.push(current);

        Self { keys }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", ProtocolConfig::PATH_SEPARATOR)?;
            }
            for c in key.chars() {
                if c == ProtocolConfig::PATH_SEPARATOR || c == ProtocolConfig::PATH_ESCAPE {
                    write!(f, "{}", ProtocolConfig::PATH_ESCAPE)?;
                }
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

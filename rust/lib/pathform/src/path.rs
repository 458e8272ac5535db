use std::fmt;
use std::str::FromStr;

use crate::error::FormError;

/// One step into the nested store: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Structured address into the form store.
///
/// Two paths are equal iff their segment sequences are equal. The canonical
/// string form ([`Path::to_dot_path`]) is the key every subscription and
/// every metadata entry is stored under.
///
/// ```ignore
/// let p = path!["nested", "items", 0, "name"];
/// assert_eq!(p.to_dot_path(), "nested.items.0.name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<Segment>);

/// Build a [`Path`] from a mixed list of keys and indices.
///
/// `path!["nested", "items", 0, "name"]`
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {
        $crate::path::Path::from(vec![$($crate::path::Segment::from($seg)),+])
    };
}

impl Path {
    /// The empty path, addressing the whole store.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Append an object key (builder style).
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }

    /// Append an array index (builder style).
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(Segment::Index(index));
        self
    }

    /// A new path one level below this one.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Reject paths that cannot be addressed unambiguously.
    ///
    /// An empty key has no dot-path spelling distinct from its parent.
    pub fn validate(&self) -> Result<(), FormError> {
        if self
            .0
            .iter()
            .any(|s| matches!(s, Segment::Key(k) if k.is_empty()))
        {
            return Err(FormError::MalformedPath(format!(
                "empty key in {:?}",
                self.0
            )));
        }
        Ok(())
    }

    /// Canonical dot-notation form.
    ///
    /// Indices render as plain decimal digits. Inside keys `.` and `\` are
    /// escaped with `\`, and an all-digit key gets a leading `\` so it never
    /// collides with an index.
    pub fn to_dot_path(&self) -> String {
        let mut out = String::new();
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match segment {
                Segment::Key(key) => escape_key(key, &mut out),
                Segment::Index(index) => out.push_str(&index.to_string()),
            }
        }
        out
    }

    /// Parse the canonical dot-notation form back into a structured path.
    ///
    /// Unescaped all-digit segments become indices. Leading zeros are not
    /// accepted, so every index has exactly one spelling.
    pub fn from_dot_path(dot_path: &str) -> Result<Self, FormError> {
        if dot_path.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        let mut buf = String::new();
        let mut escaped = false;
        let mut chars = dot_path.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some(next) => {
                        buf.push(next);
                        escaped = true;
                    }
                    None => {
                        return Err(FormError::MalformedPath(format!(
                            "dangling escape in '{}'",
                            dot_path
                        )));
                    }
                },
                '.' => {
                    segments.push(finish_segment(dot_path, &buf, escaped)?);
                    buf.clear();
                    escaped = false;
                }
                other => buf.push(other),
            }
        }
        segments.push(finish_segment(dot_path, &buf, escaped)?);

        Ok(Self(segments))
    }
}

fn escape_key(key: &str, out: &mut String) {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        out.push('\\');
        out.push_str(key);
        return;
    }
    for ch in key.chars() {
        if ch == '.' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn finish_segment(dot_path: &str, buf: &str, escaped: bool) -> Result<Segment, FormError> {
    if buf.is_empty() && !escaped {
        return Err(FormError::MalformedPath(format!(
            "empty segment in '{}'",
            dot_path
        )));
    }
    if escaped || !buf.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(Segment::Key(buf.to_string()));
    }
    if buf.len() > 1 && buf.starts_with('0') {
        return Err(FormError::MalformedPath(format!(
            "index with leading zero '{}' in '{}'",
            buf, dot_path
        )));
    }
    buf.parse::<usize>()
        .map(Segment::Index)
        .map_err(|e| FormError::MalformedPath(format!("index '{}' in '{}': {}", buf, dot_path, e)))
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot_path())
    }
}

impl FromStr for Path {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_dot_path(s)
    }
}

use std::fmt;

use crate::TransferError;

/// A validated directory path inside a project, rooted at `/`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirPath {
    components: Vec<String>,
}

impl DirPath {
    /// The project root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a slash-separated directory path.
    ///
    /// Leading, trailing and repeated separators and `.` components are
    /// ignored; `..` is rejected.
    pub fn parse(raw: &str) -> Result<Self, TransferError> {
        let mut components = Vec::new();
        for part in raw.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    return Err(TransferError::InvalidPath(format!(
                        "parent directory traversal not allowed: {raw}"
                    )));
                }
                _ if part.contains('\0') => {
                    return Err(TransferError::InvalidPath(format!(
                        "NUL byte in path: {raw:?}"
                    )));
                }
                _ => components.push(part.to_string()),
            }
        }
        Ok(Self { components })
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Every directory from the first component to this one, as
    /// `(full_path, name)` pairs. The root itself is not included.
    pub fn ancestors(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.components.iter().enumerate().map(|(i, name)| {
            (
                format!("/{}", self.components[..=i].join("/")),
                name.as_str(),
            )
        })
    }
}

impl fmt::Display for DirPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

/// A validated file path inside a project: a [`DirPath`] plus a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    dir: DirPath,
    name: String,
}

impl LogicalPath {
    /// Parses a file path such as `/a/b/report.docx`.
    ///
    /// Relative paths are taken as rooted. A trailing separator is rejected
    /// because it names no file.
    pub fn parse(raw: &str) -> Result<Self, TransferError> {
        if raw.is_empty() {
            return Err(TransferError::InvalidPath("empty path".into()));
        }
        if raw.ends_with('/') {
            return Err(TransferError::InvalidPath(format!(
                "path has no file name: {raw}"
            )));
        }

        let mut dir = DirPath::parse(raw)?;
        let name = match dir.components.pop() {
            Some(name) => name,
            None => {
                return Err(TransferError::InvalidPath(format!(
                    "path has no file name: {raw}"
                )));
            }
        };
        Ok(Self { dir, name })
    }

    pub fn dir(&self) -> &DirPath {
        &self.dir
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_root() {
            write!(f, "/{}", self.name)
        } else {
            write!(f, "{}/{}", self.dir, self.name)
        }
    }
}

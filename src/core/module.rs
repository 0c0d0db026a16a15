//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Modules, where they come from, and how they are told apart.

use crate::error::Error;
use crate::util::filesystem;
use serde_derive::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use super::manifest::ModuleManifest;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginKind {
    Local,
    Git,
    Svn,
}

impl Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Local => "local",
                Self::Git => "git",
                Self::Svn => "svn",
            }
        )
    }
}

/// The canonical identity of a module: its origin kind and normalized location.
///
/// Two references with equal identities always resolve to the same module.
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct Identity {
    kind: OriginKind,
    location: String,
}

impl Identity {
    pub fn get_kind(&self) -> &OriginKind {
        &self.kind
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.kind, self.location)
    }
}

/// Where a module comes from, including an optional revision.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Origin {
    kind: OriginKind,
    location: String,
    revision: Option<String>,
}

impl Origin {
    /// Creates a local origin for the directory `path`.
    pub fn local<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = filesystem::absolute(path.as_ref()).map_err(|e| {
            Error::InvalidOrigin(path.as_ref().display().to_string(), e.to_string())
        })?;
        Ok(Self {
            kind: OriginKind::Local,
            location: filesystem::into_std_str(&path),
            revision: None,
        })
    }

    /// Parses a location string from a manifest.
    ///
    /// Local locations are anchored at `base` when relative. Git locations may end
    /// with `::<revision>`; svn locations may end with `@<revision>` after the final
    /// path segment.
    pub fn parse(kind: OriginKind, text: &str, base: &Path) -> Result<Self, Error> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidOrigin(
                text.to_string(),
                String::from("location is empty"),
            ));
        }
        let (location, revision) = match kind {
            OriginKind::Local => (
                filesystem::into_std_str(&filesystem::normalize(base, text)),
                None,
            ),
            OriginKind::Git => match text.rsplit_once("::") {
                Some((url, rev)) => (Self::canonical_url(url), Self::non_empty(rev)),
                None => (Self::canonical_url(text), None),
            },
            OriginKind::Svn => {
                let last_slash = text.rfind('/').unwrap_or(0);
                match text.rfind('@') {
                    Some(at) if at > last_slash => (
                        Self::canonical_url(&text[..at]),
                        Self::non_empty(&text[at + 1..]),
                    ),
                    _ => (Self::canonical_url(text), None),
                }
            }
        };
        if location.is_empty() {
            return Err(Error::InvalidOrigin(
                text.to_string(),
                String::from("location is empty"),
            ));
        }
        Ok(Self {
            kind: kind,
            location: location,
            revision: revision,
        })
    }

    fn non_empty(s: &str) -> Option<String> {
        let s = s.trim();
        match s.is_empty() {
            true => None,
            false => Some(s.to_string()),
        }
    }

    /// Removes trailing slashes and a trailing `.git` from a repository url.
    fn canonical_url(url: &str) -> String {
        let url = url.trim().trim_end_matches('/');
        url.strip_suffix(".git").unwrap_or(url).to_string()
    }

    pub fn get_kind(&self) -> &OriginKind {
        &self.kind
    }

    pub fn get_location(&self) -> &str {
        &self.location
    }

    pub fn get_revision(&self) -> Option<&String> {
        self.revision.as_ref()
    }

    /// Computes the canonical identity of this origin.
    pub fn to_identity(&self) -> Identity {
        Identity {
            kind: self.kind,
            location: self.location.clone(),
        }
    }

    /// The last path segment of the location, used to name fetched directories.
    pub fn get_basename(&self) -> &str {
        self.location
            .rsplit(|c| c == '/' || c == ':')
            .find(|s| s.is_empty() == false)
            .unwrap_or("module")
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.revision) {
            (OriginKind::Git, Some(rev)) => write!(f, "{}+{}::{}", self.kind, self.location, rev),
            (_, Some(rev)) => write!(f, "{}+{}@{}", self.kind, self.location, rev),
            (_, None) => write!(f, "{}+{}", self.kind, self.location),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize)]
pub enum FetchState {
    Pending,
    Fetching,
    Fetched,
    Error,
}

/// A directory tree contributing source files and further module references.
#[derive(Debug, PartialEq)]
pub struct Module {
    origin: Origin,
    state: FetchState,
    path: Option<PathBuf>,
    manifest: Option<ModuleManifest>,
    children: Vec<Origin>,
    parent: Option<Identity>,
}

impl Module {
    /// Creates a module awaiting its fetch.
    pub fn new(origin: Origin, parent: Option<Identity>) -> Self {
        Self {
            origin: origin,
            state: FetchState::Pending,
            path: None,
            manifest: None,
            children: Vec::new(),
            parent: parent,
        }
    }

    pub fn get_origin(&self) -> &Origin {
        &self.origin
    }

    pub fn get_identity(&self) -> Identity {
        self.origin.to_identity()
    }

    pub fn get_state(&self) -> &FetchState {
        &self.state
    }

    pub fn is_fetched(&self) -> bool {
        self.state == FetchState::Fetched
    }

    /// The local directory holding the module's contents, once fetched.
    pub fn get_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn get_manifest(&self) -> Option<&ModuleManifest> {
        self.manifest.as_ref()
    }

    /// The child references declared by this module's manifest.
    pub fn get_children(&self) -> &Vec<Origin> {
        &self.children
    }

    /// The module whose manifest first referenced this one.
    pub fn get_parent(&self) -> Option<&Identity> {
        self.parent.as_ref()
    }

    pub(crate) fn set_state(&mut self, state: FetchState) {
        self.state = state;
    }

    pub(crate) fn set_fetched(&mut self, path: PathBuf) {
        self.path = Some(path);
        self.state = FetchState::Fetched;
    }

    pub(crate) fn set_manifest(&mut self, manifest: ModuleManifest, children: Vec<Origin>) {
        self.manifest = Some(manifest);
        self.children = children;
    }
}

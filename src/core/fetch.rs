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

//! Backends that materialize a module's origin as a local directory.

use super::module::{Origin, OriginKind};
use crate::util::anyerror::{check_status, AnyError, Fault};
use crate::util::filesystem;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Makes the contents of an origin available on the local filesystem.
pub trait FetchBackend {
    /// Returns the directory holding the module's contents.
    ///
    /// Version-controlled origins are placed under `fetch_to`.
    fn fetch(&self, origin: &Origin, fetch_to: &Path) -> Result<PathBuf, Fault>;
}

/// Computes the directory a version-controlled origin is checked out into.
///
/// The name is keyed by a hash of the canonical identity, so every reference to
/// the same module lands in the same slot.
pub fn cache_slot(origin: &Origin, fetch_to: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(origin.to_identity().to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    fetch_to.join(format!("{}-{}", origin.get_basename(), &digest[..16]))
}

/// Removes a partially filled cache slot after a failed fetch.
///
/// A removal failure is only logged so the fetch error reaches the caller.
fn discard_slot(slot: &Path) {
    if slot.exists() == true {
        if let Err(e) = std::fs::remove_dir_all(slot) {
            tracing::warn!("failed to remove incomplete checkout {}: {}", slot.display(), e);
        }
    }
}

/// Uses a directory already on disk.
#[derive(Debug, PartialEq, Default)]
pub struct LocalBackend;

impl FetchBackend for LocalBackend {
    fn fetch(&self, origin: &Origin, _: &Path) -> Result<PathBuf, Fault> {
        let path = PathBuf::from(origin.get_location());
        if path.is_dir() == false {
            return Err(AnyError(format!("directory {:?} does not exist", path)))?;
        }
        // verify the directory can be read
        std::fs::read_dir(&path)?;
        Ok(path)
    }
}

/// A series of git commands run through subprocesses.
#[derive(Debug, PartialEq)]
pub struct GitBackend {
    command: String,
}

impl GitBackend {
    /// Creates a backend calling `command`, or `git` from the path when `None`.
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or(String::from("git")),
        }
    }

    /// Clones a repository `url` to `dest`.
    ///
    /// The clone happens in a temporary directory and its contents are copied over.
    fn clone(&self, url: &str, dest: &Path) -> Result<(), Fault> {
        let tmp_path = tempfile::tempdir()?;
        let status = Command::new(&self.command)
            .args(["clone", url])
            .current_dir(&tmp_path)
            .status()?;
        check_status(status)?;

        std::fs::create_dir_all(&dest)?;
        // there should only be one directory in the tmp/ folder
        let cloned = match std::fs::read_dir(&tmp_path)?.next() {
            Some(entry) => entry?.path(),
            None => return Err(AnyError(format!("clone of {} produced no directory", url)))?,
        };
        let mut from_paths = Vec::new();
        for entry in std::fs::read_dir(cloned)? {
            from_paths.push(entry?.path());
        }
        // copy rather than rename because of windows issues
        let options = fs_extra::dir::CopyOptions::new();
        fs_extra::copy_items(&from_paths, &dest, &options)?;
        Ok(())
    }

    /// Runs `git checkout <revision>` within `root`.
    fn checkout(&self, root: &Path, revision: &str) -> Result<(), Fault> {
        let status = Command::new(&self.command)
            .args(["checkout", revision])
            .current_dir(root)
            .status()?;
        Ok(check_status(status)?)
    }
}

impl FetchBackend for GitBackend {
    fn fetch(&self, origin: &Origin, fetch_to: &Path) -> Result<PathBuf, Fault> {
        let slot = cache_slot(origin, fetch_to);
        if filesystem::is_populated_dir(&slot) == true {
            tracing::debug!("reusing checkout of {} at {}", origin, slot.display());
            return Ok(slot);
        }
        tracing::info!("cloning {} into {}", origin, slot.display());
        let result = self.clone(origin.get_location(), &slot).and_then(|_| {
            match origin.get_revision() {
                Some(rev) => self.checkout(&slot, rev),
                None => Ok(()),
            }
        });
        if let Err(e) = result {
            // never leave a half-made checkout behind to be reused later
            discard_slot(&slot);
            return Err(e);
        }
        Ok(slot)
    }
}

/// Checks out subversion repositories with the `svn` command.
#[derive(Debug, PartialEq)]
pub struct SvnBackend {
    command: String,
}

impl SvnBackend {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or(String::from("svn")),
        }
    }
}

impl FetchBackend for SvnBackend {
    fn fetch(&self, origin: &Origin, fetch_to: &Path) -> Result<PathBuf, Fault> {
        let slot = cache_slot(origin, fetch_to);
        if filesystem::is_populated_dir(&slot) == true {
            tracing::debug!("reusing checkout of {} at {}", origin, slot.display());
            return Ok(slot);
        }
        tracing::info!("checking out {} into {}", origin, slot.display());
        std::fs::create_dir_all(fetch_to)?;
        let mut proc = Command::new(&self.command);
        proc.arg("checkout");
        if let Some(rev) = origin.get_revision() {
            proc.args(["-r", rev]);
        }
        let status = proc.arg(origin.get_location()).arg(&slot).status()?;
        if let Err(e) = check_status(status) {
            discard_slot(&slot);
            return Err(e)?;
        }
        Ok(slot)
    }
}

/// The fetch backend to use for each origin kind.
#[derive(Default)]
pub struct Backends {
    map: HashMap<OriginKind, Box<dyn FetchBackend>>,
}

impl Backends {
    /// Creates a registry with no backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the registry of subprocess-driven backends for every origin kind.
    pub fn standard(git: Option<String>, svn: Option<String>) -> Self {
        Self::new()
            .with(OriginKind::Local, Box::new(LocalBackend))
            .with(OriginKind::Git, Box::new(GitBackend::new(git)))
            .with(OriginKind::Svn, Box::new(SvnBackend::new(svn)))
    }

    /// Registers `backend` for `kind`, replacing any previous one.
    pub fn with(mut self, kind: OriginKind, backend: Box<dyn FetchBackend>) -> Self {
        self.map.insert(kind, backend);
        self
    }

    pub fn get(&self, kind: &OriginKind) -> Option<&dyn FetchBackend> {
        self.map.get(kind).map(|b| b.as_ref())
    }
}

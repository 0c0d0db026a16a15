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

//! The typed manifest describing one module, and the loader seam that produces it.

use super::file::File;
use super::module::OriginKind;
use crate::util::anyerror::{AnyError, Fault, FileFault};
use serde::de::{self, MapAccess, Visitor};
use serde::Deserialize;
use serde_derive::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MANIFEST_FILE: &str = "Manifest.toml";

/// Produces the manifest of a module given its local directory.
pub trait ManifestLoader {
    fn load(&self, root: &Path) -> Result<ModuleManifest, Fault>;
}

/// Reads `Manifest.toml` from the module's root directory.
#[derive(Debug, PartialEq, Default)]
pub struct TomlLoader;

impl ManifestLoader for TomlLoader {
    fn load(&self, root: &Path) -> Result<ModuleManifest, Fault> {
        let path = root.join(MANIFEST_FILE);
        if path.exists() == false {
            return Err(AnyError(format!("missing manifest file {:?}", path)))?;
        }
        let text = std::fs::read_to_string(&path)?;
        match ModuleManifest::from_str(&text) {
            Ok(man) => Ok(man),
            Err(e) => Err(FileFault(path, Box::new(e)))?,
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModuleManifest {
    library: Option<String>,
    fetch_to: Option<PathBuf>,
    vcom_opt: Option<String>,
    vlog_opt: Option<String>,
    #[serde(default, deserialize_with = "string_or_struct")]
    files: Vec<DeclaredFile>,
    #[serde(default)]
    modules: ModuleRefs,
}

impl FromStr for ModuleManifest {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl ModuleManifest {
    pub fn get_library(&self) -> Option<&String> {
        self.library.as_ref()
    }

    pub fn get_fetch_to(&self) -> Option<&PathBuf> {
        self.fetch_to.as_ref()
    }

    pub fn get_vcom_opt(&self) -> Option<&String> {
        self.vcom_opt.as_ref()
    }

    pub fn get_vlog_opt(&self) -> Option<&String> {
        self.vlog_opt.as_ref()
    }

    pub fn get_files(&self) -> &Vec<DeclaredFile> {
        &self.files
    }

    pub fn get_modules(&self) -> &ModuleRefs {
        &self.modules
    }

    /// Expands the declared files into concrete files under `root`.
    ///
    /// Entries containing glob characters are matched against the filesystem and
    /// their matches are returned in sorted order; other entries are taken as-is.
    pub fn expand_files(&self, root: &Path) -> Result<Vec<(File, &DeclaredFile)>, Fault> {
        let mut result = Vec::new();
        for decl in &self.files {
            match decl.is_pattern() {
                true => {
                    let pattern = root.join(decl.get_path());
                    let mut matches = Vec::new();
                    for entry in glob::glob(&pattern.to_string_lossy())? {
                        let path = entry?;
                        if path.is_file() == true {
                            matches.push(path);
                        }
                    }
                    if matches.is_empty() == true {
                        tracing::warn!("pattern {:?} matched no files", pattern);
                    }
                    matches.sort();
                    matches
                        .into_iter()
                        .for_each(|p| result.push((File::new(root, p), decl)));
                }
                false => result.push((File::new(root, decl.get_path()), decl)),
            }
        }
        Ok(result)
    }
}

/// Child module references grouped by origin kind.
#[derive(Debug, PartialEq, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ModuleRefs {
    #[serde(default)]
    local: Vec<String>,
    #[serde(default)]
    git: Vec<String>,
    #[serde(default)]
    svn: Vec<String>,
}

impl ModuleRefs {
    /// Iterates over every reference in declaration order: local, then git, then svn.
    pub fn iter(&self) -> impl Iterator<Item = (OriginKind, &String)> {
        self.local
            .iter()
            .map(|s| (OriginKind::Local, s))
            .chain(self.git.iter().map(|s| (OriginKind::Git, s)))
            .chain(self.svn.iter().map(|s| (OriginKind::Svn, s)))
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.git.is_empty() && self.svn.is_empty()
    }
}

/// A file entry in a manifest: a plain path or a table with extra settings.
#[derive(Debug, PartialEq, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DeclaredFile {
    path: String,
    library: Option<String>,
    options: Option<String>,
}

impl DeclaredFile {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            library: None,
            options: None,
        }
    }

    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn get_library(&self) -> Option<&String> {
        self.library.as_ref()
    }

    pub fn get_options(&self) -> Option<&String> {
        self.options.as_ref()
    }

    fn is_pattern(&self) -> bool {
        self.path.contains(|c| c == '*' || c == '?' || c == '[')
    }
}

impl<'de> Deserialize<'de> for DeclaredFileEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct LayerVisitor;

        impl<'de> Visitor<'de> for LayerVisitor {
            type Value = DeclaredFileEntry;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a file path or a table with a \"path\" key")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(DeclaredFileEntry(DeclaredFile::new(value)))
            }

            fn visit_map<M>(self, map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                // falls back on the derived version of deser for the [DeclaredFile] struct
                Ok(DeclaredFileEntry(Deserialize::deserialize(
                    de::value::MapAccessDeserializer::new(map),
                )?))
            }
        }

        deserializer.deserialize_any(LayerVisitor)
    }
}

/// Accepts either spelling of a file entry.
struct DeclaredFileEntry(DeclaredFile);

fn string_or_struct<'de, D>(deserializer: D) -> Result<Vec<DeclaredFile>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let entries: Vec<DeclaredFileEntry> = Deserialize::deserialize(deserializer)?;
    Ok(entries.into_iter().map(|e| e.0).collect())
}

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

//! Source files carrying dependency information and ordered collections of them.

use super::file::{File, FileKind};
use std::collections::{BTreeSet, HashSet};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// The library used when a file does not name one.
pub const DEFAULT_LIBRARY: &str = "work";

static CREATION_INDEX: AtomicUsize = AtomicUsize::new(0);

/// Hands out the next value of the process-wide creation counter.
fn next_index() -> usize {
    CREATION_INDEX.fetch_add(1, Ordering::Relaxed)
}

/// A design unit that a file can provide or require.
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum Unit {
    /// A unit compiled into a library, such as a VHDL package.
    Design { library: String, name: String },
    /// A file pulled in textually through an include directive, named by its file name.
    ///
    /// The library is that of the file providing it.
    Header(String),
}

impl Unit {
    pub fn design(library: &str, name: &str) -> Self {
        Self::Design {
            library: library.to_string(),
            name: name.to_string(),
        }
    }

    /// Creates a header unit from an include path, keeping only the file name.
    pub fn header(include: &str) -> Self {
        let name = Path::new(include)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(include);
        Self::Header(name.to_string())
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Design { library, name } => write!(f, "{}.{}", library, name),
            Self::Header(name) => write!(f, "`include \"{}\"", name),
        }
    }
}

/// How a file takes part in dependency ordering.
#[derive(Debug, PartialEq, Clone)]
pub enum DepState {
    /// Analysis is skipped and the file is placed before every analyzable file.
    ///
    /// A fixed file may still announce units it is known to provide; they satisfy
    /// requirements but never create ordering edges.
    Fixed { provides: BTreeSet<Unit> },
    Analyzable {
        provides: BTreeSet<Unit>,
        requires: BTreeSet<Unit>,
    },
    /// Not an HDL source; carried along in input order.
    Auxiliary,
}

impl DepState {
    pub fn fixed() -> Self {
        Self::Fixed {
            provides: BTreeSet::new(),
        }
    }

    pub fn is_fixed(&self) -> bool {
        match self {
            Self::Fixed { .. } => true,
            _ => false,
        }
    }

    pub fn is_analyzable(&self) -> bool {
        match self {
            Self::Analyzable { .. } => true,
            _ => false,
        }
    }

    pub fn get_provides(&self) -> Option<&BTreeSet<Unit>> {
        match self {
            Self::Fixed { provides } => Some(provides),
            Self::Analyzable { provides, .. } => Some(provides),
            Self::Auxiliary => None,
        }
    }

    pub fn get_requires(&self) -> Option<&BTreeSet<Unit>> {
        match self {
            Self::Analyzable { requires, .. } => Some(requires),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct SourceFile {
    file: File,
    kind: FileKind,
    library: String,
    options: Option<String>,
    index: usize,
    state: DepState,
}

impl SourceFile {
    /// Creates a new source file and stamps it with the next creation index.
    pub fn new(file: File, kind: FileKind, library: Option<&str>, state: DepState) -> Self {
        Self {
            file: file,
            kind: kind,
            library: library.unwrap_or(DEFAULT_LIBRARY).to_string(),
            options: None,
            index: next_index(),
            state: state,
        }
    }

    /// Sets the dialect-specific compile options.
    pub fn options(mut self, opts: Option<String>) -> Self {
        self.options = opts;
        self
    }

    pub fn get_file(&self) -> &File {
        &self.file
    }

    pub fn get_path(&self) -> &PathBuf {
        self.file.get_path()
    }

    pub fn get_kind(&self) -> &FileKind {
        &self.kind
    }

    pub fn get_library(&self) -> &str {
        &self.library
    }

    pub fn get_options(&self) -> Option<&String> {
        self.options.as_ref()
    }

    /// The creation index, used as a deterministic tie-break.
    pub fn get_index(&self) -> usize {
        self.index
    }

    pub fn get_state(&self) -> &DepState {
        &self.state
    }
}

impl Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file)
    }
}

/// An insertion-ordered collection of source files with no repeated paths.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct SourceFileSet {
    files: Vec<SourceFile>,
    paths: HashSet<PathBuf>,
}

impl SourceFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `file` unless a file with the same path is already present.
    ///
    /// Returns false if the file was rejected as a duplicate.
    pub fn add(&mut self, file: SourceFile) -> bool {
        if self.paths.insert(file.get_path().clone()) == false {
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.get_path() == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    /// Collects the files of the given `kind`, keeping their order.
    pub fn filter(&self, kind: FileKind) -> SourceFileSet {
        self.iter()
            .filter(|f| f.get_kind() == &kind)
            .cloned()
            .collect()
    }

    /// Collects the files of any kind other than `kind`, keeping their order.
    pub fn inverse_filter(&self, kind: FileKind) -> SourceFileSet {
        self.iter()
            .filter(|f| f.get_kind() != &kind)
            .cloned()
            .collect()
    }

    /// Gathers the distinct libraries used by HDL files in the set.
    pub fn get_libraries(&self) -> BTreeSet<String> {
        self.iter()
            .filter(|f| f.get_kind().is_hdl() == true)
            .map(|f| f.get_library().to_string())
            .collect()
    }
}

impl FromIterator<SourceFile> for SourceFileSet {
    fn from_iter<T: IntoIterator<Item = SourceFile>>(iter: T) -> Self {
        let mut set = SourceFileSet::new();
        iter.into_iter().for_each(|f| {
            set.add(f);
        });
        set
    }
}

impl IntoIterator for SourceFileSet {
    type Item = SourceFile;
    type IntoIter = std::vec::IntoIter<SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a SourceFileSet {
    type Item = &'a SourceFile;
    type IntoIter = std::slice::Iter<'a, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

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

use std::{fmt::Display, path::PathBuf};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch module {0}: {1}")]
    FetchFailed(String, LastError),
    #[error("no fetch backend is registered for origin kind {0:?}")]
    MissingBackend(String),
    #[error("module {0} was already requested as {1} but is now requested as {2}")]
    ModuleConflict(String, String, String),
    #[error("unit {0} is provided by both {1:?} and {2:?}")]
    UnitConflict(String, PathBuf, PathBuf),
    #[error("files form a dependency cycle: {0}")]
    DependencyCycle(CycleList),
    #[error("failed to load manifest of module {0}: {1}")]
    ManifestFailed(String, LastError),
    #[error("module {0} is not fetched")]
    ModuleNotFetched(String),
    #[error("invalid module location {0:?}: {1}")]
    InvalidOrigin(String, String),
    #[error("failed to read source file {0:?}: {1}")]
    SourceUnreadable(PathBuf, LastError),
}

#[derive(Debug, PartialEq)]
pub struct LastError(pub String);

impl Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Error::lowerize(self.0.to_string()))
    }
}

/// The members of a cycle in the order the edges are walked.
#[derive(Debug, PartialEq)]
pub struct CycleList(pub Vec<PathBuf>);

impl CycleList {
    pub fn get_members(&self) -> &Vec<PathBuf> {
        &self.0
    }
}

impl Display for CycleList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut members: Vec<String> = self.0.iter().map(|p| format!("{:?}", p)).collect();
        // close the loop back to where it started
        if let Some(first) = members.first().cloned() {
            members.push(first);
        }
        write!(f, "{}", members.join(" -> "))
    }
}

impl Error {
    pub fn lowerize(s: String) -> String {
        // get the first word
        let first_word = match s.split_whitespace().next() {
            Some(w) => w,
            None => return s,
        };
        // retain punctuation if the first word is all-caps and longer than 1 character
        if first_word.len() > 1
            && first_word
                .chars()
                .find(|c| c.is_ascii_lowercase() == true)
                .is_none()
        {
            s.to_string()
        } else {
            s.char_indices()
                .map(|(i, c)| if i == 0 { c.to_ascii_lowercase() } else { c })
                .collect()
        }
    }
}

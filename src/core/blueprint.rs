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

//! Renders a resolved build into the plain-text plan that emitters consume.

use super::build::BuildSet;
use super::file::FileKind;
use super::solver::Unresolved;
use crate::util::anyerror::{AnyError, Fault};
use crate::util::filesystem;
use serde_derive::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;

pub const BLUEPRINT_DELIMITER: &str = "\t";

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum Scheme {
    #[default]
    Tsv,
    Json,
}

impl FromStr for Scheme {
    type Err = AnyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            _ => Err(AnyError(format!(
                "unknown blueprint format {:?}; expecting \"tsv\" or \"json\"",
                s
            ))),
        }
    }
}

/// One file to hand to the tool, in order.
#[derive(Debug, PartialEq, Serialize)]
struct Instruction<'a> {
    kind: &'a FileKind,
    library: &'a str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a String>,
}

#[derive(Debug, PartialEq, Serialize)]
struct Document<'a> {
    libraries: &'a BTreeSet<String>,
    steps: Vec<Instruction<'a>>,
    unresolved: &'a Vec<Unresolved>,
}

pub struct Blueprint<'a> {
    scheme: Scheme,
    build: &'a BuildSet,
}

impl<'a> Blueprint<'a> {
    pub fn new(scheme: Scheme, build: &'a BuildSet) -> Self {
        Self {
            scheme: scheme,
            build: build,
        }
    }

    fn steps(&self) -> Vec<Instruction<'a>> {
        self.build
            .get_order()
            .iter()
            .map(|f| Instruction {
                kind: f.get_kind(),
                library: f.get_library(),
                path: filesystem::into_std_str(f.get_path()),
                options: f.get_options(),
            })
            .collect()
    }

    /// Writes the blueprint's text.
    ///
    /// The tsv format is one `KIND\tLIBRARY\tPATH` line per file in order.
    pub fn write(&self) -> Result<String, Fault> {
        match self.scheme {
            Scheme::Tsv => Ok(self
                .steps()
                .into_iter()
                .map(|s| {
                    format!(
                        "{}{}{}{}{}\n",
                        s.kind, BLUEPRINT_DELIMITER, s.library, BLUEPRINT_DELIMITER, s.path
                    )
                })
                .collect()),
            Scheme::Json => {
                let doc = Document {
                    libraries: self.build.get_libraries(),
                    steps: self.steps(),
                    unresolved: self.build.get_unresolved(),
                };
                Ok(serde_json::to_string_pretty(&doc)?)
            }
        }
    }
}

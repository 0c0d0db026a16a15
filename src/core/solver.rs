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

//! Orders source files so that every unit is compiled before its users.

use super::source::{DepState, SourceFile, SourceFileSet, Unit};
use crate::error::{CycleList, Error};
use crate::util::graph::{Graph, NodeIndex};
use serde_derive::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;

/// A requirement no file in the set provides.
///
/// It is assumed to be supplied from outside the build, such as a vendor
/// library precompiled by the tool.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Unresolved {
    path: PathBuf,
    unit: String,
}

impl Unresolved {
    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn get_unit(&self) -> &str {
        &self.unit
    }
}

impl Display for Unresolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} requires {} which no file provides", self.path, self.unit)
    }
}

#[derive(Debug, PartialEq)]
pub struct Solution {
    order: SourceFileSet,
    unresolved: Vec<Unresolved>,
}

impl Solution {
    /// The files in compilation order.
    pub fn get_order(&self) -> &SourceFileSet {
        &self.order
    }

    pub fn get_unresolved(&self) -> &Vec<Unresolved> {
        &self.unresolved
    }

    pub fn into_parts(self) -> (SourceFileSet, Vec<Unresolved>) {
        (self.order, self.unresolved)
    }
}

/// Computes the compilation order of `files`.
///
/// Fixed files come first by creation index, then the analyzable files in
/// dependency order (ties broken by creation index), then every remaining file
/// in its input order.
pub fn solve(files: SourceFileSet) -> Result<Solution, Error> {
    let files: Vec<SourceFile> = files.into_iter().collect();

    let index = build_provide_index(&files)?;

    // only analyzable files take part in ordering
    let mut graph: Graph<usize, ()> = Graph::with_capacity(files.len(), files.len());
    let mut node_of: HashMap<usize, NodeIndex> = HashMap::new();
    for (i, f) in files.iter().enumerate() {
        if f.get_state().is_analyzable() == true {
            node_of.insert(i, graph.add_node(i));
        }
    }

    let mut unresolved = Vec::new();
    for (i, f) in files.iter().enumerate() {
        let requires = match f.get_state().get_requires() {
            Some(r) => r,
            None => continue,
        };
        for unit in requires {
            match index.get(unit, f.get_library()) {
                Some(p) if p == i => (),
                Some(p) => {
                    // fixed providers are already satisfied by coming first
                    if let Some(source) = node_of.get(&p) {
                        graph.add_edge(*source, node_of[&i], ());
                    }
                }
                None => {
                    let missing = Unresolved {
                        path: f.get_path().clone(),
                        unit: unit.to_string(),
                    };
                    tracing::warn!("{}", missing);
                    unresolved.push(missing);
                }
            }
        }
    }

    let priority = |n: NodeIndex| match graph.get_node(n) {
        Some(i) => files[*i].get_index(),
        None => usize::MAX,
    };
    let sorted = match graph.topological_sort(priority) {
        Ok(order) => order,
        Err(residual) => {
            let cycle = graph.shortest_cycle(&residual).unwrap_or(residual);
            let members = cycle
                .into_iter()
                .filter_map(|n| graph.get_node(n))
                .map(|i| files[*i].get_path().clone())
                .collect();
            return Err(Error::DependencyCycle(CycleList(members)));
        }
    };
    let sorted: Vec<usize> = sorted
        .into_iter()
        .filter_map(|n| graph.get_node(n).copied())
        .collect();

    let mut fixed: Vec<usize> = (0..files.len())
        .filter(|i| files[*i].get_state().is_fixed() == true)
        .collect();
    fixed.sort_by_key(|i| files[*i].get_index());

    let auxiliary: Vec<usize> = (0..files.len())
        .filter(|i| match files[*i].get_state() {
            DepState::Auxiliary => true,
            _ => false,
        })
        .collect();

    let mut slots: Vec<Option<SourceFile>> = files.into_iter().map(Some).collect();
    let order: SourceFileSet = fixed
        .into_iter()
        .chain(sorted.into_iter())
        .chain(auxiliary.into_iter())
        .filter_map(|i| slots[i].take())
        .collect();

    tracing::info!(
        "ordered {} files with {} unresolved requirements",
        order.len(),
        unresolved.len()
    );
    Ok(Solution {
        order: order,
        unresolved: unresolved,
    })
}

/// Where each provided unit can be found among the files being solved.
///
/// Header names are only unique within the library of the file providing
/// them, so two libraries may each ship their own `defs.vh`.
#[derive(Debug, Default)]
struct ProvideIndex<'a> {
    units: HashMap<&'a Unit, usize>,
    headers: HashMap<(&'a str, &'a str), usize>,
    header_names: HashMap<&'a str, usize>,
}

impl<'a> ProvideIndex<'a> {
    /// Finds the file providing `unit` to a file compiled into `library`.
    ///
    /// A header is taken from the requiring file's own library first, then
    /// from the first file in the set providing it from any other library.
    fn get(&self, unit: &'a Unit, library: &'a str) -> Option<usize> {
        match unit {
            Unit::Design { .. } => self.units.get(unit).copied(),
            Unit::Header(name) => self
                .headers
                .get(&(library, name.as_str()))
                .or_else(|| self.header_names.get(name.as_str()))
                .copied(),
        }
    }

    /// Returns the file already recorded as providing `unit` from `library`.
    fn get_provider(&self, unit: &'a Unit, library: &'a str) -> Option<usize> {
        match unit {
            Unit::Design { .. } => self.units.get(unit).copied(),
            Unit::Header(name) => self.headers.get(&(library, name.as_str())).copied(),
        }
    }

    fn insert(&mut self, unit: &'a Unit, library: &'a str, i: usize) {
        match unit {
            Unit::Design { .. } => {
                self.units.insert(unit, i);
            }
            Unit::Header(name) => {
                self.headers.insert((library, name.as_str()), i);
                self.header_names.entry(name.as_str()).or_insert(i);
            }
        }
    }
}

/// Maps every provided unit to the position of the one file providing it.
fn build_provide_index(files: &[SourceFile]) -> Result<ProvideIndex<'_>, Error> {
    let mut index = ProvideIndex::default();
    for (i, f) in files.iter().enumerate() {
        let provides = match f.get_state().get_provides() {
            Some(p) => p,
            None => continue,
        };
        for unit in provides {
            match index.get_provider(unit, f.get_library()) {
                None => index.insert(unit, f.get_library(), i),
                Some(j) => {
                    let other = &files[j];
                    if other.get_state().is_fixed() && f.get_state().is_fixed() {
                        tracing::debug!(
                            "ignoring duplicate unit {} from fixed file {}",
                            unit,
                            f
                        );
                        continue;
                    }
                    return Err(Error::UnitConflict(
                        unit.to_string(),
                        other.get_path().clone(),
                        f.get_path().clone(),
                    ));
                }
            }
        }
    }
    Ok(index)
}

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

//! Standard-library namespaces that never produce requirements.
//!
//! Each tool ships its own precompiled libraries. A `use` clause naming one of
//! them is assumed satisfied and is dropped during extraction.

use super::context::{Action, SimTool, SynTarget};
use std::collections::BTreeSet;

const MINIMAL_LIBS: &[&str] = &["std", "ieee"];

const MODELSIM_LIBS: &[&str] = &["ieee", "std"];

const ISIM_LIBS: &[&str] = &[
    "std",
    "ieee",
    "ieee_proposed",
    "vl",
    "synopsys",
    "simprim",
    "unisim",
    "unimacro",
    "aim",
    "cpld",
    "pls",
    "xilinxcorelib",
    "aim_ver",
    "cpld_ver",
    "simprims_ver",
    "unisims_ver",
    "uni9000_ver",
    "unimacro_ver",
    "xilinxcorelib_ver",
    "secureip",
];

const ISE_LIBS: &[&str] = &[
    "ieee",
    "ieee_proposed",
    "ise",
    "simprims",
    "std",
    "synopsys",
    "unimacro",
    "unisim",
    "xilinxcorelib",
];

const QUARTUS_LIBS: &[&str] = &["altera", "altera_mf", "lpm", "ieee", "std"];

/// A case-insensitive set of library names.
#[derive(Debug, PartialEq, Clone)]
pub struct StdLibs(BTreeSet<String>);

impl StdLibs {
    fn from_table(table: &[&str]) -> Self {
        Self(table.iter().map(|s| s.to_lowercase()).collect())
    }

    pub fn minimal() -> Self {
        Self::from_table(MINIMAL_LIBS)
    }

    pub fn modelsim() -> Self {
        Self::from_table(MODELSIM_LIBS)
    }

    pub fn isim() -> Self {
        Self::from_table(ISIM_LIBS)
    }

    pub fn ise() -> Self {
        Self::from_table(ISE_LIBS)
    }

    pub fn quartus() -> Self {
        Self::from_table(QUARTUS_LIBS)
    }

    /// Reads the library names listed under the `[Library]` section of a
    /// simulator ini file (`modelsim.ini`, `xilinxsim.ini`).
    ///
    /// The `others` key points at another ini file and is not a library.
    pub fn from_ini(text: &str) -> Self {
        let mut libs = BTreeSet::new();
        let mut in_section = false;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                in_section = line.eq_ignore_ascii_case("[library]");
                continue;
            }
            if in_section == false {
                continue;
            }
            if let Some((key, _)) = line.split_once('=') {
                let key = key.trim().to_lowercase();
                if key.is_empty() == false && key != "others" {
                    libs.insert(key);
                }
            }
        }
        Self(libs)
    }

    /// Picks the set to exclude for the given `action`.
    ///
    /// `sim_ini` holds the contents of the simulator's ini file when one was
    /// found; it takes precedence over the built-in tables for `vsim`/`isim`.
    pub fn select(action: &Action, sim_ini: Option<&str>) -> Self {
        match action {
            Action::Simulation(tool) => match (tool, sim_ini) {
                (SimTool::Vsim | SimTool::Isim, Some(ini)) => Self::from_ini(ini),
                (SimTool::Vsim, None) => Self::modelsim(),
                (SimTool::Isim, None) => Self::isim(),
                (SimTool::Other(name), _) => {
                    tracing::warn!(
                        "could not determine standard libraries for simulator {:?}; defaulting to modelsim",
                        name
                    );
                    Self::modelsim()
                }
            },
            Action::Synthesis(SynTarget::Xilinx) => Self::ise(),
            Action::Synthesis(SynTarget::Altera) => Self::quartus(),
            Action::Synthesis(SynTarget::Other(_)) | Action::Unspecified => Self::minimal(),
        }
    }

    /// Checks if `name` is a standard library, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StdLibs {
    fn default() -> Self {
        Self::minimal()
    }
}

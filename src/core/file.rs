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

//! Files on disk and their classification by extension.

use crate::util::filesystem;
use serde_derive::Serialize;
use std::fmt::Display;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// A file referenced by a module.
///
/// Identity is decided by the normalized absolute path alone.
#[derive(Debug, Clone, Eq, PartialOrd, Ord)]
pub struct File {
    path: PathBuf,
}

impl PartialEq for File {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Hash for File {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl File {
    /// Creates a new `File` by normalizing `path` against `root` when it is relative.
    pub fn new<P: AsRef<Path>>(root: &Path, path: P) -> Self {
        Self {
            path: filesystem::normalize(root, path),
        }
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    /// The final path component, including the extension.
    pub fn get_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// The file name without its extension.
    pub fn get_purename(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// The directory containing the file.
    pub fn get_dirname(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// The extension token after the final '.', if any.
    pub fn get_extension(&self) -> Option<&str> {
        self.path.extension().and_then(|s| s.to_str())
    }
}

impl Display for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", filesystem::into_std_str(&self.path))
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum FileKind {
    #[serde(rename = "VHDL")]
    Vhdl,
    #[serde(rename = "VLOG")]
    Verilog,
    #[serde(rename = "SYSV")]
    SystemVerilog,
    /// Xilinx user constraints.
    #[serde(rename = "UCF")]
    Ucf,
    /// Synopsys design constraints.
    #[serde(rename = "SDC")]
    Sdc,
    /// ChipScope definition and connection file.
    #[serde(rename = "CDC")]
    Cdc,
    /// SignalTap logic analyzer file.
    #[serde(rename = "STP")]
    SignalTap,
    /// Quartus IP file.
    #[serde(rename = "QIP")]
    Qip,
    /// Quartus design partition file.
    #[serde(rename = "DPF")]
    Dpf,
    #[serde(rename = "TCL")]
    Tcl,
    /// ISE project file.
    #[serde(rename = "XISE")]
    Xise,
    /// wbgen2 register description.
    #[serde(rename = "WB")]
    WbGen,
    /// Precompiled netlist.
    #[serde(rename = "NGC")]
    Netlist,
    #[serde(rename = "UNKNOWN")]
    Unrecognized,
}

/// Maps each known extension to exactly one kind.
const KIND_TABLE: &[(&str, FileKind)] = &[
    ("vhd", FileKind::Vhdl),
    ("vhdl", FileKind::Vhdl),
    ("vho", FileKind::Vhdl),
    ("v", FileKind::Verilog),
    ("vh", FileKind::Verilog),
    ("vo", FileKind::Verilog),
    ("vm", FileKind::Verilog),
    ("sv", FileKind::SystemVerilog),
    ("svh", FileKind::SystemVerilog),
    ("ucf", FileKind::Ucf),
    ("sdc", FileKind::Sdc),
    ("cdc", FileKind::Cdc),
    ("stp", FileKind::SignalTap),
    ("qip", FileKind::Qip),
    ("dpf", FileKind::Dpf),
    ("tcl", FileKind::Tcl),
    ("xise", FileKind::Xise),
    ("ise", FileKind::Xise),
    ("wb", FileKind::WbGen),
    ("ngc", FileKind::Netlist),
];

/// Header extensions that only exist to be included by other files.
const HEADER_EXTENSIONS: &[&str] = &["vh", "svh"];

impl FileKind {
    /// Classifies a path by its extension.
    ///
    /// The comparison is case-sensitive and total: anything outside the table is
    /// `Unrecognized`.
    pub fn classify<P: AsRef<Path>>(path: P) -> Self {
        let ext = match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some(e) => e,
            None => return Self::Unrecognized,
        };
        KIND_TABLE
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, k)| *k)
            .unwrap_or(Self::Unrecognized)
    }

    /// Checks if the kind is one of the HDL dialects whose text can be analyzed.
    pub fn is_hdl(&self) -> bool {
        match self {
            Self::Vhdl | Self::Verilog | Self::SystemVerilog => true,
            _ => false,
        }
    }

    /// Checks if files of this kind skip dependency analysis no matter their contents.
    pub fn is_always_fixed(&self) -> bool {
        self == &Self::Netlist
    }

    pub fn is_recognized(&self) -> bool {
        self != &Self::Unrecognized
    }
}

/// Checks if the path names a Verilog/SystemVerilog header.
pub fn is_header<P: AsRef<Path>>(path: P) -> bool {
    match path.as_ref().extension().and_then(|s| s.to_str()) {
        Some(e) => HEADER_EXTENSIONS.contains(&e),
        None => false,
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Vhdl => "VHDL",
                Self::Verilog => "VLOG",
                Self::SystemVerilog => "SYSV",
                Self::Ucf => "UCF",
                Self::Sdc => "SDC",
                Self::Cdc => "CDC",
                Self::SignalTap => "STP",
                Self::Qip => "QIP",
                Self::Dpf => "DPF",
                Self::Tcl => "TCL",
                Self::Xise => "XISE",
                Self::WbGen => "WB",
                Self::Netlist => "NGC",
                Self::Unrecognized => "UNKNOWN",
            }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classify_hdl() {
        assert_eq!(FileKind::classify("a/top.vhd"), FileKind::Vhdl);
        assert_eq!(FileKind::classify("top.vhdl"), FileKind::Vhdl);
        assert_eq!(FileKind::classify("gen.vho"), FileKind::Vhdl);
        assert_eq!(FileKind::classify("core.v"), FileKind::Verilog);
        assert_eq!(FileKind::classify("defs.vh"), FileKind::Verilog);
        assert_eq!(FileKind::classify("netlist.vm"), FileKind::Verilog);
        assert_eq!(FileKind::classify("pkg.sv"), FileKind::SystemVerilog);
        assert_eq!(FileKind::classify("pkg.svh"), FileKind::SystemVerilog);
    }

    #[test]
    fn classify_auxiliary() {
        assert_eq!(FileKind::classify("pins.ucf"), FileKind::Ucf);
        assert_eq!(FileKind::classify("proj.ise"), FileKind::Xise);
        assert_eq!(FileKind::classify("proj.xise"), FileKind::Xise);
        assert_eq!(FileKind::classify("core.ngc"), FileKind::Netlist);
        assert_eq!(FileKind::classify("core.ngc").is_always_fixed(), true);
        assert_eq!(FileKind::classify("run.tcl").is_hdl(), false);
    }

    #[test]
    fn classify_unrecognized() {
        assert_eq!(FileKind::classify("README.md"), FileKind::Unrecognized);
        assert_eq!(FileKind::classify("Makefile"), FileKind::Unrecognized);
        // extension token is case-sensitive
        assert_eq!(FileKind::classify("TOP.VHD"), FileKind::Unrecognized);
    }

    #[test]
    fn file_names() {
        let f = File::new(Path::new("/proj"), "rtl/./adder.vhd");
        assert_eq!(f.get_path(), &PathBuf::from("/proj/rtl/adder.vhd"));
        assert_eq!(f.get_name(), "adder.vhd");
        assert_eq!(f.get_purename(), "adder");
        assert_eq!(f.get_dirname(), Path::new("/proj/rtl"));
        assert_eq!(f.get_extension(), Some("vhd"));
    }

    #[test]
    fn file_identity_is_path() {
        let a = File::new(Path::new("/proj"), "rtl/adder.vhd");
        let b = File::new(Path::new("/proj/tb"), "../rtl/adder.vhd");
        assert_eq!(a, b);
    }

    #[test]
    fn headers() {
        assert_eq!(is_header("defs.vh"), true);
        assert_eq!(is_header("defs.svh"), true);
        assert_eq!(is_header("core.v"), false);
    }
}

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

//! Line-oriented extraction of the units a source file provides and requires.
//!
//! This is not a parser. VHDL files are scanned for `use` clauses and package
//! declarations; Verilog files are scanned for `` `include `` directives or handed
//! to an external dependency lister when one is configured.

use super::file::{self, File, FileKind};
use super::source::{DepState, SourceFile, Unit};
use super::stdlib::StdLibs;
use crate::error::{Error, LastError};
use crate::util::anyerror::{AnyError, Fault};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

/// Byte prefixes marking a file as vendor-encrypted, per kind.
///
/// A match turns the file into a fixed file without reading further.
const SIGNATURES: &[(FileKind, &[u8])] = &[(FileKind::Vhdl, b"Xlx")];

struct Patterns {
    use_clause: Regex,
    lib_clause: Regex,
    package: Regex,
    include: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        use_clause: Regex::new(r"^[ \t]*use[ \t]+([^; ]+)[ \t]*;").unwrap(),
        lib_clause: Regex::new(r"^([^.]+)\.([^.]+)\.all$").unwrap(),
        package: Regex::new(r"^[ \t]*package[ \t]+([^ \t]+)[ \t]+is\b").unwrap(),
        include: Regex::new(r#"^[ \t]*`include[ \t]+"([^ "]+)""#).unwrap(),
    })
}

/// An alternate strategy for discovering what a Verilog file requires.
pub trait DependencyLister {
    /// Returns the names of the files that `file` depends upon.
    fn list(
        &self,
        file: &Path,
        include_dirs: &[PathBuf],
        options: Option<&str>,
    ) -> Result<Vec<String>, Fault>;
}

/// Lists Verilog dependencies by asking Icarus Verilog to write them out.
#[derive(Debug, PartialEq, Clone)]
pub struct IverilogLister {
    command: String,
}

impl IverilogLister {
    pub const DEP_FILE: &'static str = "dependencies.list";

    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or(String::from("iverilog")),
        }
    }
}

impl DependencyLister for IverilogLister {
    fn list(
        &self,
        file: &Path,
        include_dirs: &[PathBuf],
        options: Option<&str>,
    ) -> Result<Vec<String>, Fault> {
        let tmp = tempfile::tempdir()?;
        let dep_file = tmp.path().join(Self::DEP_FILE);

        let mut proc = Command::new(&self.command);
        proc.args(["-DSIMULATE", "-Wno-timescale", "-t", "null"])
            .arg(format!("-M{}", dep_file.display()));
        for dir in include_dirs {
            proc.arg(format!("-y{}", dir.display()));
        }
        for dir in include_dirs {
            proc.arg(format!("-I{}", dir.display()));
        }
        if let Some(opts) = options {
            proc.args(opts.split_whitespace());
        }
        proc.arg(file);
        let output = proc.output()?;
        // elaboration errors still leave a usable list behind
        if dep_file.exists() == false {
            return Err(AnyError(format!(
                "{} did not produce a dependency list (exit code: {:?}): {}",
                self.command,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )))?;
        }
        let text = std::fs::read_to_string(&dep_file)?;
        Ok(parse_dependency_list(&text))
    }
}

/// Reads the unique entries of a dependency list written by the lister.
///
/// Newer tool versions prefix each line with a one-letter tag (`M`, `I`) which
/// is removed.
fn parse_dependency_list(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.lines()
        .map(|l| l.trim())
        .filter(|l| l.is_empty() == false)
        .map(|l| match l.split_once(' ') {
            Some((tag, rest)) if tag.len() == 1 => rest.trim(),
            _ => l,
        })
        .filter(|l| seen.insert(l.to_string()))
        .map(|l| l.to_string())
        .collect()
}

/// Everything extraction needs from the surrounding resolution run.
pub struct ExtractContext<'a> {
    std_libs: &'a StdLibs,
    include_dirs: &'a [PathBuf],
    lister: Option<&'a dyn DependencyLister>,
}

impl<'a> ExtractContext<'a> {
    pub fn new(std_libs: &'a StdLibs) -> Self {
        Self {
            std_libs: std_libs,
            include_dirs: &[],
            lister: None,
        }
    }

    /// Sets the module root directories handed to the dependency lister.
    pub fn include_dirs(mut self, dirs: &'a [PathBuf]) -> Self {
        self.include_dirs = dirs;
        self
    }

    pub fn lister(mut self, lister: Option<&'a dyn DependencyLister>) -> Self {
        self.lister = lister;
        self
    }
}

/// Checks the table of binary signatures against the leading bytes of a file.
pub fn has_signature(kind: &FileKind, bytes: &[u8]) -> bool {
    SIGNATURES
        .iter()
        .any(|(k, prefix)| k == kind && bytes.starts_with(prefix))
}

/// Determines the dependency state for a file of the given `kind` whose
/// contents are `bytes`.
pub fn extract(
    file: &File,
    kind: &FileKind,
    library: &str,
    options: Option<&str>,
    bytes: &[u8],
    ctx: &ExtractContext,
) -> DepState {
    if kind.is_always_fixed() == true || has_signature(kind, bytes) == true {
        return DepState::fixed();
    }
    match kind {
        FileKind::Vhdl => match std::str::from_utf8(bytes) {
            Ok(text) => extract_vhdl(text, library, ctx.std_libs),
            Err(e) => {
                tracing::warn!("skipping dependency scan of {}: {}", file, e);
                DepState::Analyzable {
                    provides: BTreeSet::new(),
                    requires: BTreeSet::new(),
                }
            }
        },
        FileKind::Verilog | FileKind::SystemVerilog => {
            extract_verilog(file, options, bytes, ctx)
        }
        _ => DepState::Auxiliary,
    }
}

/// Scans VHDL text for package declarations and `use` clauses.
fn extract_vhdl(text: &str, library: &str, std_libs: &StdLibs) -> DepState {
    let pats = patterns();
    let library = library.to_lowercase();
    // identifiers and keywords are case-insensitive in VHDL
    let lines: Vec<String> = text.lines().map(|l| l.to_lowercase()).collect();

    let provides: BTreeSet<Unit> = lines
        .iter()
        .filter_map(|l| pats.package.captures(l))
        .map(|c| Unit::design(&library, &c[1]))
        .collect();

    let mut requires = BTreeSet::new();
    for line in &lines {
        let clause = match pats.use_clause.captures(line) {
            Some(c) => c,
            None => continue,
        };
        let caps = match pats.lib_clause.captures(&clause[1]) {
            Some(c) => c,
            None => continue,
        };
        if std_libs.contains(&caps[1]) == true {
            continue;
        }
        // `work` always refers to the library this file is compiled into
        let namespace = match &caps[1] {
            "work" => library.as_str(),
            ns => ns,
        };
        let unit = Unit::design(namespace, &caps[2]);
        if provides.contains(&unit) == false {
            requires.insert(unit);
        }
    }
    DepState::Analyzable {
        provides: provides,
        requires: requires,
    }
}

/// Determines Verilog requirements with exactly one strategy: the configured
/// lister, or a scan for include directives.
fn extract_verilog(
    file: &File,
    options: Option<&str>,
    bytes: &[u8],
    ctx: &ExtractContext,
) -> DepState {
    let own = Unit::header(file.get_name());
    let names: Vec<String> = match ctx.lister {
        Some(lister) => {
            // headers only exist to be included
            if file::is_header(file.get_path()) == true {
                Vec::new()
            } else {
                let mut dirs = vec![file.get_dirname().to_path_buf()];
                ctx.include_dirs.iter().for_each(|d| {
                    if dirs.contains(d) == false {
                        dirs.push(d.clone());
                    }
                });
                match lister.list(file.get_path(), &dirs, options) {
                    Ok(names) => names,
                    Err(e) => {
                        tracing::warn!("failed to list dependencies of {}: {}", file, e);
                        Vec::new()
                    }
                }
            }
        }
        None => match std::str::from_utf8(bytes) {
            // identifiers are case-sensitive in Verilog
            Ok(text) => text
                .lines()
                .filter_map(|l| patterns().include.captures(l))
                .map(|c| c[1].to_string())
                .collect(),
            Err(e) => {
                tracing::warn!("skipping dependency scan of {}: {}", file, e);
                Vec::new()
            }
        },
    };
    let requires = names
        .iter()
        .map(|n| Unit::header(n))
        .filter(|u| u != &own)
        .collect();
    DepState::Analyzable {
        provides: BTreeSet::from([own]),
        requires: requires,
    }
}

/// Reads a declared file from disk and builds its `SourceFile`.
///
/// Returns `None` for unrecognized extensions, which take no part in the build.
pub fn load_source_file(
    file: File,
    library: Option<&str>,
    options: Option<String>,
    ctx: &ExtractContext,
) -> Result<Option<SourceFile>, Error> {
    let kind = FileKind::classify(file.get_path());
    if kind.is_recognized() == false {
        tracing::debug!("ignoring unrecognized file {}", file);
        return Ok(None);
    }
    let state = match kind.is_hdl() {
        true => {
            let bytes = std::fs::read(file.get_path()).map_err(|e| {
                Error::SourceUnreadable(file.get_path().clone(), LastError(e.to_string()))
            })?;
            let lib = library.unwrap_or(super::source::DEFAULT_LIBRARY);
            extract(&file, &kind, lib, options.as_deref(), &bytes, ctx)
        }
        false => match kind.is_always_fixed() {
            true => DepState::fixed(),
            false => DepState::Auxiliary,
        },
    };
    if let Some(provides) = state.get_provides() {
        tracing::debug!("{} provides {:?}", file, provides);
    }
    if let Some(requires) = state.get_requires() {
        tracing::debug!("{} requires {:?}", file, requires);
    }
    Ok(Some(SourceFile::new(file, kind, library, state).options(options)))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    fn vhdl_file(name: &str) -> File {
        File::new(Path::new("/proj"), name)
    }

    fn provides(state: &DepState) -> Vec<String> {
        state
            .get_provides()
            .unwrap()
            .iter()
            .map(|u| u.to_string())
            .collect()
    }

    fn requires(state: &DepState) -> Vec<String> {
        state
            .get_requires()
            .unwrap()
            .iter()
            .map(|u| u.to_string())
            .collect()
    }

    const PKG_A: &str = "\
library ieee;
use ieee.std_logic_1164.all;
use IEEE.Numeric_Std.ALL;

package Pkg_A is
    constant WIDTH : natural := 8;
end package;

package body pkg_a is
end package body;
";

    #[test]
    fn vhdl_package_provides() {
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("pkg_a.vhd"),
            &FileKind::Vhdl,
            "work",
            None,
            PKG_A.as_bytes(),
            &ctx,
        );
        assert_eq!(provides(&state), vec!["work.pkg_a"]);
        // standard libraries never become requirements
        assert_eq!(requires(&state), Vec::<String>::new());
    }

    #[test]
    fn vhdl_use_clauses() {
        let text = "\
library gencores;
use gencores.gencores_pkg.all;
  use work.pkg_a.all; -- trailing comment
use work.local_pkg.all;
use work.pkg_a.some_constant;
package local_pkg is
end package;
";
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("top.vhd"),
            &FileKind::Vhdl,
            "Work",
            None,
            text.as_bytes(),
            &ctx,
        );
        assert_eq!(provides(&state), vec!["work.local_pkg"]);
        // own package and non-`all` selections are skipped
        assert_eq!(requires(&state), vec!["gencores.gencores_pkg", "work.pkg_a"]);
    }

    #[test]
    fn vhdl_work_maps_to_file_library() {
        let text = "use work.regs_pkg.all;\nuse common.util_pkg.all;\n";
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("core.vhd"),
            &FileKind::Vhdl,
            "wishbone",
            None,
            text.as_bytes(),
            &ctx,
        );
        assert_eq!(requires(&state), vec!["common.util_pkg", "wishbone.regs_pkg"]);
    }

    #[test]
    fn vendor_libraries_excluded() {
        let text = "use unisim.vcomponents.all;\n";
        let libs = StdLibs::ise();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("io.vhd"),
            &FileKind::Vhdl,
            "work",
            None,
            text.as_bytes(),
            &ctx,
        );
        assert_eq!(requires(&state), Vec::<String>::new());

        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("io.vhd"),
            &FileKind::Vhdl,
            "work",
            None,
            text.as_bytes(),
            &ctx,
        );
        assert_eq!(requires(&state), vec!["unisim.vcomponents"]);
    }

    #[test]
    fn encrypted_vhdl_is_fixed() {
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("ip.vhd"),
            &FileKind::Vhdl,
            "work",
            None,
            b"Xlx\x00\x01\x02 use work.hidden.all;",
            &ctx,
        );
        assert_eq!(state, DepState::fixed());
        // the signature only applies to VHDL
        assert_eq!(has_signature(&FileKind::Verilog, b"Xlx"), false);
    }

    #[test]
    fn undecodable_vhdl_is_empty() {
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("bad.vhd"),
            &FileKind::Vhdl,
            "work",
            None,
            &[0x70, 0xff, 0xfe, 0x0a],
            &ctx,
        );
        assert_eq!(state.is_analyzable(), true);
        assert_eq!(provides(&state).len(), 0);
        assert_eq!(requires(&state).len(), 0);
    }

    #[test]
    fn verilog_includes() {
        let text = "\
`include \"defs.vh\"
  `include \"inc/bus.svh\" // bus types
// `include \"commented.vh\"
`include \"core.v\"
module core; endmodule
";
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);
        let state = extract(
            &vhdl_file("rtl/core.v"),
            &FileKind::Verilog,
            "work",
            None,
            text.as_bytes(),
            &ctx,
        );
        assert_eq!(provides(&state), vec!["`include \"core.v\""]);
        assert_eq!(
            requires(&state),
            vec!["`include \"bus.svh\"", "`include \"defs.vh\""]
        );
    }

    /// Records every request and answers with a fixed list.
    struct FakeLister {
        calls: RefCell<Vec<(PathBuf, Vec<PathBuf>, Option<String>)>>,
        answer: Vec<String>,
    }

    impl DependencyLister for FakeLister {
        fn list(
            &self,
            file: &Path,
            include_dirs: &[PathBuf],
            options: Option<&str>,
        ) -> Result<Vec<String>, Fault> {
            self.calls.borrow_mut().push((
                file.to_path_buf(),
                include_dirs.to_vec(),
                options.map(|s| s.to_string()),
            ));
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn verilog_lister_replaces_scan() {
        let lister = FakeLister {
            calls: RefCell::new(Vec::new()),
            answer: vec!["/mods/a/fifo.v".to_string(), "/proj/rtl/top.v".to_string()],
        };
        let roots = vec![PathBuf::from("/mods/a"), PathBuf::from("/proj/rtl")];
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs)
            .include_dirs(&roots)
            .lister(Some(&lister));
        let state = extract(
            &vhdl_file("rtl/top.v"),
            &FileKind::Verilog,
            "work",
            Some("+define+FAST"),
            b"`include \"ignored.vh\"\n",
            &ctx,
        );
        // the include scan is not run when a lister is configured
        assert_eq!(requires(&state), vec!["`include \"fifo.v\""]);
        let calls = lister.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/proj/rtl/top.v"));
        assert_eq!(
            calls[0].1,
            vec![PathBuf::from("/proj/rtl"), PathBuf::from("/mods/a")]
        );
        assert_eq!(calls[0].2, Some("+define+FAST".to_string()));
    }

    #[test]
    fn verilog_lister_skips_headers() {
        let lister = FakeLister {
            calls: RefCell::new(Vec::new()),
            answer: vec!["x.v".to_string()],
        };
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs).lister(Some(&lister));
        let state = extract(
            &vhdl_file("defs.vh"),
            &FileKind::Verilog,
            "work",
            None,
            b"",
            &ctx,
        );
        assert_eq!(requires(&state).len(), 0);
        assert_eq!(lister.calls.borrow().len(), 0);
    }

    #[test]
    fn dependency_list_format() {
        let text = "/a/fifo.v\nM /a/ram.v\n\nI /a/defs.vh\n/a/fifo.v\n";
        assert_eq!(
            parse_dependency_list(text),
            vec!["/a/fifo.v", "/a/ram.v", "/a/defs.vh"]
        );
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pkg.vhd"), PKG_A).unwrap();
        std::fs::write(dir.path().join("core.ngc"), [0u8, 1, 2]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let libs = StdLibs::minimal();
        let ctx = ExtractContext::new(&libs);

        let sf = load_source_file(File::new(dir.path(), "pkg.vhd"), Some("lib"), None, &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(sf.get_library(), "lib");
        assert_eq!(provides(sf.get_state()), vec!["lib.pkg_a"]);

        let sf = load_source_file(File::new(dir.path(), "core.ngc"), None, None, &ctx)
            .unwrap()
            .unwrap();
        assert_eq!(sf.get_state().is_fixed(), true);

        assert_eq!(
            load_source_file(File::new(dir.path(), "notes.txt"), None, None, &ctx).unwrap(),
            None
        );
        assert!(load_source_file(File::new(dir.path(), "missing.vhd"), None, None, &ctx).is_err());
    }
}

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

//! The whole resolution pipeline: modules, then files, then their order.

use super::context::ResolveContext;
use super::fetch::Backends;
use super::manifest::ManifestLoader;
use super::module::Origin;
use super::pool::ModulePool;
use super::solver::{self, Unresolved};
use super::source::SourceFileSet;
use crate::error::Error;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A fully resolved build ready to hand to an emitter.
#[derive(Debug, PartialEq)]
pub struct BuildSet {
    order: SourceFileSet,
    libraries: BTreeSet<String>,
    unresolved: Vec<Unresolved>,
    modules: Vec<(String, PathBuf)>,
}

impl BuildSet {
    /// The files in compilation order.
    pub fn get_order(&self) -> &SourceFileSet {
        &self.order
    }

    /// Every library an HDL file in the build is compiled into.
    pub fn get_libraries(&self) -> &BTreeSet<String> {
        &self.libraries
    }

    pub fn get_unresolved(&self) -> &Vec<Unresolved> {
        &self.unresolved
    }

    /// Each module's identity and local directory, in discovery order.
    pub fn get_modules(&self) -> &Vec<(String, PathBuf)> {
        &self.modules
    }
}

/// Resolves the module tree at `root` and orders every file it declares.
///
/// Nothing is returned unless every module was fetched and the files could be
/// fully ordered.
pub fn resolve_build(
    root: Origin,
    backends: &Backends,
    loader: &dyn ManifestLoader,
    ctx: &ResolveContext,
) -> Result<BuildSet, Error> {
    let pool = ModulePool::resolve(root, backends, loader, ctx)?;
    if pool.is_everything_fetched() == false {
        if let Some(m) = pool.iter().find(|m| m.is_fetched() == false) {
            return Err(Error::ModuleNotFetched(m.get_identity().to_string()));
        }
    }
    let files = pool.merge(ctx)?;
    let (order, unresolved) = solver::solve(files)?.into_parts();
    let modules = pool
        .iter()
        .filter_map(|m| {
            m.get_path()
                .map(|p| (m.get_identity().to_string(), p.clone()))
        })
        .collect();
    Ok(BuildSet {
        libraries: order.get_libraries(),
        order: order,
        unresolved: unresolved,
        modules: modules,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::fetch::LocalBackend;
    use crate::core::manifest::{TomlLoader, MANIFEST_FILE};
    use crate::core::module::OriginKind;
    use std::path::Path;

    fn write(root: &Path, name: &str, text: &str) {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    /// A top-level design using a package from a library module, with a
    /// constraints file and a precompiled netlist.
    fn workspace() -> tempfile::TempDir {
        let ws = tempfile::tempdir().unwrap();
        write(
            ws.path(),
            &format!("top/{}", MANIFEST_FILE),
            r#"
files = ["tb.vhd", "top.vhd", "pins.ucf", "ip/core.ngc"]
[modules]
local = ["../gencores"]
"#,
        );
        write(
            ws.path(),
            "top/top.vhd",
            "library gencores;\nuse gencores.gencores_pkg.all;\nuse work.top_pkg.all;\npackage top_pkg is\nend package;\n",
        );
        write(
            ws.path(),
            "top/tb.vhd",
            "use work.top_pkg.all;\nuse unisim.vcomponents.all;\nentity tb is end entity;\n",
        );
        write(ws.path(), "top/pins.ucf", "NET clk LOC = A1;\n");
        write(ws.path(), "top/ip/core.ngc", "\u{0}\u{1}");
        write(
            ws.path(),
            &format!("gencores/{}", MANIFEST_FILE),
            "library = \"gencores\"\nfiles = [\"rtl/*.vhd\"]\n",
        );
        write(
            ws.path(),
            "gencores/rtl/gencores_pkg.vhd",
            "use work.util_pkg.all;\npackage gencores_pkg is\nend package;\n",
        );
        write(
            ws.path(),
            "gencores/rtl/util_pkg.vhd",
            "package util_pkg is\nend package;\n",
        );
        ws
    }

    #[test]
    fn full_pipeline() {
        let ws = workspace();
        let backends = Backends::new().with(OriginKind::Local, Box::new(LocalBackend));
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let build = resolve_build(
            Origin::local(ws.path().join("top")).unwrap(),
            &backends,
            &TomlLoader,
            &ctx,
        )
        .unwrap();

        let names: Vec<&str> = build
            .get_order()
            .iter()
            .map(|f| f.get_file().get_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "core.ngc",
                "util_pkg.vhd",
                "gencores_pkg.vhd",
                "top.vhd",
                "tb.vhd",
                "pins.ucf"
            ]
        );
        assert_eq!(
            build.get_libraries().iter().collect::<Vec<&String>>(),
            vec!["gencores", "work"]
        );
        assert_eq!(build.get_modules().len(), 2);
        // the vendor library is not provided by anything in the build
        assert_eq!(build.get_unresolved().len(), 1);
        assert_eq!(build.get_unresolved()[0].get_unit(), "unisim.vcomponents");
    }

    #[test]
    fn pipeline_is_repeatable() {
        let ws = workspace();
        let backends = Backends::new().with(OriginKind::Local, Box::new(LocalBackend));
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let run = || -> Vec<PathBuf> {
            resolve_build(
                Origin::local(ws.path().join("top")).unwrap(),
                &backends,
                &TomlLoader,
                &ctx,
            )
            .unwrap()
            .get_order()
            .iter()
            .map(|f| f.get_path().clone())
            .collect()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn missing_source_aborts() {
        let ws = workspace();
        std::fs::remove_file(ws.path().join("top/tb.vhd")).unwrap();
        let backends = Backends::new().with(OriginKind::Local, Box::new(LocalBackend));
        let ctx = ResolveContext::new(ws.path().join("cache"));
        match resolve_build(
            Origin::local(ws.path().join("top")).unwrap(),
            &backends,
            &TomlLoader,
            &ctx,
        ) {
            Err(Error::SourceUnreadable(path, _)) => {
                assert_eq!(path, ws.path().join("top/tb.vhd"))
            }
            other => panic!("expected an unreadable source, got {:?}", other),
        }
    }
}

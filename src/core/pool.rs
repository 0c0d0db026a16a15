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

//! Discovery and fetching of every module reachable from a root module.

use super::context::ResolveContext;
use super::extract;
use super::fetch::Backends;
use super::file::FileKind;
use super::manifest::{ManifestLoader, ModuleManifest};
use super::module::{FetchState, Identity, Module, Origin};
use super::source::SourceFileSet;
use crate::error::{Error, LastError};
use crate::util::filesystem;
use crate::util::graphmap::GraphMap;
use std::collections::VecDeque;
use std::path::PathBuf;

/// Exactly one module per identity, connected by the references between them.
pub struct ModulePool {
    graph: GraphMap<Identity, Module, ()>,
}

impl ModulePool {
    /// Fetches the module at `root` and, transitively, every module it references.
    ///
    /// Modules are processed in discovery order. A reference to an identity already
    /// in the pool is not fetched again, which also ends any cycle among modules.
    /// The first failure aborts the whole run.
    pub fn resolve(
        root: Origin,
        backends: &Backends,
        loader: &dyn ManifestLoader,
        ctx: &ResolveContext,
    ) -> Result<Self, Error> {
        let mut pool = Self {
            graph: GraphMap::new(),
        };
        let root_id = root.to_identity();
        pool.graph.add_node(root_id.clone(), Module::new(root, None));

        let mut processing = VecDeque::from([(root_id, ctx.get_fetch_to().clone())]);
        while let Some((iden, fetch_to)) = processing.pop_front() {
            let (path, manifest) = pool.fetch_module(&iden, &fetch_to, backends, loader)?;

            let children = manifest
                .get_modules()
                .iter()
                .map(|(kind, text)| Origin::parse(kind, text, &path))
                .collect::<Result<Vec<Origin>, Error>>()?;
            // children are placed next to where this module asks for them
            let child_fetch_to = match manifest.get_fetch_to() {
                Some(p) => filesystem::normalize(&path, p),
                None => ctx.get_fetch_to().clone(),
            };

            for child in &children {
                let child_id = child.to_identity();
                match pool.graph.get_node_by_key(&child_id) {
                    Some(existing) => {
                        let recorded = existing.as_ref().get_origin();
                        if recorded != child {
                            return Err(Error::ModuleConflict(
                                child_id.to_string(),
                                recorded.to_string(),
                                child.to_string(),
                            ));
                        }
                        tracing::debug!("module {} is already in the pool", child_id);
                    }
                    None => {
                        tracing::debug!("discovered module {} from {}", child_id, iden);
                        pool.graph.add_node(
                            child_id.clone(),
                            Module::new(child.clone(), Some(iden.clone())),
                        );
                        processing.push_back((child_id.clone(), child_fetch_to.clone()));
                    }
                }
                pool.graph.add_edge_by_key(&iden, &child_id, ());
            }
            if let Some(node) = pool.graph.get_node_by_key_mut(&iden) {
                node.as_ref_mut().set_manifest(manifest, children);
            }
        }
        tracing::info!("resolved {} modules", pool.graph.node_count());
        Ok(pool)
    }

    /// Runs the backend for the module `iden` and loads its manifest.
    fn fetch_module(
        &mut self,
        iden: &Identity,
        fetch_to: &PathBuf,
        backends: &Backends,
        loader: &dyn ManifestLoader,
    ) -> Result<(PathBuf, ModuleManifest), Error> {
        let module = match self.graph.get_node_by_key_mut(iden) {
            Some(n) => n.as_ref_mut(),
            None => return Err(Error::ModuleNotFetched(iden.to_string())),
        };
        let backend = match backends.get(iden.get_kind()) {
            Some(b) => b,
            None => {
                module.set_state(FetchState::Error);
                return Err(Error::MissingBackend(iden.get_kind().to_string()));
            }
        };
        module.set_state(FetchState::Fetching);
        tracing::debug!("fetching module {}", module.get_origin());
        let path = match backend.fetch(module.get_origin(), fetch_to) {
            Ok(p) => p,
            Err(e) => {
                module.set_state(FetchState::Error);
                return Err(Error::FetchFailed(
                    iden.to_string(),
                    LastError(e.to_string()),
                ));
            }
        };
        module.set_fetched(path.clone());
        tracing::debug!("fetched module {} to {}", iden, path.display());

        let manifest = loader
            .load(&path)
            .map_err(|e| Error::ManifestFailed(iden.to_string(), LastError(e.to_string())))?;
        Ok((path, manifest))
    }

    /// Checks if every module in the pool reached the fetched state.
    pub fn is_everything_fetched(&self) -> bool {
        self.graph.iter().all(|m| m.is_fetched() == true)
    }

    /// The modules in the order they were discovered, beginning with the root.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.graph.iter()
    }

    pub fn get_root(&self) -> Option<&Module> {
        self.graph.get_node_by_index(0).map(|n| n.as_ref())
    }

    pub fn get(&self, iden: &Identity) -> Option<&Module> {
        self.graph.get_node_by_key(iden).map(|n| n.as_ref())
    }

    /// The identities of the modules that `iden` references.
    pub fn get_references(&self, iden: &Identity) -> Vec<&Identity> {
        self.graph.successors(iden)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Collects the source files declared by every module into one set.
    ///
    /// Modules are visited in discovery order and a path already in the set is
    /// never replaced. Each file is compiled into the library its entry names,
    /// else its module's library.
    pub fn merge(&self, ctx: &ResolveContext) -> Result<SourceFileSet, Error> {
        if let Some(m) = self.iter().find(|m| m.is_fetched() == false) {
            return Err(Error::ModuleNotFetched(m.get_identity().to_string()));
        }
        let roots: Vec<PathBuf> = self.iter().filter_map(|m| m.get_path().cloned()).collect();
        let ext = ctx.extract_context(&roots);

        let mut set = SourceFileSet::new();
        for module in self.iter() {
            let (path, manifest) = match (module.get_path(), module.get_manifest()) {
                (Some(p), Some(m)) => (p, m),
                _ => return Err(Error::ModuleNotFetched(module.get_identity().to_string())),
            };
            let declared = manifest.expand_files(path).map_err(|e| {
                Error::ManifestFailed(
                    module.get_identity().to_string(),
                    LastError(e.to_string()),
                )
            })?;
            for (file, decl) in declared {
                if set.contains(file.get_path()) == true {
                    tracing::debug!("{} is already declared by an earlier module", file);
                    continue;
                }
                let library = decl
                    .get_library()
                    .or(manifest.get_library())
                    .map(|s| s.as_str());
                let options = match decl.get_options() {
                    Some(o) => Some(o.clone()),
                    None => match FileKind::classify(file.get_path()) {
                        FileKind::Vhdl => manifest.get_vcom_opt().cloned(),
                        FileKind::Verilog | FileKind::SystemVerilog => {
                            manifest.get_vlog_opt().cloned()
                        }
                        _ => None,
                    },
                };
                if let Some(sf) = extract::load_source_file(file, library, options, &ext)? {
                    set.add(sf);
                }
            }
        }
        tracing::info!("merged {} files from {} modules", set.len(), self.len());
        Ok(set)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::fetch::{FetchBackend, LocalBackend};
    use crate::core::manifest::{TomlLoader, MANIFEST_FILE};
    use crate::core::module::OriginKind;
    use crate::util::anyerror::{AnyError, Fault};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;
    use std::rc::Rc;

    /// Serves version-controlled origins from local directories and counts the calls.
    struct FakeVcs {
        repos: HashMap<String, PathBuf>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl FakeVcs {
        fn new(repos: &[(&str, &Path)]) -> Self {
            Self {
                repos: repos
                    .iter()
                    .map(|(u, p)| (u.to_string(), p.to_path_buf()))
                    .collect(),
                calls: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl FetchBackend for FakeVcs {
        fn fetch(&self, origin: &Origin, _: &Path) -> Result<PathBuf, Fault> {
            self.calls.borrow_mut().push(origin.to_string());
            match self.repos.get(origin.get_location()) {
                Some(p) => Ok(p.clone()),
                None => Err(AnyError(format!("repository not found")))?,
            }
        }
    }

    fn write_module(root: &Path, name: &str, manifest: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    fn backends(vcs: FakeVcs) -> Backends {
        Backends::new()
            .with(OriginKind::Local, Box::new(LocalBackend))
            .with(OriginKind::Git, Box::new(vcs))
    }

    #[test]
    fn shared_module_is_fetched_once() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(ws.path(), "top", "[modules]\nlocal = [\"../a\", \"../b\"]\n");
        write_module(ws.path(), "a", "[modules]\ngit = [\"https://h/hdl/common.git\"]\n");
        write_module(ws.path(), "b", "[modules]\ngit = [\"https://h/hdl/common/\"]\n");
        let common = write_module(ws.path(), "common", "");

        let vcs = FakeVcs::new(&[("https://h/hdl/common", &common)]);
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let backends = backends(vcs);
        let pool =
            ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx).unwrap();

        assert_eq!(pool.len(), 4);
        assert_eq!(pool.is_everything_fetched(), true);
        let order: Vec<String> = pool
            .iter()
            .map(|m| m.get_origin().get_basename().to_string())
            .collect();
        assert_eq!(order, vec!["top", "a", "b", "common"]);
        let common_id = pool.iter().last().unwrap().get_identity();
        assert_eq!(
            pool.get(&common_id).unwrap().get_parent().unwrap().get_location(),
            filesystem::into_std_str(&ws.path().join("a"))
        );
    }

    #[test]
    fn shared_module_fetch_count() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(
            ws.path(),
            "top",
            "[modules]\ngit = [\"https://h/x\", \"https://h/y\"]\n",
        );
        let x = write_module(ws.path(), "x", "[modules]\ngit = [\"https://h/z\"]\n");
        let y = write_module(ws.path(), "y", "[modules]\ngit = [\"https://h/z.git\"]\n");
        let z = write_module(ws.path(), "z", "");
        let vcs = FakeVcs::new(&[("https://h/x", &x), ("https://h/y", &y), ("https://h/z", &z)]);
        let calls = vcs.calls.clone();
        let ctx = ResolveContext::new(ws.path().join("cache"));
        ModulePool::resolve(Origin::local(&top).unwrap(), &backends(vcs), &TomlLoader, &ctx)
            .unwrap();
        assert_eq!(
            calls.borrow().clone(),
            vec!["git+https://h/x", "git+https://h/y", "git+https://h/z"]
        );
    }

    #[test]
    fn module_cycle_terminates() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(ws.path(), "top", "[modules]\nlocal = [\"../a\"]\n");
        write_module(ws.path(), "a", "[modules]\nlocal = [\"../top/\"]\n");
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let backends = backends(FakeVcs::new(&[]));
        let pool =
            ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx).unwrap();
        assert_eq!(pool.len(), 2);
        let root = pool.get_root().unwrap().get_identity();
        assert_eq!(pool.get_references(&root).len(), 1);
    }

    #[test]
    fn remote_cycle_fetches_each_once() {
        let ws = tempfile::tempdir().unwrap();
        let a = write_module(ws.path(), "a", "[modules]\ngit = [\"https://h/b\"]\n");
        let b = write_module(ws.path(), "b", "[modules]\ngit = [\"https://h/a.git\"]\n");
        let vcs = FakeVcs::new(&[("https://h/a", &a), ("https://h/b", &b)]);
        let calls = vcs.calls.clone();
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let root = Origin::parse(OriginKind::Git, "https://h/a", ws.path()).unwrap();
        let pool = ModulePool::resolve(root, &backends(vcs), &TomlLoader, &ctx).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.is_everything_fetched(), true);
        assert_eq!(calls.borrow().clone(), vec!["git+https://h/a", "git+https://h/b"]);
        assert_eq!(pool.get_root().unwrap().get_children().len(), 1);
    }

    #[test]
    fn revision_mismatch_conflicts() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(ws.path(), "top", "[modules]\nlocal = [\"../a\", \"../b\"]\n");
        write_module(ws.path(), "a", "[modules]\ngit = [\"https://h/common::v1\"]\n");
        write_module(ws.path(), "b", "[modules]\ngit = [\"https://h/common::v2\"]\n");
        let common = write_module(ws.path(), "common", "");
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let backends = backends(FakeVcs::new(&[("https://h/common", &common)]));
        assert_eq!(
            ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx).err(),
            Some(Error::ModuleConflict(
                String::from("git+https://h/common"),
                String::from("git+https://h/common::v1"),
                String::from("git+https://h/common::v2"),
            ))
        );
    }

    #[test]
    fn fetch_failures_abort() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(ws.path(), "top", "[modules]\ngit = [\"https://h/gone\"]\n");
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let backends = backends(FakeVcs::new(&[]));
        assert_eq!(
            ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx).err(),
            Some(Error::FetchFailed(
                String::from("git+https://h/gone"),
                LastError(String::from("repository not found"))
            ))
        );

        let top = write_module(ws.path(), "top2", "[modules]\nsvn = [\"https://h/trunk\"]\n");
        assert_eq!(
            ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx).err(),
            Some(Error::MissingBackend(String::from("svn")))
        );
    }

    #[test]
    fn bad_manifest_aborts() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(ws.path(), "top", "[modules]\nlocal = [\"../a\"]\n");
        std::fs::create_dir_all(ws.path().join("a")).unwrap();
        let ctx = ResolveContext::new(ws.path().join("cache"));
        let backends = backends(FakeVcs::new(&[]));
        match ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx) {
            Err(Error::ManifestFailed(iden, _)) => assert_eq!(iden.ends_with("/a"), true),
            other => panic!("expected a manifest error, got {:?}", other.err()),
        }
    }

    #[test]
    fn merge_first_discovery_wins() {
        let ws = tempfile::tempdir().unwrap();
        let top = write_module(
            ws.path(),
            "top",
            r#"
library = "top_lib"
vcom-opt = "-2008"
files = ["top.vhd", "../shared/util.vhd", "notes.txt"]
[modules]
local = ["../shared"]
"#,
        );
        std::fs::write(
            top.join("top.vhd"),
            "use shared_lib.util_pkg.all;\nentity top is end entity;\n",
        )
        .unwrap();
        std::fs::write(top.join("notes.txt"), "").unwrap();
        let shared = write_module(
            ws.path(),
            "shared",
            r#"
library = "shared_lib"
vlog-opt = "-sv"
files = ["util.vhd", { path = "fifo.v", library = "fifo_lib" }]
"#,
        );
        std::fs::write(shared.join("util.vhd"), "package util_pkg is\nend package;\n").unwrap();
        std::fs::write(shared.join("fifo.v"), "module fifo; endmodule\n").unwrap();

        let ctx = ResolveContext::new(ws.path().join("cache"));
        let backends = backends(FakeVcs::new(&[]));
        let pool =
            ModulePool::resolve(Origin::local(&top).unwrap(), &backends, &TomlLoader, &ctx).unwrap();
        let set = pool.merge(&ctx).unwrap();

        assert_eq!(set.len(), 3);
        let top_vhd = set.get(&top.join("top.vhd")).unwrap();
        assert_eq!(top_vhd.get_library(), "top_lib");
        assert_eq!(top_vhd.get_options(), Some(&"-2008".to_string()));
        // claimed by the root before the shared module was visited
        let util = set.get(&shared.join("util.vhd")).unwrap();
        assert_eq!(util.get_library(), "top_lib");
        let fifo = set.get(&shared.join("fifo.v")).unwrap();
        assert_eq!(fifo.get_library(), "fifo_lib");
        assert_eq!(fifo.get_options(), Some(&"-sv".to_string()));
    }
}

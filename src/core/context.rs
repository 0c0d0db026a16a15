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

use super::extract::{DependencyLister, ExtractContext, IverilogLister};
use super::stdlib::StdLibs;
use serde_derive::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const HDLFORGE_HOME: &str = "HDLFORGE_HOME";
pub const HDLFORGE_CACHE: &str = "HDLFORGE_CACHE";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, PartialEq, Clone)]
pub enum SimTool {
    Vsim,
    Isim,
    Other(String),
}

impl FromStr for SimTool {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "vsim" | "modelsim" => Self::Vsim,
            "isim" => Self::Isim,
            _ => Self::Other(s.to_string()),
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SynTarget {
    Xilinx,
    Altera,
    Other(String),
}

impl FromStr for SynTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "xilinx" => Self::Xilinx,
            "altera" => Self::Altera,
            _ => Self::Other(s.to_string()),
        })
    }
}

/// What the resolved build will be used for.
#[derive(Debug, PartialEq, Clone, Default)]
pub enum Action {
    Simulation(SimTool),
    Synthesis(SynTarget),
    #[default]
    Unspecified,
}

/// User settings read from the `config.toml` file.
#[derive(Debug, PartialEq, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    git: Option<String>,
    svn: Option<String>,
    iverilog: Option<String>,
    action: Option<String>,
    sim_tool: Option<String>,
    target: Option<String>,
    sim_ini: Option<PathBuf>,
    fetch_to: Option<PathBuf>,
}

impl FromStr for Settings {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Settings {
    pub fn get_git(&self) -> Option<&String> {
        self.git.as_ref()
    }

    pub fn get_svn(&self) -> Option<&String> {
        self.svn.as_ref()
    }

    pub fn get_iverilog(&self) -> Option<&String> {
        self.iverilog.as_ref()
    }

    pub fn get_fetch_to(&self) -> Option<&PathBuf> {
        self.fetch_to.as_ref()
    }

    /// Interprets the `action`, `sim-tool`, and `target` keys together.
    pub fn get_action(&self) -> Action {
        match self.action.as_deref() {
            Some("simulation") => Action::Simulation(
                SimTool::from_str(self.sim_tool.as_deref().unwrap_or("vsim"))
                    .unwrap_or(SimTool::Vsim),
            ),
            Some("synthesis") => Action::Synthesis(
                SynTarget::from_str(self.target.as_deref().unwrap_or_default())
                    .unwrap_or(SynTarget::Other(String::new())),
            ),
            _ => Action::Unspecified,
        }
    }
}

/// The explicit state handed to every resolution step.
pub struct ResolveContext {
    action: Action,
    std_libs: StdLibs,
    lister: Option<Box<dyn DependencyLister>>,
    fetch_to: PathBuf,
}

impl ResolveContext {
    /// Creates a context that excludes the minimal standard libraries and
    /// places fetched modules under `fetch_to`.
    pub fn new(fetch_to: PathBuf) -> Self {
        Self {
            action: Action::Unspecified,
            std_libs: StdLibs::minimal(),
            lister: None,
            fetch_to: fetch_to,
        }
    }

    pub fn action(mut self, action: Action, sim_ini: Option<&str>) -> Self {
        self.std_libs = StdLibs::select(&action, sim_ini);
        self.action = action;
        self
    }

    pub fn std_libs(mut self, libs: StdLibs) -> Self {
        self.std_libs = libs;
        self
    }

    pub fn lister(mut self, lister: Option<Box<dyn DependencyLister>>) -> Self {
        self.lister = lister;
        self
    }

    pub fn get_action(&self) -> &Action {
        &self.action
    }

    pub fn get_std_libs(&self) -> &StdLibs {
        &self.std_libs
    }

    /// The default destination for modules fetched from version control.
    pub fn get_fetch_to(&self) -> &PathBuf {
        &self.fetch_to
    }

    /// Borrows the context for extraction, given every module root.
    pub fn extract_context<'a>(&'a self, module_roots: &'a [PathBuf]) -> ExtractContext<'a> {
        ExtractContext::new(&self.std_libs)
            .include_dirs(module_roots)
            .lister(self.lister.as_deref())
    }
}

/// The environment the binary runs in: where things live and what the user configured.
pub struct Context {
    home_path: PathBuf,
    cache_path: PathBuf,
    settings: Settings,
}

impl Context {
    pub fn new() -> Context {
        let home = std::env::temp_dir();
        let cache = home.join("cache");
        Context {
            home_path: home,
            cache_path: cache,
            settings: Settings::default(),
        }
    }

    /// Sets the home directory. By default this is `$HOME/.hdlforge`. If set by `key`,
    /// it must be an existing directory.
    pub fn home(mut self, key: &str) -> Result<Context, ContextError> {
        self.home_path = if let Ok(s) = env::var(key) {
            PathBuf::from(s)
        } else {
            let hp = match home::home_dir() {
                Some(p) => p.join(".hdlforge"),
                None => return Err(ContextError(format!("failed to detect user's home directory; please set the {} environment variable", key))),
            };
            // create the directory if does not exist
            if hp.exists() == false {
                std::fs::create_dir_all(&hp).map_err(|e| {
                    ContextError(format!("failed to create directory {}: {}", hp.display(), e))
                })?;
            }
            hp
        };
        // do not allow a non-existent directory to be set for the home
        if self.home_path.exists() == false {
            return Err(ContextError(format!(
                "directory {} does not exist for {}",
                self.home_path.display(),
                key
            )));
        }
        Ok(self)
    }

    /// Sets the cache directory. If it was set from `key`, it assumes the path
    /// exists. If setting by default (within home), it creates it as needed.
    pub fn cache(mut self, key: &str) -> Result<Context, ContextError> {
        self.cache_path = if let Ok(s) = env::var(key) {
            let cp = PathBuf::from(s);
            // do not allow a nonexistent directory to be set for cache path
            if cp.exists() == false {
                return Err(ContextError(format!(
                    "directory {} does not exist for {}",
                    cp.display(),
                    key
                )));
            }
            cp
        } else {
            let cp = self.home_path.join("cache");
            if cp.exists() == false {
                std::fs::create_dir_all(&cp).map_err(|e| {
                    ContextError(format!("failed to create directory {}: {}", cp.display(), e))
                })?;
            }
            cp
        };
        Ok(self)
    }

    /// Reads the settings file `s` directly under the home directory, if it exists.
    pub fn settings(mut self, s: &str) -> Result<Context, ContextError> {
        let cfg_path = self.home_path.join(s);
        if cfg_path.exists() == false {
            return Ok(self);
        }
        let text = std::fs::read_to_string(&cfg_path)
            .map_err(|e| ContextError(format!("failed to read {}: {}", cfg_path.display(), e)))?;
        self.settings = Settings::from_str(&text)
            .map_err(|e| ContextError(format!("failed to parse {}: {}", cfg_path.display(), e)))?;
        tracing::debug!("loaded settings from {}", cfg_path.display());
        Ok(self)
    }

    pub fn get_home_path(&self) -> &PathBuf {
        &self.home_path
    }

    pub fn get_cache_path(&self) -> &PathBuf {
        &self.cache_path
    }

    pub fn get_settings(&self) -> &Settings {
        &self.settings
    }

    /// Builds the explicit resolution state from the loaded settings.
    ///
    /// A configured `sim-ini` file that cannot be read is reported and the
    /// built-in library tables are used instead.
    pub fn resolve_context(&self) -> ResolveContext {
        let sim_ini = self.settings.sim_ini.as_ref().and_then(|p| {
            let p = resolve_from(&self.home_path, p);
            match std::fs::read_to_string(&p) {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("failed to read simulator ini {}: {}", p.display(), e);
                    None
                }
            }
        });
        let lister: Option<Box<dyn DependencyLister>> = match self.settings.get_iverilog() {
            Some(cmd) => Some(Box::new(IverilogLister::new(Some(cmd.clone())))),
            None => None,
        };
        let fetch_to = match self.settings.get_fetch_to() {
            Some(p) => resolve_from(&self.home_path, p),
            None => self.cache_path.clone(),
        };
        ResolveContext::new(fetch_to)
            .action(self.settings.get_action(), sim_ini.as_deref())
            .lister(lister)
    }
}

/// Anchors a possibly-relative configured path at `root`.
fn resolve_from(root: &Path, p: &Path) -> PathBuf {
    crate::util::filesystem::normalize(root, p)
}

#[derive(Debug)]
pub struct ContextError(String);

impl std::error::Error for ContextError {}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

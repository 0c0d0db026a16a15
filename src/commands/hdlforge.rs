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

use super::helps::hdlforge;
use crate::core::blueprint::{Blueprint, Scheme};
use crate::core::build::{self, BuildSet};
use crate::core::context::{Context, CONFIG_FILE, HDLFORGE_CACHE, HDLFORGE_HOME};
use crate::core::fetch::Backends;
use crate::core::manifest::TomlLoader;
use crate::core::module::Origin;
use crate::util::anyerror::Fault;
use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Command, Help};
use colored::Colorize;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, PartialEq)]
pub struct Hdlforge {
    version: bool,
    verbose: bool,
    manifest_dir: Option<PathBuf>,
    format: Option<Scheme>,
}

impl Command for Hdlforge {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(hdlforge::HELP))?;
        Ok(Hdlforge {
            // flags
            version: cli.check(Arg::flag("version"))?,
            verbose: cli.check(Arg::flag("verbose").switch('v'))?,
            // options
            manifest_dir: cli.get(Arg::option("manifest-dir").value("dir"))?,
            format: cli.get(Arg::option("format").value("fmt"))?,
        })
    }

    fn execute(self) -> proc::Result {
        if self.version == true {
            println!("hdlforge {}", VERSION);
            return Ok(());
        }
        init_logging(self.verbose);

        let context = Context::new()
            .home(HDLFORGE_HOME)?
            .cache(HDLFORGE_CACHE)?
            .settings(CONFIG_FILE)?;
        tracing::debug!(
            "using home {} and cache {}",
            context.get_home_path().display(),
            context.get_cache_path().display()
        );

        let build = self.run(&context)?;
        let text = Blueprint::new(self.format.unwrap_or_default(), &build).write()?;
        print!("{}", text);

        if build.get_unresolved().is_empty() == false {
            eprintln!(
                "{}: {} requirement(s) are assumed to be supplied by the tool",
                "warning".yellow().bold(),
                build.get_unresolved().len()
            );
        }
        Ok(())
    }
}

impl Hdlforge {
    /// Resolves the build rooted at the manifest directory.
    fn run(&self, context: &Context) -> Result<BuildSet, Fault> {
        let root = Origin::local(
            self.manifest_dir
                .as_ref()
                .unwrap_or(&PathBuf::from(".")),
        )?;
        let settings = context.get_settings();
        let backends = Backends::standard(settings.get_git().cloned(), settings.get_svn().cloned());
        let ctx = context.resolve_context();
        Ok(build::resolve_build(root, &backends, &TomlLoader, &ctx)?)
    }
}

/// Installs the stderr log subscriber.
fn init_logging(verbose: bool) {
    let level = match verbose {
        true => tracing::Level::DEBUG,
        false => tracing::Level::INFO,
    };
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

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

pub const HELP: &str = r#"Resolve an HDL design's modules and print its compile order.

Usage:
    hdlforge [options]

Options:
    --manifest-dir <dir>    module directory holding the root Manifest.toml
    --format <fmt>          blueprint format: tsv (default) or json
    --verbose, -v           log every fetch and extracted dependency
    --version               print the version and exit
    --help, -h              print this help information and exit

Environment:
    HDLFORGE_HOME           directory holding config.toml (default: ~/.hdlforge)
    HDLFORGE_CACHE          default location for fetched modules
"#;

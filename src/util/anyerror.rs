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

use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

/// Quickly implement a custom/unique error message.
///
/// Backends and loaders use this to report failures that have no dedicated
/// variant in the crate-wide error enum.
#[derive(Debug, PartialEq)]
pub struct AnyError(pub String);

impl Error for AnyError {}

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AnyError {
    fn from(value: &str) -> Self {
        AnyError(value.to_string())
    }
}

impl From<String> for AnyError {
    fn from(value: String) -> Self {
        AnyError(value)
    }
}

pub type Fault = Box<dyn Error>;

/// Stores the (file path, error message) for a failure tied to a file on disk.
#[derive(Debug)]
pub struct FileFault(pub PathBuf, pub Fault);

impl Error for FileFault {}

impl Display for FileFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "file {:?}: {}", self.0, self.1)
    }
}

/// Maps a finished child process status into an error for a bad exit.
pub fn check_status(status: std::process::ExitStatus) -> Result<(), AnyError> {
    match status.code() {
        Some(0) => Ok(()),
        Some(num) => Err(AnyError(format!("exited with error code: {}", num))),
        None => Err(AnyError(format!("terminated by signal"))),
    }
}

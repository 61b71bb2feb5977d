// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::borrow::Cow;

use rust_embed::RustEmbed;

/// The static web interface.
#[derive(RustEmbed)]
#[folder = "assets/web/"]
struct WebFiles;

/// The main page.
pub const INDEX: &str = "index.html";

/// Gets an embedded web file by its path relative to the web root.
pub fn get(path: &str) -> Option<Cow<'static, [u8]>> {
    WebFiles::get(path.trim_start_matches('/')).map(|file| file.data)
}

/// Gets an embedded web file as text.
pub fn get_text(path: &str) -> Option<String> {
    get(path).map(|data| String::from_utf8_lossy(&data).into_owned())
}

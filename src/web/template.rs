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
use std::sync::LazyLock;

use regex::Regex;

/// An admin-only region of a page, markers included.
static ADMIN_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)#admin.*?#end").expect("admin block pattern is valid"));

/// Markers around admin-only regions.
static ADMIN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#admin|#end").expect("admin marker pattern is valid"));

/// Resolves admin-only regions in a page. Admins see the content without the
/// markers; everyone else sees nothing of it.
pub fn render(page: &str, is_admin: bool) -> String {
    if is_admin {
        ADMIN_MARKER.replace_all(page, "").into_owned()
    } else {
        ADMIN_BLOCK.replace_all(page, "").into_owned()
    }
}

#[cfg(test)]
mod test {
    use super::render;

    const PAGE: &str = "<p>hello</p>#admin<a>upload</a>#end<p>bye</p>";

    #[test]
    fn test_render() {
        assert_eq!("<p>hello</p><p>bye</p>", render(PAGE, false));
        assert_eq!("<p>hello</p><a>upload</a><p>bye</p>", render(PAGE, true));
    }

    #[test]
    fn test_render_multiline_and_case() {
        let page = "a\n#ADMIN\nsecret\nstuff\n#End\nb\n#admin more #end c";
        assert_eq!("a\n\nb\n c", render(page, false));
        assert_eq!("a\n\nsecret\nstuff\n\nb\n more  c", render(page, true));
    }
}

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
use serde::Deserialize;

/// A username and password pair.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Returns true if the given pair matches these credentials.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// A YAML representation of the HTTP basic auth configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Auth {
    /// Every request needs user or admin credentials.
    require_auth: Option<bool>,

    /// Changes (uploads and edits) need admin credentials.
    use_admin_auth: Option<bool>,

    user: Option<Credentials>,
    admin: Option<Credentials>,
}

impl Auth {
    pub fn new(
        require_auth: bool,
        use_admin_auth: bool,
        user: Option<Credentials>,
        admin: Option<Credentials>,
    ) -> Auth {
        Auth {
            require_auth: Some(require_auth),
            use_admin_auth: Some(use_admin_auth),
            user,
            admin,
        }
    }

    /// Returns whether every request must authenticate (default: false).
    pub fn require_auth(&self) -> bool {
        self.require_auth.unwrap_or(false)
    }

    /// Returns whether changes need admin credentials (default: false).
    pub fn use_admin_auth(&self) -> bool {
        self.use_admin_auth.unwrap_or(false)
    }

    /// The user credentials.
    pub fn user(&self) -> Option<&Credentials> {
        self.user.as_ref()
    }

    /// The admin credentials.
    pub fn admin(&self) -> Option<&Credentials> {
        self.admin.as_ref()
    }

    /// Checks that every enabled tier has credentials to compare against.
    pub(super) fn validate(&self) -> Result<(), String> {
        if self.require_auth() && self.user.is_none() && self.admin.is_none() {
            return Err("auth.require_auth is set but no credentials are configured".to_string());
        }
        if self.use_admin_auth() && self.admin.is_none() {
            return Err("auth.use_admin_auth is set but auth.admin is missing".to_string());
        }
        Ok(())
    }
}

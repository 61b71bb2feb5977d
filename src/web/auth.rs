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
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

use crate::config::auth::Auth;

use super::AppContext;

/// Challenge shown when a page needs user credentials.
pub const USER_REALM: &str = "The soundboard requires login";

/// Challenge shown when a change needs admin credentials.
pub const ADMIN_REALM: &str = "For this part you need to login as admin";

/// Challenge used by the explicit login route.
pub const LOGIN_REALM: &str = "Authenticate";

/// The access level a route needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    User,
    Admin,
}

/// What the caller proved about themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Valid user or admin credentials were presented.
    pub is_user: bool,
    /// The caller may see admin content.
    pub is_admin: bool,
}

/// Decides whether a caller with the given credentials may use a route of the
/// given tier. Admin routes need the admin pair once either auth flag is set. On
/// failure returns the realm to challenge with.
pub fn authorize(
    auth: &Auth,
    credentials: Option<(&str, &str)>,
    tier: Tier,
) -> Result<Session, &'static str> {
    let matches = |expected: Option<&crate::config::auth::Credentials>| match credentials {
        Some((username, password)) => expected.is_some_and(|c| c.matches(username, password)),
        None => false,
    };
    let admin_ok = matches(auth.admin());
    let user_ok = matches(auth.user());

    if tier == Tier::Admin && (auth.require_auth() || auth.use_admin_auth()) {
        if !admin_ok {
            return Err(ADMIN_REALM);
        }
    } else if auth.require_auth() && !(user_ok || admin_ok) {
        return Err(USER_REALM);
    }

    Ok(Session {
        is_user: user_ok || admin_ok,
        is_admin: !auth.use_admin_auth() || admin_ok,
    })
}

/// Parses basic credentials from the Authorization header. Malformed headers count
/// as no credentials.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// A 401 response asking for basic credentials in the given realm.
pub fn challenge(realm: &str) -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm)) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

/// Checks every request against the configured credentials. POST requests need the
/// admin tier, everything else the user tier. The resulting session is attached to
/// the request for the handlers.
pub async fn gate(State(ctx): State<AppContext>, mut request: Request, next: Next) -> Response {
    let tier = if request.method() == Method::POST {
        Tier::Admin
    } else {
        Tier::User
    };
    let credentials = basic_credentials(request.headers());
    let credentials = credentials
        .as_ref()
        .map(|(username, password)| (username.as_str(), password.as_str()));

    match authorize(&ctx.auth, credentials, tier) {
        Ok(session) => {
            debug!(
                path = request.uri().path(),
                is_user = session.is_user,
                is_admin = session.is_admin,
                "Authorized request."
            );
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(realm) => {
            info!(path = request.uri().path(), realm, "Showing login prompt.");
            challenge(realm)
        }
    }
}

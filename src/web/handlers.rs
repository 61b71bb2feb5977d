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
use std::{io::Write, path::Path as FsPath};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::{
    error::{Error, Result},
    sounds::SoundEntry,
};

use super::{
    assets,
    auth::{self, Session},
    template, AppContext,
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let message = match &self {
            Error::Duplicate(_) => "Could not add duplicate sound file".to_string(),
            Error::UnsupportedMedia { .. } => "Not a sound file!".to_string(),
            Error::NotFound(_) => "Sound does not exist".to_string(),
            Error::PinInUse { .. } | Error::InvalidField { .. } => self.to_string(),
            Error::Multipart(_) => {
                warn!(err = self.to_string(), "Malformed form data.");
                return (StatusCode::BAD_REQUEST, self.to_string()).into_response();
            }
            Error::Config { .. } | Error::Io(_) => {
                error!(err = self.to_string(), "Error handling request.");
                return (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response();
            }
        };
        info!(reason = self.to_string(), "Request not fulfilled.");
        (StatusCode::OK, message).into_response()
    }
}

/// GET /playsound/{name}
pub async fn play_sound(State(ctx): State<AppContext>, Path(name): Path<String>) -> &'static str {
    if ctx.player.play_by_name(&name) {
        "Playing sound"
    } else {
        "Failed to play sound"
    }
}

/// GET /reload/
pub async fn reload(State(ctx): State<AppContext>) -> Result<&'static str> {
    let registry = ctx.player.registry();
    registry.reload()?;
    ctx.rebind_trigger();
    Ok("Config reloaded")
}

/// GET /sounds/
pub async fn list_sounds(State(ctx): State<AppContext>) -> String {
    ctx.player
        .registry()
        .sounds()
        .iter()
        .flat_map(|sound| sound.names().map(|name| format!("- {}\n", name)).collect::<Vec<_>>())
        .collect()
}

/// GET /sounds/json/
pub async fn sounds_json(State(ctx): State<AppContext>) -> Json<Vec<SoundEntry>> {
    Json(ctx.player.registry().sounds())
}

/// GET /sounds/html/
pub async fn sounds_html(State(ctx): State<AppContext>) -> Html<String> {
    let mut html = String::from("<ul>\n");
    for sound in ctx.player.registry().sounds().iter() {
        let mut link = format!(
            "/WebFiles/editsound.html?sound={}&aliases={}",
            sound.file(),
            sound.aliases().join(",")
        );
        if let Some(pin) = sound.trigger_pin() {
            link.push_str(&format!("&gpio-pin={}", pin));
        }
        for name in sound.names() {
            html.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape_html(&link),
                escape_html(name)
            ));
        }
    }
    html.push_str("</ul>");
    Html(html)
}

/// GET /auth
pub async fn login(Extension(session): Extension<Session>) -> Response {
    if !session.is_user {
        return auth::challenge(auth::LOGIN_REALM);
    }
    index(Extension(session)).await.into_response()
}

/// GET / and every unknown path.
pub async fn index(Extension(session): Extension<Session>) -> Response {
    match assets::get_text(assets::INDEX) {
        Some(page) => Html(template::render(&page, session.is_admin)).into_response(),
        None => {
            error!("Index page is missing from the embedded web files.");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /WebFiles/{path}
pub async fn web_file(
    Extension(session): Extension<Session>,
    Path(path): Path<String>,
) -> Response {
    let Some(data) = assets::get(&path) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    if path.ends_with(".html") {
        let page = String::from_utf8_lossy(&data);
        return Html(template::render(&page, session.is_admin)).into_response();
    }

    let content_type = mime_guess::from_path(&path)
        .first_raw()
        .unwrap_or("application/octet-stream");
    ([(header::CONTENT_TYPE, content_type)], data.into_owned()).into_response()
}

/// The fields shared by the upload and edit forms.
#[derive(Default)]
struct SoundForm {
    aliases: String,
    use_gpio_pin: bool,
    gpio_pin: Option<String>,
}

impl SoundForm {
    /// Reads a text field into the form. Returns false if the field is not one of the
    /// shared fields.
    fn set(&mut self, name: &str, value: String) -> bool {
        match name {
            "aliases" => self.aliases = value,
            "use-gpio-pin" => self.use_gpio_pin = value == "on",
            "gpio-pin" => self.gpio_pin = Some(value),
            _ => return false,
        }
        true
    }

    /// The comma separated aliases, trimmed, without empty entries.
    fn aliases(&self) -> Vec<String> {
        self.aliases
            .split(',')
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The requested trigger pin, if the pin is enabled.
    fn trigger_pin(&self) -> Result<Option<u8>> {
        if !self.use_gpio_pin {
            return Ok(None);
        }
        let value = self.gpio_pin.as_deref().unwrap_or_default().trim();
        value
            .parse::<u8>()
            .map(Some)
            .map_err(|_| Error::InvalidField {
                field: "gpio-pin",
                message: format!("'{}' is not a pin number", value),
            })
    }
}

/// POST /upload-sound/
pub async fn upload_sound(State(ctx): State<AppContext>, mut multipart: Multipart) -> Result<&'static str> {
    let sounds_dir = ctx.player.sounds_dir();
    let mut form = SoundForm::default();
    let mut upload: Option<(String, NamedTempFile)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field
                .file_name()
                .and_then(|file_name| FsPath::new(file_name).file_name())
                .and_then(|file_name| file_name.to_str())
                .unwrap_or_default()
                .to_string();

            let mut temp = NamedTempFile::new_in(sounds_dir)?;
            while let Some(chunk) = field.chunk().await? {
                temp.write_all(&chunk)?;
            }
            temp.flush()?;
            upload = Some((file_name, temp));
        } else {
            let value = field.text().await?;
            if !form.set(&name, value) {
                warn!(field = name, "Ignoring unknown upload field.");
            }
        }
    }

    let Some((file_name, temp)) = upload else {
        return Err(Error::InvalidField {
            field: "file",
            message: "no file was uploaded".to_string(),
        });
    };
    if file_name.is_empty() {
        return Err(Error::InvalidField {
            field: "file",
            message: "the upload has no file name".to_string(),
        });
    }

    let registry = ctx.player.registry();
    if registry.contains_file(&file_name) {
        return Err(Error::Duplicate(file_name));
    }

    let mime = mime_guess::from_path(&file_name)
        .first_raw()
        .unwrap_or_default();
    info!(file = file_name, mime, "Received upload.");
    if !mime.starts_with("audio/") {
        return Err(Error::UnsupportedMedia {
            file: file_name,
            mime: mime.to_string(),
        });
    }

    let trigger_pin = form.trigger_pin()?;
    let save_path = sounds_dir.join(&file_name);
    registry.add_upload(&file_name, form.aliases(), trigger_pin, temp, &save_path)?;
    ctx.rebind_trigger();
    Ok("Sound saved")
}

/// POST /edit-sound/
pub async fn edit_sound(State(ctx): State<AppContext>, mut multipart: Multipart) -> Result<&'static str> {
    let mut form = SoundForm::default();
    let mut sound = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let value = field.text().await?;
        if name == "sound" {
            sound = value;
        } else if !form.set(&name, value) {
            warn!(field = name, "Ignoring unknown edit field.");
        }
    }

    info!(sound, "Editing sound.");
    let registry = ctx.player.registry();
    let entry = registry
        .find_by_name(&sound)
        .ok_or_else(|| Error::NotFound(sound.clone()))?;

    registry.update(entry.file(), form.aliases(), form.trigger_pin()?)?;
    ctx.rebind_trigger();
    Ok("Saved changes successfully")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

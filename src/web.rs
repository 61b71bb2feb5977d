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
use std::{error::Error, net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{config::auth::Auth, player::Player, trigger::Trigger};

pub mod assets;
pub mod auth;
mod handlers;
pub mod template;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub player: Arc<Player>,
    pub trigger: Option<Arc<Trigger>>,
    pub auth: Arc<Auth>,
}

impl AppContext {
    /// Rebinds the trigger pins to the current registry contents. Failures are
    /// logged; the registry change that caused the rebind stands.
    pub fn rebind_trigger(&self) {
        if let Some(trigger) = &self.trigger {
            let pins = self.player.registry().pins();
            if let Err(e) = trigger.rebind(&pins) {
                error!(err = e.as_ref(), "Unable to rebind trigger pins.");
            }
        }
    }
}

/// Builds the soundboard router.
pub fn router(ctx: AppContext, max_upload_size: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/auth", get(handlers::login))
        .route("/playsound/*name", get(handlers::play_sound))
        .route("/reload/", get(handlers::reload))
        .route("/sounds/", get(handlers::list_sounds))
        .route("/sounds/json/", get(handlers::sounds_json))
        .route("/sounds/html/", get(handlers::sounds_html))
        .route("/WebFiles/*path", get(handlers::web_file))
        .route("/upload-sound/", post(handlers::upload_sound))
        .route("/edit-sound/", post(handlers::edit_sound))
        .fallback(handlers::index)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(middleware::from_fn_with_state(ctx.clone(), auth::gate))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// The soundboard HTTP server.
pub struct Server {
    address: SocketAddr,
    ctx: AppContext,
    max_upload_size: usize,
}

impl Server {
    pub fn new(address: SocketAddr, ctx: AppContext, max_upload_size: usize) -> Server {
        Server {
            address,
            ctx,
            max_upload_size,
        }
    }

    /// Serves requests until Ctrl-C or SIGTERM, then releases the trigger pins.
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        let listener = tokio::net::TcpListener::bind(self.address).await?;
        info!(address = self.address.to_string(), "Server listening.");

        let trigger = self.ctx.trigger.clone();
        let result = axum::serve(listener, router(self.ctx, self.max_upload_size))
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(trigger) = trigger {
            trigger.shutdown();
        }
        info!("Server stopped.");
        Ok(result?)
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(err = e.to_string(), "Unable to listen for Ctrl-C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(err = e.to_string(), "Unable to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down."),
        _ = terminate => info!("Received SIGTERM, shutting down."),
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs, path::Path, sync::Arc};

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use tower::ServiceExt;

    use crate::{
        audio::mock,
        config::auth::{Auth, Credentials},
        player::Player,
        sounds::Registry,
        testutil::eventually,
        trigger::{self, Trigger},
    };

    use super::{router, AppContext};

    const SOUNDS: &str = r#"[
        {"file": "beep.wav", "aliases": ["b"], "GPIO_pin": 17},
        {"file": "boop.wav", "aliases": []}
    ]"#;
    const BOUNDARY: &str = "soundboard-test-boundary";

    struct Fixture {
        dir: tempfile::TempDir,
        device: mock::Device,
        driver: trigger::mock::Driver,
        registry: Arc<Registry>,
        app: Router,
    }

    fn fixture(auth: Auth) -> Result<Fixture, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let config = dir.path().join("sounds.json");
        fs::write(&config, SOUNDS)?;
        fs::write(dir.path().join("beep.wav"), b"")?;
        fs::write(dir.path().join("boop.wav"), b"")?;

        let registry = Arc::new(Registry::load(&config)?);
        let device = mock::Device::get("mock-device");
        let player = Arc::new(Player::new(
            registry.clone(),
            Arc::new(device.clone()),
            dir.path().to_path_buf(),
        ));
        let driver = trigger::mock::Driver::get("mock-trigger");
        let trigger = Arc::new(Trigger::new(Arc::new(driver.clone()), player.clone()));
        trigger.bind(&registry.pins())?;

        let app = router(
            AppContext {
                player,
                trigger: Some(trigger),
                auth: Arc::new(auth),
            },
            1024 * 1024,
        );
        Ok(Fixture {
            dir,
            device,
            driver,
            registry,
            app,
        })
    }

    fn protected() -> Auth {
        Auth::new(
            true,
            true,
            Some(Credentials::new("user", "pass")),
            Some(Credentials::new("admin", "secret")),
        )
    }

    fn basic(username: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
    }

    fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        builder.body(Body::empty()).expect("unable to build request")
    }

    /// Builds a multipart POST. File parts are given as (field, file name, contents).
    fn post(
        uri: &str,
        authorization: Option<&str>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for (name, file_name, contents) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, name, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::builder().method("POST").uri(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }
        builder.body(Body::from(body)).expect("unable to build request")
    }

    async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, String), Box<dyn Error>> {
        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, String::from_utf8(body.to_vec())?))
    }

    fn temp_files(dir: &Path) -> Result<usize, Box<dyn Error>> {
        Ok(fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".tmp"))
            .count())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_play_sound() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        assert_eq!(
            (StatusCode::OK, "Playing sound".to_string()),
            send(&fixture.app, get("/playsound/b", None)).await?
        );
        eventually(
            || fixture.device.played() == vec![fixture.dir.path().join("beep.wav")],
            "beep.wav was never played",
        );

        assert_eq!(
            (StatusCode::OK, "Failed to play sound".to_string()),
            send(&fixture.app, get("/playsound/no%20such%20sound", None)).await?
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sound_listings() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        let (status, body) = send(&fixture.app, get("/sounds/", None)).await?;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("- beep.wav\n- beep\n- b\n- boop.wav\n- boop\n", body);

        let (_, body) = send(&fixture.app, get("/sounds/json/", None)).await?;
        let json: serde_json::Value = serde_json::from_str(&body)?;
        assert_eq!(
            serde_json::json!([
                {"file": "beep.wav", "aliases": ["b"], "GPIO_pin": 17},
                {"file": "boop.wav", "aliases": []}
            ]),
            json
        );

        let (_, body) = send(&fixture.app, get("/sounds/html/", None)).await?;
        assert!(body.starts_with("<ul>\n"));
        assert!(body.contains(
            "<li><a href=\"/WebFiles/editsound.html?sound=beep.wav&amp;aliases=b&amp;gpio-pin=17\">beep</a></li>"
        ));
        assert_eq!(5, body.matches("<li>").count());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_auth_gate() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(protected())?;
        let user = basic("user", "pass");
        let admin = basic("admin", "secret");

        let response = fixture.app.clone().oneshot(get("/sounds/", None)).await?;
        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        assert_eq!(
            "Basic realm=\"The soundboard requires login\"",
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
        );

        let (status, _) = send(&fixture.app, get("/sounds/", Some(&basic("user", "nope")))).await?;
        assert_eq!(StatusCode::UNAUTHORIZED, status);
        let (status, _) = send(&fixture.app, get("/sounds/", Some(&user))).await?;
        assert_eq!(StatusCode::OK, status);

        let edit = [("sound", "beep"), ("aliases", "bee")];
        let response = fixture
            .app
            .clone()
            .oneshot(post("/edit-sound/", Some(&user), &edit, &[]))
            .await?;
        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        assert_eq!(
            "Basic realm=\"For this part you need to login as admin\"",
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
        );

        assert_eq!(
            (StatusCode::OK, "Saved changes successfully".to_string()),
            send(&fixture.app, post("/edit-sound/", Some(&admin), &edit, &[])).await?
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_admin_blocks() -> Result<(), Box<dyn Error>> {
        let auth = Auth::new(
            false,
            true,
            None,
            Some(Credentials::new("admin", "secret")),
        );
        let fixture = fixture(auth)?;

        let (status, page) = send(&fixture.app, get("/", None)).await?;
        assert_eq!(StatusCode::OK, status);
        assert!(!page.contains("upload-sound"));
        assert!(!page.contains("#admin"));

        let (_, page) = send(&fixture.app, get("/", Some(&basic("admin", "secret")))).await?;
        assert!(page.contains("upload-sound"));
        assert!(!page.contains("#admin"));
        assert!(!page.contains("#end"));

        // Unknown paths serve the index page.
        let (status, page) = send(&fixture.app, get("/some/where", None)).await?;
        assert_eq!(StatusCode::OK, status);
        assert!(page.contains("<html"));

        // The login route always challenges anonymous callers.
        let (status, _) = send(&fixture.app, get("/auth", None)).await?;
        assert_eq!(StatusCode::UNAUTHORIZED, status);
        let (status, _) = send(&fixture.app, get("/auth", Some(&basic("admin", "secret")))).await?;
        assert_eq!(StatusCode::OK, status);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_web_files() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        let response = fixture
            .app
            .clone()
            .oneshot(get("/WebFiles/soundboard.js", None))
            .await?;
        assert_eq!(StatusCode::OK, response.status());
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("javascript")));

        let (status, page) = send(&fixture.app, get("/WebFiles/editsound.html?sound=beep.wav", None)).await?;
        assert_eq!(StatusCode::OK, status);
        assert!(!page.contains("#admin"));

        let (status, _) = send(&fixture.app, get("/WebFiles/missing.png", None)).await?;
        assert_eq!(StatusCode::NOT_FOUND, status);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_upload_sound() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        let fields = [("aliases", "honk, horn"), ("use-gpio-pin", "on"), ("gpio-pin", "22")];
        let files: [(&str, &str, &[u8]); 1] = [("file", "honk.wav", b"RIFF")];
        assert_eq!(
            (StatusCode::OK, "Sound saved".to_string()),
            send(&fixture.app, post("/upload-sound/", None, &fields, &files)).await?
        );
        assert_eq!(b"RIFF".to_vec(), fs::read(fixture.dir.path().join("honk.wav"))?);
        let sound = fixture.registry.find_by_name("horn");
        assert_eq!(Some(Some(22)), sound.as_ref().map(|sound| sound.trigger_pin()));
        assert_eq!(0, temp_files(fixture.dir.path())?);

        // The new pin is bound right away.
        assert!(fixture.driver.bound_pins().contains(&22));

        // The registry survives a reload.
        fixture.registry.reload()?;
        assert!(fixture.registry.contains_file("honk.wav"));

        assert_eq!(
            (StatusCode::OK, "Could not add duplicate sound file".to_string()),
            send(&fixture.app, post("/upload-sound/", None, &fields, &files)).await?
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_upload_not_a_sound() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;
        let before = fixture.registry.sounds();

        let files: [(&str, &str, &[u8]); 1] = [("file", "notes.txt", b"hello")];
        assert_eq!(
            (StatusCode::OK, "Not a sound file!".to_string()),
            send(&fixture.app, post("/upload-sound/", None, &[("aliases", "")], &files)).await?
        );
        assert!(!fixture.dir.path().join("notes.txt").exists());
        assert_eq!(0, temp_files(fixture.dir.path())?);
        assert_eq!(before, fixture.registry.sounds());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_upload_pin_in_use() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        let fields = [("use-gpio-pin", "on"), ("gpio-pin", "17")];
        let files: [(&str, &str, &[u8]); 1] = [("file", "../honk.wav", b"RIFF")];
        let (status, body) = send(&fixture.app, post("/upload-sound/", None, &fields, &files)).await?;
        assert_eq!(StatusCode::OK, status);
        assert!(body.contains("already bound"));
        assert!(!fixture.dir.path().join("honk.wav").exists());
        assert!(!fixture.registry.contains_file("honk.wav"));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_edit_sound() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        let edit = [("sound", "boop"), ("aliases", "bop,"), ("use-gpio-pin", "on"), ("gpio-pin", "27")];
        assert_eq!(
            (StatusCode::OK, "Saved changes successfully".to_string()),
            send(&fixture.app, post("/edit-sound/", None, &edit, &[])).await?
        );
        let boop = fixture.registry.find_by_name("bop");
        assert_eq!(Some("boop.wav"), boop.as_ref().map(|sound| sound.file()));
        assert_eq!(Some(Some(27)), boop.as_ref().map(|sound| sound.trigger_pin()));
        assert_eq!(vec![17, 27], fixture.driver.bound_pins());

        // Leaving the pin off clears it.
        let edit = [("sound", "beep.wav"), ("aliases", "b")];
        send(&fixture.app, post("/edit-sound/", None, &edit, &[])).await?;
        assert_eq!(None, fixture.registry.find_by_pin(17));
        assert_eq!(vec![27], fixture.driver.bound_pins());

        let edit = [("sound", "nothing"), ("aliases", "")];
        assert_eq!(
            (StatusCode::OK, "Sound does not exist".to_string()),
            send(&fixture.app, post("/edit-sound/", None, &edit, &[])).await?
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reload() -> Result<(), Box<dyn Error>> {
        let fixture = fixture(Auth::default())?;

        fs::write(
            fixture.registry.path(),
            r#"[{"file": "boop.wav", "aliases": [], "GPIO_pin": 5}]"#,
        )?;
        assert_eq!(
            (StatusCode::OK, "Config reloaded".to_string()),
            send(&fixture.app, get("/reload/", None)).await?
        );
        assert!(!fixture.registry.contains_file("beep.wav"));
        assert_eq!(vec![5], fixture.driver.bound_pins());

        fs::write(fixture.registry.path(), "not json")?;
        let (status, _) = send(&fixture.app, get("/reload/", None)).await?;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert!(fixture.registry.contains_file("boop.wav"));
        Ok(())
    }
}

//! HTTP layer: router, shared state and error mapping.
//!
//! Public routes serve the dashboard and the raw data files; `/admin`
//! requires the signed session cookie set by `/login`.

pub mod handlers;
pub mod pages;
pub mod session;

use crate::config::Config;
use crate::store::{StoreError, TabularStore};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use session::SessionKey;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: TabularStore,
    pub session: SessionKey,
    /// Serializes admin read-modify-write cycles. The cycle itself runs on
    /// the blocking pool while the guard is held.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, store: TabularStore) -> Self {
        let session = SessionKey::derive(&config.auth.secret_key);
        Self {
            config: Arc::new(config),
            store,
            session,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// A failed request, rendered as a plain 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Task(#[from] JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Erro interno ao acessar os dados.",
        )
            .into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/dados.csv", get(handlers::institutions_csv))
        .route("/demografia.csv", get(handlers::demographics_csv))
        .route("/sc_municipios.geojson", get(handlers::geojson))
        .route(
            "/login",
            get(handlers::login_form).post(handlers::login_submit),
        )
        .route("/logout", get(handlers::logout))
        .route(
            "/admin",
            get(handlers::admin_page).post(handlers::admin_submit),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const FORM: &str = "application/x-www-form-urlencoded";

    struct Fixture {
        _dir: TempDir,
        state: AppState,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let data = dir.path().join("data");
            let seed = dir.path().join("seed");
            fs::create_dir_all(&data).unwrap();
            fs::create_dir_all(&seed).unwrap();
            fs::write(
                seed.join("dados.csv"),
                "municipio,regiao,nome,tipo,endereco,telefone,email,quantidade_oficinas,quantidade_ta,quantidade_recursos_pedagogicos,quantidade_open_day\n\
                 Lages,Serra,APAE Lages,Ambos,,,,1,0,0,0\n\
                 Chapecó,Oeste,,,,,,,,,\n",
            )
            .unwrap();

            let mut config = Config::default();
            config.storage.data_dir = data.clone();
            config.storage.seed_dir = seed.clone();
            config.auth.secret_key = "test-secret".to_string();

            let store = TabularStore::new(data, seed);
            Self {
                state: AppState::new(config, store),
                _dir: dir,
            }
        }

        fn app(&self) -> Router {
            router(self.state.clone())
        }

        fn data_file(&self, name: &str) -> String {
            fs::read_to_string(self.state.config.storage.data_dir.join(name)).unwrap()
        }
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, FORM);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn login(app: &Router) -> String {
        let resp = app
            .clone()
            .oneshot(post("/login", "username=admin&password=fcee2025", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_dashboard_renders_statuses() {
        let fixture = Fixture::new();
        let resp = fixture.app().oneshot(get("/")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, OPTIONS"
        );
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type"
        );

        let body = body_text(resp).await;
        assert!(body.contains("APAE Lages"));
        assert!(body.contains("Chapecó"));
        assert!(body.contains("Com capacitações/recursos"));
    }

    #[tokio::test]
    async fn test_csv_download_is_seeded_verbatim() {
        let fixture = Fixture::new();
        let resp = fixture.app().oneshot(get("/dados.csv")).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let body = body_text(resp).await;
        assert!(body.contains("Lages,Serra,APAE Lages,Ambos"));
        assert_eq!(body, fixture.data_file("dados.csv"));
    }

    #[tokio::test]
    async fn test_missing_files_are_not_found_with_cors() {
        let fixture = Fixture::new();

        let resp = fixture.app().oneshot(get("/demografia.csv")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let resp = fixture
            .app()
            .oneshot(get("/sc_municipios.geojson"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_requires_session() {
        let fixture = Fixture::new();

        let resp = fixture.app().oneshot(get("/admin")).await.unwrap();
        assert!(resp.status().is_redirection());
        assert_eq!(resp.headers()[header::LOCATION], "/login");

        let resp = fixture
            .app()
            .oneshot(post("/admin", "form_type=demografia", None))
            .await
            .unwrap();
        assert_eq!(resp.headers()[header::LOCATION], "/login");
        assert!(!fixture
            .state
            .config
            .storage
            .data_dir
            .join("demografia.csv")
            .exists());
    }

    #[tokio::test]
    async fn test_anonymous_admin_post_redirects_before_parsing() {
        let fixture = Fixture::new();
        let req = Request::builder()
            .method("POST")
            .uri("/admin")
            .body(Body::from("{}"))
            .unwrap();

        let resp = fixture.app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_admin_post_without_form_body_is_rejected() {
        let fixture = Fixture::new();
        let app = fixture.app();
        let cookie = login(&app).await;
        let before = fixture.data_file("dados.csv");

        let req = Request::builder()
            .method("POST")
            .uri("/admin")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(fixture.data_file("dados.csv"), before);
    }

    #[tokio::test]
    async fn test_login_failure_rerenders_form() {
        let fixture = Fixture::new();
        let resp = fixture
            .app()
            .oneshot(post("/login", "username=admin&password=errada", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(resp).await.contains("Usuário ou senha incorretos."));
    }

    #[tokio::test]
    async fn test_login_then_admin_page() {
        let fixture = Fixture::new();
        let app = fixture.app();
        let cookie = login(&app).await;

        let req = Request::builder()
            .uri("/admin")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_text(resp).await;
        assert!(body.contains("name=\"nome_Lages_0\""));
        assert!(body.contains("name=\"demografia[Oficinas][0-12]\""));
    }

    #[tokio::test]
    async fn test_admin_add_persists_and_redirects() {
        let fixture = Fixture::new();
        let app = fixture.app();
        let cookie = login(&app).await;

        let resp = app
            .clone()
            .oneshot(post(
                "/admin",
                "form_type=instituicoes&add=1&municipio=Lages&nome=CER+Lages&quantidade_oficinas=abc&quantidade_ta=3",
                Some(&cookie),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/admin");

        let saved = fixture.data_file("dados.csv");
        assert!(saved.contains("Lages,Serra,APAE Lages,Todos,,,,1,0,0,0\r\n"));
        assert!(saved.contains("Lages,Serra,CER Lages,,,,,0,3,0,0\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_admin_adds_are_both_kept() {
        let fixture = Fixture::new();
        let app = fixture.app();
        let cookie = login(&app).await;

        let first = app.clone().oneshot(post(
            "/admin",
            "form_type=instituicoes&add=1&municipio=Lages&nome=Primeira",
            Some(&cookie),
        ));
        let second = app.clone().oneshot(post(
            "/admin",
            "form_type=instituicoes&add=1&municipio=Chapec%C3%B3&nome=Segunda",
            Some(&cookie),
        ));
        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap().status(), StatusCode::SEE_OTHER);
        assert_eq!(second.unwrap().status(), StatusCode::SEE_OTHER);

        let saved = fixture.data_file("dados.csv");
        assert!(saved.contains("Lages,Serra,Primeira,"));
        assert!(saved.contains("Chapecó,,Segunda,"));
        assert!(saved.contains("APAE Lages"));
    }

    #[tokio::test]
    async fn test_admin_demographics_write() {
        let fixture = Fixture::new();
        let app = fixture.app();
        let cookie = login(&app).await;

        let resp = app
            .clone()
            .oneshot(post(
                "/admin",
                "form_type=demografia&demografia%5BOpen+Day%5D%5B60%2B%5D=4",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let saved = fixture.data_file("demografia.csv");
        assert!(saved.starts_with("tipo_deficiencia,faixa_etaria,quantidade\r\n"));
        assert!(saved.contains("Open Day,60+,4\r\n"));
        assert!(saved.contains("Todos,0-12,0\r\n"));
        assert_eq!(saved.lines().count(), 17);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let fixture = Fixture::new();
        let resp = fixture.app().oneshot(get("/logout")).await.unwrap();

        assert_eq!(resp.headers()[header::LOCATION], "/login");
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
    }
}

//! Route handlers.
//!
//! Every read loads the data files fresh; nothing is cached between
//! requests.

use super::pages::{self, AdminView};
use super::session::logout_cookie;
use super::{AppError, AppState};
use crate::admin::{apply_admin_write, FormFields};
use crate::analysis::{build_dashboard, category_totals, edit_grid};
use crate::store::StoreResult;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info, warn};

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";
const LOGIN_ERROR: &str = "Usuário ou senha incorretos.";

/// Credentials posted by the login form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// `GET /`
pub async fn dashboard(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let snapshot = state.store.load_institutions()?;
    let records = state.store.load_demographics()?;
    let dashboard = build_dashboard(&snapshot, &records);

    debug!(
        "Dashboard: {} municipalities, {} demographic rows",
        dashboard.status.len(),
        records.len()
    );

    Ok(Html(pages::dashboard_page(&dashboard, &snapshot.book)))
}

fn file_response(bytes: StoreResult<Option<Vec<u8>>>, content_type: &'static str) -> Response {
    match bytes {
        Ok(Some(body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

/// `GET /dados.csv`
pub async fn institutions_csv(State(state): State<AppState>) -> Response {
    file_response(state.store.institutions_csv_bytes(), CSV_CONTENT_TYPE)
}

/// `GET /demografia.csv`
pub async fn demographics_csv(State(state): State<AppState>) -> Response {
    file_response(state.store.demographics_csv_bytes(), CSV_CONTENT_TYPE)
}

/// `GET /sc_municipios.geojson`
pub async fn geojson(State(state): State<AppState>) -> Response {
    file_response(state.store.geojson_bytes(), GEOJSON_CONTENT_TYPE)
}

/// `GET /login`
pub async fn login_form() -> Html<String> {
    Html(pages::login_page(None))
}

/// `POST /login`
pub async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if state.config.auth.check(&form.username, &form.password) {
        info!("Admin login for user '{}'", form.username);
        return (
            [(header::SET_COOKIE, state.session.login_cookie())],
            Redirect::to("/admin"),
        )
            .into_response();
    }

    warn!("Failed admin login for user '{}'", form.username);
    Html(pages::login_page(Some(LOGIN_ERROR))).into_response()
}

/// `GET /logout`
pub async fn logout() -> Response {
    ([(header::SET_COOKIE, logout_cookie())], Redirect::to("/login")).into_response()
}

/// `GET /admin`
pub async fn admin_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !state.session.is_logged_in(&headers) {
        return Ok(Redirect::to("/login").into_response());
    }

    let snapshot = state.store.load_institutions()?;
    let records = state.store.load_demographics()?;
    let page = pages::admin_page(&AdminView {
        book: &snapshot.book,
        regions: &snapshot.region_by_municipality,
        totals: category_totals(&snapshot.book),
        grid: edit_grid(&records),
    });

    Ok(Html(page).into_response())
}

/// `POST /admin`
///
/// The session is checked before the body is looked at, so anonymous
/// requests are redirected whatever they carry.
pub async fn admin_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<FormFields>, FormRejection>,
) -> Result<Response, AppError> {
    if !state.session.is_logged_in(&headers) {
        return Ok(Redirect::to("/login").into_response());
    }

    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!("Rejected admin submission: {}", rejection);
            return Ok(rejection.into_response());
        }
    };

    let outcome = {
        let _guard = state.write_lock.lock().await;
        let store = state.store.clone();
        tokio::task::spawn_blocking(move || apply_admin_write(&store, &form)).await??
    };
    debug!("Admin write: {:?}", outcome);

    Ok(Redirect::to("/admin").into_response())
}

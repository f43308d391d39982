use crate::state;
use crate::templates;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::Json;
use axum::body::Body;
use axum::extract::{Form, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct AuthErrorResponse {
    error: &'static str,
}

/// Gates the admin dashboard and the `/api/admin` surface. Everything else
/// (storefront, orders, push subscription endpoints) stays public.
pub(crate) async fn admin_guard(
    State(state): State<state::AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth) = &state.auth else {
        return next.run(req).await;
    };

    let path = req.uri().path();
    if !is_admin_path(path) {
        return next.run(req).await;
    }

    if let Some(token) = session_cookie(req.headers(), auth.cookie_name())
        && auth.verify_token(token).is_ok()
    {
        return next.run(req).await;
    }

    if path.starts_with("/api/") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(AuthErrorResponse {
                error: "unauthorized",
            }),
        )
            .into_response();
    }

    Redirect::to("/login").into_response()
}

fn is_admin_path(path: &str) -> bool {
    path == "/admin" || path.starts_with("/admin/") || path.starts_with("/api/admin/")
}

fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
    next: Option<String>,
}

pub(crate) async fn login_form(
    State(state): State<state::AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<templates::LoginTemplate, (StatusCode, &'static str)> {
    if state.auth.is_none() {
        return Err((StatusCode::NOT_FOUND, "not found"));
    }
    let next = sanitize_next(query.next.as_deref()).unwrap_or_else(|| "/admin".to_string());

    Ok(templates::LoginTemplate {
        company_name: state.settings.current().company_name,
        error: String::new(),
        next,
    })
}

pub(crate) async fn login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, templates::LoginTemplate)> {
    let settings = state.settings.current();
    let auth = state.auth.as_ref().ok_or((
        StatusCode::NOT_FOUND,
        templates::LoginTemplate {
            company_name: settings.company_name.clone(),
            error: "Admin sign-in is not enabled.".to_string(),
            next: String::new(),
        },
    ))?;
    let email = form.email.trim();
    let password = form.password;
    let next = sanitize_next(form.next.as_deref()).unwrap_or_else(|| "/admin".to_string());

    if email.is_empty() || password.trim().is_empty() {
        return Err(login_error(&settings.company_name, &next));
    }
    if !email.eq_ignore_ascii_case(settings.admin_email.trim()) {
        return Err(login_error(&settings.company_name, &next));
    }
    let Some(password_hash) = settings.admin_password_hash.as_deref() else {
        return Err(login_error(&settings.company_name, &next));
    };
    if !verify_password(&password, password_hash) {
        return Err(login_error(&settings.company_name, &next));
    }

    let token = match auth.issue_token(email) {
        Ok(token) => token,
        Err(err) => {
            eprintln!("failed to issue session token: {err}");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                templates::LoginTemplate {
                    company_name: settings.company_name,
                    error: "Failed to sign in.".to_string(),
                    next,
                },
            ));
        }
    };

    let mut response = Redirect::to(&next).into_response();
    let cookie = auth.session_cookie(&token);
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("session cookie header"),
    );
    Ok(response)
}

pub(crate) async fn logout(
    State(state): State<state::AppState>,
) -> Result<Response, (StatusCode, &'static str)> {
    let auth = state
        .auth
        .as_ref()
        .ok_or((StatusCode::NOT_FOUND, "not found"))?;
    let mut response = Redirect::to("/login").into_response();
    let cookie = auth.clear_cookie();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("logout cookie header"),
    );
    Ok(response)
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

fn sanitize_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.is_empty() {
        return None;
    }
    if !next.starts_with('/') || next.starts_with("//") || next.contains("://") {
        return None;
    }
    Some(next.to_string())
}

fn login_error(company_name: &str, next: &str) -> (StatusCode, templates::LoginTemplate) {
    (
        StatusCode::UNAUTHORIZED,
        templates::LoginTemplate {
            company_name: company_name.to_string(),
            error: "Invalid email or password.".to_string(),
            next: next.to_string(),
        },
    )
}

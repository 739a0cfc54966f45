//! 登录与登出.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use super::session::{expire_cookie, session_token, set_cookie};
use super::{blocking, ApiError, AppState};

const LOGIN_TEMPLATE: &str = include_str!("../../templates/login.html");

/// 用户码不存在时的提示.
pub const INCORRECT_CODE: &str = "Incorrect User Code.";

/// 登录表单.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    user_code: String,
}

fn render_login(error: Option<&str>) -> Html<String> {
    let flash = error
        .map(|e| format!(r#"<div class="flash">{e}</div>"#))
        .unwrap_or_default();
    Html(LOGIN_TEMPLATE.replace("{{ flash }}", &flash))
}

/// `GET /auth/login`.
pub async fn login_page() -> Html<String> {
    render_login(None)
}

/// `POST /auth/login`. 用户码存在时建立会话并跳转到评分页.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, ApiError> {
    let code = form.user_code.trim().to_string();
    let reviewer = blocking(&state, move |s| {
        let conn = s.lock_db()?;
        Ok(motscore::store::find_user(&conn, &code)?)
    })
    .await?;

    let Some(reviewer) = reviewer else {
        log::info!("event=login module=server status=rejected");
        return Ok(render_login(Some(INCORRECT_CODE)).into_response());
    };
    let token = state.sessions().create(&reviewer.code);
    log::info!("event=login module=server status=ok reviewer_id={}", reviewer.id);
    Ok(([(SET_COOKIE, set_cookie(&token))], Redirect::to("/")).into_response())
}

/// `GET /auth/logout`. 清除会话并跳转到首页.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        state.sessions().remove(&token);
    }
    ([(SET_COOKIE, expire_cookie())], Redirect::to("/"))
}

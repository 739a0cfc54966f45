//! 基于 cookie 的登录会话. 会话仅保存在内存中, 服务重启后需要重新登录.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::Redirect;

use super::AppState;

/// 会话 cookie 名.
pub const COOKIE_NAME: &str = "motscore_session";

/// 会话令牌到用户码的映射.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStore {
    fn map(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // 映射中没有跨调用的不变量, 中毒后继续使用是安全的.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 为 `code` 创建新会话, 返回令牌.
    pub fn create(&self, code: &str) -> String {
        let token = new_token();
        self.map().insert(token.clone(), code.to_string());
        token
    }

    /// 令牌对应的用户码.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.map().get(token).cloned()
    }

    /// 删除会话.
    pub fn remove(&self, token: &str) {
        self.map().remove(token);
    }

    /// 活跃会话数.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// 是否没有活跃会话?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 128 位随机令牌, 十六进制表示.
fn new_token() -> String {
    let bytes: [u8; 16] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// 从请求头中取出会话令牌.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

/// 设置会话 cookie 的 `Set-Cookie` 值.
pub fn set_cookie(token: &str) -> String {
    format!("{COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// 使会话 cookie 失效的 `Set-Cookie` 值.
pub fn expire_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// 当前登录的评审者用户码. 未登录时重定向到登录页.
#[derive(Debug, Clone)]
pub struct CurrentReviewer(pub String);

impl FromRequestParts<AppState> for CurrentReviewer {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_token(&parts.headers)
            .and_then(|token| state.sessions().resolve(&token))
            .map(CurrentReviewer)
            .ok_or_else(|| Redirect::to("/auth/login"))
    }
}

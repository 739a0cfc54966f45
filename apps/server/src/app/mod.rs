//! HTTP 服务.
//!
//! 所有数据库访问都经过同一把互斥锁, 锁只在单次追踪器调用期间持有.
//! 体积解码和切片编码在阻塞线程池中进行, 不持有锁.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use motscore::{ExtractSpec, ReviewTracker, ScorePolicy, Selection};
use rusqlite::Connection;
use serde::Serialize;

pub mod auth;
pub mod scoring;
pub mod session;

pub use session::{CurrentReviewer, SessionStore};

/// 服务端可配置项.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// 切片提取参数.
    pub extract: ExtractSpec,
    /// 待评体积的选取方式.
    pub selection: Selection,
    /// 评分规则.
    pub policy: ScorePolicy,
}

/// 所有请求共享的状态.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    sessions: SessionStore,
    settings: Arc<Settings>,
}

impl AppState {
    /// 以已完成迁移的连接创建.
    pub fn new(conn: Connection, settings: Settings) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            sessions: SessionStore::default(),
            settings: Arc::new(settings),
        }
    }

    /// 登录会话.
    #[inline]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// 服务端配置.
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))
    }

    /// 在持有数据库锁期间以配置好的追踪器执行 `f`.
    pub(crate) fn with_tracker<T>(
        &self,
        f: impl FnOnce(&ReviewTracker<'_>) -> motscore::Result<T>,
    ) -> Result<T, ApiError> {
        let conn = self.lock_db()?;
        let tracker = ReviewTracker::new(&conn)
            .with_selection(self.settings.selection)
            .with_policy(self.settings.policy.clone());
        Ok(f(&tracker)?)
    }
}

/// 在阻塞线程池中执行 `f`.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(AppState) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(state))
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

/// 接口错误. 序列化为 `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// 核心库返回的错误.
    Core(motscore::Error),
    /// 服务端内部错误.
    Internal(String),
}

impl From<motscore::Error> for ApiError {
    fn from(value: motscore::Error) -> Self {
        Self::Core(value)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Core(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Core(e) if e.is_validation() => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        if status.is_server_error() {
            log::error!("event=request module=server status=error code={} error={message}", status.as_u16());
        } else {
            log::warn!("event=request module=server status=rejected code={} error={message}", status.as_u16());
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// 构建路由.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(scoring::index))
        .route("/get_slices", get(scoring::get_slices))
        .route("/score", post(scoring::score))
        .route("/back", get(scoring::back))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .with_state(state)
}

/// 在 `addr` 上提供服务, 直到收到 Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("event=serve module=server status=start addr={}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    log::info!("event=serve module=server status=stop");
    Ok(())
}

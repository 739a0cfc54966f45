//! 评分页面与评分接口.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Html;
use axum::Json;
use motscore::store::Volume;
use motscore::{Decision, Progress, SliceTriple};
use serde::{Deserialize, Serialize};

use super::{blocking, ApiError, AppState, CurrentReviewer};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// `/get_slices` 和 `/back` 的返回内容. 切片为 base64 编码的 PNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicePayload {
    /// 体积主键.
    pub vol_id: i64,
    /// 冠状面.
    pub slice1: String,
    /// 矢状面.
    pub slice2: String,
    /// 横断面.
    pub slice3: String,
    /// 已评个数.
    pub done: u64,
    /// 体积总数.
    pub to_do: u64,
    /// 可保留个数.
    pub kept: u64,
}

impl SlicePayload {
    fn build(vol_id: i64, triple: SliceTriple, progress: Progress) -> motscore::Result<Self> {
        let [slice1, slice2, slice3] = triple.into_array();
        Ok(Self {
            vol_id,
            slice1: slice1.to_base64_png()?,
            slice2: slice2.to_base64_png()?,
            slice3: slice3.to_base64_png()?,
            done: progress.done,
            to_do: progress.total,
            kept: progress.kept,
        })
    }
}

/// `POST /score` 的请求体.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    vol_id: i64,
    score: u8,
    #[serde(default)]
    blur: bool,
    #[serde(default)]
    lines: bool,
}

impl From<ScoreRequest> for Decision {
    fn from(r: ScoreRequest) -> Self {
        Decision {
            vol_id: r.vol_id,
            score: r.score,
            blur: r.blur,
            lines: r.lines,
        }
    }
}

/// `POST /score` 的返回内容.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    /// 总是 `true`. 失败时返回错误体.
    pub success: bool,
}

/// 提取切片并附上最新进度. 提取期间不持有数据库锁.
fn render_volume(state: &AppState, reviewer: &str, volume: &Volume) -> Result<SlicePayload, ApiError> {
    let triple = motscore::extract(&volume.path, &state.settings().extract)?;
    let progress = state.with_tracker(|t| t.progress(reviewer))?;
    Ok(SlicePayload::build(volume.id, triple, progress)?)
}

/// `GET /`.
pub async fn index(_: CurrentReviewer) -> Html<&'static str> {
    Html(INDEX_TEMPLATE)
}

/// `GET /get_slices`. 下一个待评体积的三视图.
pub async fn get_slices(
    State(state): State<AppState>,
    CurrentReviewer(code): CurrentReviewer,
) -> Result<Json<SlicePayload>, ApiError> {
    blocking(&state, move |s| {
        let volume = s.with_tracker(|t| t.next_volume(&code))?;
        render_volume(&s, &code, &volume)
    })
    .await
    .map(Json)
}

/// `POST /score`. 记录一次评分. 请求体无法解析时按输入校验错误处理.
pub async fn score(
    State(state): State<AppState>,
    CurrentReviewer(code): CurrentReviewer,
    req: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let Json(req) = req.map_err(|rej| motscore::Error::Validation(rej.body_text()))?;
    let decision = Decision::from(req);
    blocking(&state, move |s| s.with_tracker(|t| t.record_review(&code, &decision))).await?;
    Ok(Json(ScoreResponse { success: true }))
}

/// `GET /back`. 撤销最近一次评分, 返回该体积的三视图.
pub async fn back(
    State(state): State<AppState>,
    CurrentReviewer(code): CurrentReviewer,
) -> Result<Json<SlicePayload>, ApiError> {
    blocking(&state, move |s| {
        let volume = s.with_tracker(|t| t.undo_last(&code))?;
        render_volume(&s, &code, &volume)
    })
    .await
    .map(Json)
}

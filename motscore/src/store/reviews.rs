//! 评分记录.
//!
//! 每位评审者对每个体积至多有一条记录, 由 `UNIQUE (judge_code, vol_id)` 约束保证.

use std::ops::RangeInclusive;

use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};

use super::{Review, REVIEW_COLUMNS};
use crate::{Error, Result};

/// 插入一条评分记录, 返回其主键.
///
/// # 错误
///
/// - 该评审者已评过该体积: `Error::Validation`;
/// - 评审者或体积不存在: `Error::NotFound`.
pub fn insert_review(
    conn: &Connection,
    judge_code: &str,
    vol_id: i64,
    score: u8,
    blur: bool,
    lines: bool,
) -> Result<i64> {
    let res = conn.execute(
        "INSERT INTO review (judge_code, vol_id, score, blur, lines) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![judge_code, vol_id, score, blur, lines],
    );
    match res {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE => Error::Validation(format!(
                    "volume {vol_id} was already reviewed by `{judge_code}`"
                )),
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Error::NotFound(format!(
                    "reviewer `{judge_code}` or volume {vol_id}"
                )),
                _ => Error::Validation(format!("review rejected by the store: {e}")),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// 删除 `judge_code` 对体积 `vol_id` 的评分. 返回删除条数.
pub fn delete_review(conn: &Connection, vol_id: i64, judge_code: &str) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM review WHERE vol_id = ?1 AND judge_code = ?2",
        params![vol_id, judge_code],
    )?;
    Ok(n)
}

/// `judge_code` 最近一次的评分. 时间戳相同时以主键大者为准.
pub fn last_review(conn: &Connection, judge_code: &str) -> Result<Option<Review>> {
    let review = conn
        .query_row(
            &format!(
                "SELECT {REVIEW_COLUMNS} FROM review WHERE judge_code = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1"
            ),
            [judge_code],
            Review::from_row,
        )
        .optional()?;
    Ok(review)
}

/// `judge_code` 的全部评分, 按主键顺序.
pub fn reviews_by(conn: &Connection, judge_code: &str) -> Result<Vec<Review>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REVIEW_COLUMNS} FROM review WHERE judge_code = ?1 ORDER BY id"
    ))?;
    let reviews = stmt
        .query_map([judge_code], Review::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(reviews)
}

/// `judge_code` 的评分条数.
pub fn count_reviews(conn: &Connection, judge_code: &str) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM review WHERE judge_code = ?1",
        [judge_code],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

/// `judge_code` 的评分中, 分数落在 `scores` 区间内的条数.
pub fn count_reviews_in(
    conn: &Connection,
    judge_code: &str,
    scores: &RangeInclusive<u8>,
) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM review WHERE judge_code = ?1 AND score BETWEEN ?2 AND ?3",
        params![judge_code, scores.start(), scores.end()],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

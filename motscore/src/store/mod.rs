//! SQLite 持久化存储.
//!
//! 三张表: `user` (评审者), `volume` (待评体积), `review` (评分记录).
//! 查询结果在此边界内转换为强类型的行对象, 不以字典形式向外传递.
//!
//! 返回的连接总是开启了 `foreign_keys`, 并已应用全部迁移.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{error, info};
use rusqlite::{Connection, Row};

use crate::Result;

pub mod migrations;
pub mod reviews;
pub mod users;
pub mod volumes;

pub use users::{create_user, find_user};
pub use volumes::{all_volumes, count_volumes, get_volume, insert_volumes, populate_volumes};

/// 一个已入库的体积. 入库后不再修改.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// 主键.
    pub id: i64,
    /// 受试者标签.
    pub sub_id: String,
    /// 会话标签, 可能为空.
    pub ses_id: String,
    /// nifti 文件路径.
    pub path: PathBuf,
    /// 所属数据集名称.
    pub dataset: String,
}

/// 已注册的评审者.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    /// 主键.
    pub id: i64,
    /// 登录用的用户码.
    pub code: String,
    /// 联系邮箱.
    pub email: String,
}

/// 一条评分记录.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    /// 主键, 随插入顺序递增.
    pub id: i64,
    /// 评审者用户码.
    pub judge_code: String,
    /// 被评体积主键.
    pub vol_id: i64,
    /// 分数.
    pub score: u8,
    /// 是否模糊.
    pub blur: bool,
    /// 是否有条纹伪影.
    pub lines: bool,
    /// 创建时间, SQLite `CURRENT_TIMESTAMP` 格式 (UTC, 精确到秒).
    pub created_at: String,
}

pub(crate) const VOLUME_COLUMNS: &str = "id, sub_id, ses_id, volume_path, dataset";

impl Volume {
    /// 按 [`VOLUME_COLUMNS`] 的列顺序读取.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sub_id: row.get(1)?,
            ses_id: row.get(2)?,
            path: PathBuf::from(row.get::<_, String>(3)?),
            dataset: row.get(4)?,
        })
    }
}

impl Reviewer {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            email: row.get(2)?,
        })
    }
}

pub(crate) const REVIEW_COLUMNS: &str =
    "id, judge_code, vol_id, score, blur, lines, created_at";

impl Review {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            judge_code: row.get(1)?,
            vol_id: row.get(2)?,
            score: row.get(3)?,
            blur: row.get(4)?,
            lines: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// 打开 SQLite 数据库文件并应用所有尚未应用的迁移. 父目录不存在时会被创建.
pub fn open_db(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!(
        "event=db_open module=store status=start mode=file path={}",
        path.display()
    );

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path).map_err(|err| {
        error!(
            "event=db_open module=store status=error mode=file duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;
    finish_open(conn, "file", started_at)
}

/// 打开内存数据库并应用所有迁移.
pub fn open_db_in_memory() -> Result<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=store status=start mode=memory");
    let conn = Connection::open_in_memory()?;
    finish_open(conn, "memory", started_at)
}

fn finish_open(mut conn: Connection, mode: &str, started_at: Instant) -> Result<Connection> {
    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=store status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=store status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    migrations::migrate(conn)?;
    Ok(())
}

/// 清空所有表并重新建立表结构.
pub fn reset_db(conn: &mut Connection) -> Result<()> {
    migrations::rebuild(conn)?;
    info!("event=db_reset module=store status=ok");
    Ok(())
}

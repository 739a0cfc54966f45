//! 表结构版本.
//!
//! 第 `n` 个脚本把表结构从版本 `n - 1` 升级到 `n`, 当前版本记在 `PRAGMA user_version` 中.

use rusqlite::{Connection, Transaction};

use crate::{Error, Result};

const SCRIPTS: [&str; 1] = [include_str!("0001_init.sql")];

/// 重建时按外键依赖的逆序删除.
const TABLES: [&str; 3] = ["review", "volume", "user"];

/// 程序支持的最新表结构版本.
#[inline]
pub fn latest_version() -> u32 {
    SCRIPTS.len() as u32
}

/// 数据库记录的表结构版本. 新建的数据库为 0.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// 在 `tx` 中依次执行版本 `from` 之后的所有脚本.
fn upgrade(tx: &Transaction<'_>, from: u32) -> Result<()> {
    for (version, sql) in (1u32..).zip(SCRIPTS).skip(from as usize) {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        log::info!("event=db_migrate module=store status=ok version={version}");
    }
    Ok(())
}

/// 将表结构升级到最新版本. 已是最新时什么都不做.
///
/// 数据库版本比程序支持的更新时返回 `Error::UnsupportedSchemaVersion`.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let version = schema_version(conn)?;
    let latest = latest_version();
    if version > latest {
        return Err(Error::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: latest,
        });
    }
    if version < latest {
        let tx = conn.transaction()?;
        upgrade(&tx, version)?;
        tx.commit()?;
    }
    Ok(())
}

/// 在同一事务中删除所有表, 再从版本 0 重建.
pub fn rebuild(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    for table in TABLES {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    upgrade(&tx, 0)?;
    tx.commit()?;
    Ok(())
}

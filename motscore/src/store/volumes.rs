//! 体积入库与查询.

use std::path::Path;

use rand::seq::SliceRandom;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Volume, VOLUME_COLUMNS};
use crate::dataset::{self, VolumeRecord};
use crate::Result;

/// 在一个事务中插入 `records`, 按给定顺序分配主键. 返回插入条数.
pub fn insert_volumes(conn: &mut Connection, records: &[VolumeRecord]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO volume (sub_id, ses_id, volume_path, dataset) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in records {
            stmt.execute(params![
                r.sub_id,
                r.ses_id,
                r.path.to_string_lossy(),
                r.dataset
            ])?;
        }
    }
    tx.commit()?;
    Ok(records.len())
}

/// 浏览 BIDS 数据集 `root`, 打乱后入库. 返回插入条数.
///
/// 打乱使得按主键顺序评审也不会集中在同一受试者上.
pub fn populate_volumes<P: AsRef<Path>>(
    conn: &mut Connection,
    root: P,
    modality: &str,
) -> Result<usize> {
    let mut records = dataset::list_volumes(root.as_ref(), modality)?;
    records.shuffle(&mut rand::rng());
    let n = insert_volumes(conn, &records)?;
    log::info!(
        "event=populate_volumes module=store status=ok root={} inserted={n}",
        root.as_ref().display()
    );
    Ok(n)
}

/// 体积总数.
pub fn count_volumes(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM volume", [], |row| row.get(0))?;
    Ok(n as u64)
}

/// 按主键查询体积.
pub fn get_volume(conn: &Connection, id: i64) -> Result<Option<Volume>> {
    let volume = conn
        .query_row(
            &format!("SELECT {VOLUME_COLUMNS} FROM volume WHERE id = ?1"),
            [id],
            Volume::from_row,
        )
        .optional()?;
    Ok(volume)
}

/// 按主键顺序列出所有体积.
pub fn all_volumes(conn: &Connection) -> Result<Vec<Volume>> {
    let mut stmt = conn.prepare(&format!("SELECT {VOLUME_COLUMNS} FROM volume ORDER BY id"))?;
    let volumes = stmt
        .query_map([], Volume::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(volumes)
}

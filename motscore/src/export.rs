//! 评分结果导出.

use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;

use crate::Result;

/// CSV 中的一行: 一条评分及其体积信息. 布尔值写作 `0`/`1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// 受试者标签.
    pub sub_id: String,
    /// 会话标签.
    pub ses_id: String,
    /// 体积文件路径.
    pub volume_path: String,
    /// 评审者用户码.
    pub judge_code: String,
    /// 分数.
    pub score: u8,
    /// 是否模糊.
    pub blur: u8,
    /// 是否有条纹伪影.
    pub lines: u8,
    /// 数据集名称.
    pub dataset: String,
}

/// 查询所有评分, 按评分主键排序.
pub fn export_rows(conn: &Connection) -> Result<Vec<ExportRow>> {
    let mut stmt = conn.prepare(
        "SELECT V.sub_id, V.ses_id, V.volume_path, R.judge_code, R.score, R.blur, R.lines, V.dataset
         FROM review R
         JOIN volume V ON V.id = R.vol_id
         ORDER BY R.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ExportRow {
                sub_id: row.get(0)?,
                ses_id: row.get(1)?,
                volume_path: row.get(2)?,
                judge_code: row.get(3)?,
                score: row.get(4)?,
                blur: u8::from(row.get::<_, bool>(5)?),
                lines: u8::from(row.get::<_, bool>(6)?),
                dataset: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// 将所有评分写入 `path` 处的 CSV 文件, 返回写出的行数 (不含表头).
///
/// 父目录不存在时会被创建. 即使没有评分, 也会写出表头.
pub fn export_csv<P: AsRef<Path>>(conn: &Connection, path: P) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let rows = export_rows(conn)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(HEADER)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    log::info!(
        "event=export_csv module=export status=ok path={} rows={}",
        path.display(),
        rows.len()
    );
    Ok(rows.len())
}

const HEADER: [&str; 8] = [
    "sub_id",
    "ses_id",
    "volume_path",
    "judge_code",
    "score",
    "blur",
    "lines",
    "dataset",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::VolumeRecord;
    use crate::store::{create_user, insert_volumes, open_db_in_memory, reviews};

    #[test]
    fn test_export_empty_writes_header() {
        let conn = open_db_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("reviews.csv");
        assert_eq!(export_csv(&conn, &path).unwrap(), 0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "sub_id,ses_id,volume_path,judge_code,score,blur,lines,dataset\n");
    }

    #[test]
    fn test_export_rows() {
        let mut conn = open_db_in_memory().unwrap();
        create_user(&conn, "a@b.c", Some("test")).unwrap();
        insert_volumes(
            &mut conn,
            &[VolumeRecord {
                sub_id: "01".into(),
                ses_id: "".into(),
                path: "/d/sub-01_T1w.nii.gz".into(),
                dataset: "ds".into(),
            }],
        )
        .unwrap();
        reviews::insert_review(&conn, "test", 1, 3, true, false).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        assert_eq!(export_csv(&conn, &path).unwrap(), 1);
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "01,,/d/sub-01_T1w.nii.gz,test,3,1,0,ds");
    }
}

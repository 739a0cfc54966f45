//! 评分进度追踪.
//!
//! 对每个 (评审者, 体积) 对, 状态只在 "未评" 和 "已评" 之间转换:
//! [`ReviewTracker::record_review`] 使其变为已评, [`ReviewTracker::undo_last`]
//! 使该评审者最近一次评分的体积回到未评. 评审者身份总是显式传入.

use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension};

use crate::consts::score::{KEPT_SCORES, MAX_SCORE};
use crate::store::{self, reviews, Volume, VOLUME_COLUMNS};
use crate::{Error, Result};

/// 下一个待评体积的选取方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Selection {
    /// 在未评体积中均匀随机选取.
    #[default]
    Random,
    /// 选取主键最小的未评体积. 入库时已打乱, 因此顺序本身是随机的.
    Sequential,
}

impl Selection {
    fn order_by(self) -> &'static str {
        match self {
            Self::Random => "RANDOM()",
            Self::Sequential => "V.id",
        }
    }
}

impl Display for Selection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
        })
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!(
                "unknown selection `{other}`, expected `random` or `sequential`"
            )),
        }
    }
}

/// 评分规则: 允许的最高分和可保留区间.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScorePolicy {
    max_score: u8,
    kept: RangeInclusive<u8>,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            max_score: MAX_SCORE,
            kept: KEPT_SCORES,
        }
    }
}

impl ScorePolicy {
    /// 构建评分规则. 可保留区间必须落在 `0..=max_score` 内, 否则返回 `None`.
    pub fn new(max_score: u8, kept: RangeInclusive<u8>) -> Option<Self> {
        (kept.start() <= kept.end() && *kept.end() <= max_score).then_some(Self { max_score, kept })
    }

    /// 允许的最高分.
    #[inline]
    pub fn max_score(&self) -> u8 {
        self.max_score
    }

    /// 可保留的分数区间.
    #[inline]
    pub fn kept(&self) -> &RangeInclusive<u8> {
        &self.kept
    }

    /// 分数是否可保留?
    #[inline]
    pub fn is_kept(&self, score: u8) -> bool {
        self.kept.contains(&score)
    }

    fn validate(&self, score: u8) -> Result<()> {
        if score > self.max_score {
            return Err(Error::Validation(format!(
                "score {score} is above the maximum {}",
                self.max_score
            )));
        }
        Ok(())
    }
}

/// 评审者对一个体积的评价.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decision {
    /// 被评体积主键.
    pub vol_id: i64,
    /// 分数.
    pub score: u8,
    /// 是否模糊.
    pub blur: bool,
    /// 是否有条纹伪影.
    pub lines: bool,
}

/// 某位评审者的进度.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Progress {
    /// 全部体积数, 与评审者无关.
    pub total: u64,
    /// 该评审者已评的体积数.
    pub done: u64,
    /// 已评体积中分数可保留的个数.
    pub kept: u64,
}

impl Progress {
    /// 剩余未评的体积数.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.done)
    }
}

/// 基于 SQLite 连接的评分进度追踪器.
#[derive(Debug)]
pub struct ReviewTracker<'conn> {
    conn: &'conn Connection,
    selection: Selection,
    policy: ScorePolicy,
}

impl<'conn> ReviewTracker<'conn> {
    /// 以默认配置 (随机选取, 默认评分规则) 创建.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            selection: Selection::default(),
            policy: ScorePolicy::default(),
        }
    }

    /// 设置选取方式.
    #[inline]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// 设置评分规则.
    #[inline]
    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 当前评分规则.
    #[inline]
    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    fn ensure_reviewer(&self, reviewer: &str) -> Result<()> {
        match store::find_user(self.conn, reviewer)? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("reviewer `{reviewer}`"))),
        }
    }

    /// 选取一个 `reviewer` 尚未评过的体积.
    ///
    /// 评审者未注册, 或已评完所有体积时返回 `Error::NotFound`.
    pub fn next_volume(&self, reviewer: &str) -> Result<Volume> {
        self.ensure_reviewer(reviewer)?;
        let sql = format!(
            "SELECT {cols} FROM volume V
             WHERE NOT EXISTS (
                 SELECT 1 FROM review R WHERE R.vol_id = V.id AND R.judge_code = ?1
             )
             ORDER BY {order} LIMIT 1",
            cols = qualified_volume_columns(),
            order = self.selection.order_by(),
        );
        self.conn
            .query_row(&sql, [reviewer], Volume::from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("no volume left for reviewer `{reviewer}`")))
    }

    /// 记录 `reviewer` 的一次评价.
    ///
    /// # 错误
    ///
    /// - 分数超过上限, 或该体积已被该评审者评过: `Error::Validation`;
    /// - 评审者或体积不存在: `Error::NotFound`.
    pub fn record_review(&self, reviewer: &str, decision: &Decision) -> Result<()> {
        self.policy.validate(decision.score)?;
        self.ensure_reviewer(reviewer)?;
        if store::get_volume(self.conn, decision.vol_id)?.is_none() {
            return Err(Error::NotFound(format!("volume {}", decision.vol_id)));
        }
        let id = reviews::insert_review(
            self.conn,
            reviewer,
            decision.vol_id,
            decision.score,
            decision.blur,
            decision.lines,
        )?;
        log::info!(
            "event=record_review module=tracker status=ok review_id={id} vol_id={} score={}",
            decision.vol_id,
            decision.score
        );
        Ok(())
    }

    /// `reviewer` 最近一次评分的体积. 没有评分时返回 `Error::NotFound`.
    pub fn last_reviewed(&self, reviewer: &str) -> Result<Volume> {
        let review = reviews::last_review(self.conn, reviewer)?
            .ok_or_else(|| Error::NotFound(format!("no review by `{reviewer}`")))?;
        store::get_volume(self.conn, review.vol_id)?
            .ok_or_else(|| Error::NotFound(format!("volume {}", review.vol_id)))
    }

    /// 撤销 `reviewer` 最近一次评分, 返回重新变为未评的体积.
    ///
    /// 没有评分时返回 `Error::NotFound`, 不做任何修改.
    pub fn undo_last(&self, reviewer: &str) -> Result<Volume> {
        let volume = self.last_reviewed(reviewer)?;
        reviews::delete_review(self.conn, volume.id, reviewer)?;
        log::info!(
            "event=undo_review module=tracker status=ok vol_id={}",
            volume.id
        );
        Ok(volume)
    }

    /// `reviewer` 的进度. 未注册的评审者进度为 `(total, 0, 0)`.
    pub fn progress(&self, reviewer: &str) -> Result<Progress> {
        Ok(Progress {
            total: store::count_volumes(self.conn)?,
            done: reviews::count_reviews(self.conn, reviewer)?,
            kept: reviews::count_reviews_in(self.conn, reviewer, self.policy.kept())?,
        })
    }
}

/// 带表别名 `V.` 前缀的体积列.
fn qualified_volume_columns() -> String {
    VOLUME_COLUMNS
        .split(", ")
        .map(|c| format!("V.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::VolumeRecord;
    use crate::store::{create_user, insert_volumes, open_db_in_memory};

    fn setup(n: usize) -> Connection {
        let mut conn = open_db_in_memory().unwrap();
        create_user(&conn, "fake@email.com", Some("test")).unwrap();
        let records: Vec<_> = (0..n)
            .map(|i| VolumeRecord {
                sub_id: format!("{i:02}"),
                ses_id: "1".into(),
                path: format!("/vol/{i}.nii.gz").into(),
                dataset: "ds".into(),
            })
            .collect();
        insert_volumes(&mut conn, &records).unwrap();
        conn
    }

    fn decision(vol_id: i64, score: u8) -> Decision {
        Decision {
            vol_id,
            score,
            blur: false,
            lines: false,
        }
    }

    #[test]
    fn test_qualified_columns() {
        assert_eq!(
            qualified_volume_columns(),
            "V.id, V.sub_id, V.ses_id, V.volume_path, V.dataset"
        );
    }

    #[test]
    fn test_next_volume_excludes_reviewed() {
        let conn = setup(3);
        let tracker = ReviewTracker::new(&conn);
        let mut seen = Vec::new();
        for _ in 0..3 {
            let v = tracker.next_volume("test").unwrap();
            assert!(!seen.contains(&v.id));
            tracker.record_review("test", &decision(v.id, 5)).unwrap();
            seen.push(v.id);
        }
        assert!(tracker.next_volume("test").unwrap_err().is_not_found());
    }

    #[test]
    fn test_sequential_selection() {
        let conn = setup(3);
        let tracker = ReviewTracker::new(&conn).with_selection(Selection::Sequential);
        assert_eq!(tracker.next_volume("test").unwrap().id, 1);
        tracker.record_review("test", &decision(1, 0)).unwrap();
        assert_eq!(tracker.next_volume("test").unwrap().id, 2);
    }

    #[test]
    fn test_unknown_reviewer() {
        let conn = setup(1);
        let tracker = ReviewTracker::new(&conn);
        assert!(tracker.next_volume("ghost").unwrap_err().is_not_found());
        assert!(tracker
            .record_review("ghost", &decision(1, 0))
            .unwrap_err()
            .is_not_found());
        assert_eq!(
            tracker.progress("ghost").unwrap(),
            Progress {
                total: 1,
                done: 0,
                kept: 0
            }
        );
    }

    #[test]
    fn test_record_review_validation() {
        let conn = setup(2);
        let tracker = ReviewTracker::new(&conn);
        assert!(tracker
            .record_review("test", &decision(1, MAX_SCORE + 1))
            .unwrap_err()
            .is_validation());
        assert!(tracker
            .record_review("test", &decision(99, 0))
            .unwrap_err()
            .is_not_found());

        tracker.record_review("test", &decision(1, MAX_SCORE)).unwrap();
        assert!(tracker
            .record_review("test", &decision(1, 0))
            .unwrap_err()
            .is_validation());
        assert_eq!(tracker.progress("test").unwrap().done, 1);
    }

    #[test]
    fn test_undo_restores_volume() {
        let conn = setup(3);
        let tracker = ReviewTracker::new(&conn);
        assert!(tracker.undo_last("test").unwrap_err().is_not_found());

        tracker.record_review("test", &decision(2, 0)).unwrap();
        tracker.record_review("test", &decision(3, 1)).unwrap();
        assert_eq!(tracker.last_reviewed("test").unwrap().id, 3);

        let restored = tracker.undo_last("test").unwrap();
        assert_eq!(restored.id, 3);
        assert_eq!(tracker.last_reviewed("test").unwrap().id, 2);
        assert_eq!(
            tracker.progress("test").unwrap(),
            Progress {
                total: 3,
                done: 1,
                kept: 1
            }
        );
    }

    #[test]
    fn test_custom_policy() {
        let conn = setup(2);
        let policy = ScorePolicy::new(4, 0..=2).unwrap();
        let tracker = ReviewTracker::new(&conn).with_policy(policy);
        tracker.record_review("test", &decision(1, 2)).unwrap();
        assert!(tracker
            .record_review("test", &decision(2, 5))
            .unwrap_err()
            .is_validation());
        assert_eq!(tracker.progress("test").unwrap().kept, 1);

        assert!(ScorePolicy::new(4, 0..=5).is_none());
        assert_eq!(ScorePolicy::default().max_score(), MAX_SCORE);
    }

    #[test]
    fn test_selection_from_str() {
        assert_eq!("Sequential".parse::<Selection>().unwrap(), Selection::Sequential);
        assert!("first".parse::<Selection>().is_err());
    }
}

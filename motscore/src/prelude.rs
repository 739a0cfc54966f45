//! 🧠欢迎光临🧠
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{AxisCode, AxisCodes, GraySlice, GrayWindow, MriVolume, NiftiHeaderAttr};
pub use crate::data::{ImgWriteRaw, ScanSlice};

pub use crate::consts::score::{is_kept, KEPT_SCORES, MAX_SCORE};

pub use crate::dataset::{self, list_volumes, VolumeRecord};
pub use crate::export::export_csv;
pub use crate::extract::{extract, extract_many, ExtractSpec, SliceTriple, UniformPolicy};

pub use crate::store::{self, open_db, open_db_in_memory, Review, Reviewer, Volume};
pub use crate::tracker::{Decision, Progress, ReviewTracker, ScorePolicy, Selection};

pub use crate::{Error, Result};

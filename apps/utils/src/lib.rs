//! 命令行和服务端共用的组件: 路径默认值和日志初始化.

use std::env;
use std::path::PathBuf;

/// 数据库路径环境变量.
pub const DATABASE_ENV: &str = "MOTSCORE_DATABASE";

/// 数据集目录环境变量.
pub const DATASET_ENV: &str = "MOTSCORE_DATASET_DIR";

/// 获取 `{用户主目录}/.motscore` 下给定文件名的全路径. 无法确定主目录时退回当前目录.
fn home_state_file(name: &str) -> PathBuf {
    let mut ans = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ans.push(".motscore");
    ans.push(name);
    ans
}

/// 获取数据库文件路径.
///
/// 1. 若环境变量 `$MOTSCORE_DATABASE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/.motscore/motscore.sqlite`.
pub fn database_from_env_or_home() -> PathBuf {
    match env::var(DATABASE_ENV) {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => home_state_file("motscore.sqlite"),
    }
}

/// 获取 BIDS 数据集目录.
///
/// 1. 若环境变量 `$MOTSCORE_DATASET_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset`. 无法确定主目录时返回 `None`.
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATASET_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => motscore::dataset::home_dataset_dir(),
    }
}

/// 初始化 `env_logger`. `RUST_LOG` 未设置时, `verbose` 为真使用 Debug 级别, 否则 Info.
///
/// 重复调用是无害的.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

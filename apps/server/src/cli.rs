//! `motscore` 命令行.

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use motscore::consts::DEFAULT_MODALITY;
use motscore::{dataset, store, ExtractSpec, ImgWriteRaw, Selection, UniformPolicy};

use crate::app::{self, AppState, Settings};

/// MRI 体积运动伪影众包评分.
#[derive(Debug, Parser)]
#[command(name = "motscore", version, about)]
pub struct Cli {
    /// SQLite 数据库文件. 默认为 `$HOME/.motscore/motscore.sqlite`.
    #[arg(long, global = true, env = "MOTSCORE_DATABASE")]
    pub database: Option<PathBuf>,

    /// 输出 Debug 级别日志.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// 子命令.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 清空数据库并重建表结构.
    InitDb,

    /// 注册评审者并输出其用户码.
    CreateUser {
        /// 评审者邮箱.
        #[arg(long)]
        email: String,
        /// 指定用户码而不是随机生成.
        #[arg(long)]
        code: Option<String>,
    },

    /// 将 BIDS 数据集中的体积打乱后入库.
    PopulateVolumes {
        /// 数据集根目录. 默认为 `$MOTSCORE_DATASET_DIR` 或 `$HOME/dataset`.
        #[arg(long, alias = "dataset_path")]
        dataset_path: Option<PathBuf>,
        /// `dataset_path` 是包含多个数据集的父目录.
        #[arg(short, long)]
        multiple: bool,
        /// 收集的模态后缀.
        #[arg(long, default_value = DEFAULT_MODALITY)]
        modality: String,
    },

    /// 导出所有评分为 CSV.
    ExportCsv {
        /// 输出文件.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// 提取单个体积的三视图并保存为 PNG.
    Slices {
        /// nifti 体积文件.
        #[arg(long)]
        volume: PathBuf,
        /// 输出目录.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// 对所有已入库体积试运行切片提取, 报告失败项.
    CheckVolumes {
        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// 启动 Web 服务.
    Serve {
        /// 监听地址.
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
        /// 待评体积的选取方式: `random` 或 `sequential`.
        #[arg(long, default_value_t = Selection::Random)]
        selection: Selection,
        #[command(flatten)]
        extract: ExtractArgs,
    },
}

/// 切片提取参数.
#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// 裁剪到像素值大于该阈值的包围盒. 不指定则不裁剪.
    #[arg(long, allow_negative_numbers = true)]
    pub crop_threshold: Option<i16>,
    /// 均匀切片的处理方式: `fail` 或 `zero`.
    #[arg(long, default_value_t = UniformPolicy::Fail)]
    pub on_uniform: UniformPolicy,
}

impl From<&ExtractArgs> for ExtractSpec {
    fn from(args: &ExtractArgs) -> Self {
        ExtractSpec::new()
            .with_crop_threshold(args.crop_threshold)
            .with_uniform_policy(args.on_uniform)
    }
}

/// 执行命令, 面向用户的输出写入 `out`.
pub fn run<W: Write>(cli: Cli, out: &mut W) -> anyhow::Result<()> {
    let database = cli.database.unwrap_or_else(utils::database_from_env_or_home);
    log::debug!("event=cli module=cli database={}", database.display());

    match cli.command {
        Command::InitDb => {
            let mut conn = store::open_db(&database)?;
            store::reset_db(&mut conn)?;
            writeln!(out, "Initialized the database.")?;
        }
        Command::CreateUser { email, code } => {
            let conn = store::open_db(&database)?;
            let code = store::create_user(&conn, &email, code.as_deref())?;
            writeln!(out, "User inserted, code : {code} .")?;
        }
        Command::PopulateVolumes {
            dataset_path,
            multiple,
            modality,
        } => {
            let root = match dataset_path {
                Some(p) => p,
                None => utils::dataset_dir_from_env_or_home()
                    .context("cannot determine the dataset directory, pass --dataset-path")?,
            };
            let mut conn = store::open_db(&database)?;
            let roots = if multiple {
                dataset::list_datasets(&root)?
            } else {
                vec![root]
            };
            for root in roots {
                let n = store::populate_volumes(&mut conn, &root, &modality)?;
                writeln!(out, "Inserted {n} volumes.")?;
            }
        }
        Command::ExportCsv { output } => {
            let conn = store::open_db(&database)?;
            motscore::export_csv(&conn, &output)?;
            writeln!(out, "Write at {}.", output.display())?;
        }
        Command::Slices {
            volume,
            out: dir,
            extract,
        } => {
            let triple = motscore::extract(&volume, &ExtractSpec::from(&extract))?;
            std::fs::create_dir_all(&dir)?;
            for (i, slice) in triple.into_array().iter().enumerate() {
                let path = dir.join(format!("slice{}.png", i + 1));
                slice
                    .save_raw(&path)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                writeln!(out, "Write at {}.", path.display())?;
            }
        }
        Command::CheckVolumes { extract } => check_volumes(&database, &ExtractSpec::from(&extract), out)?,
        Command::Serve {
            addr,
            selection,
            extract,
        } => {
            let conn = store::open_db(&database)?;
            let settings = Settings {
                extract: ExtractSpec::from(&extract),
                selection,
                ..Settings::default()
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(app::serve(addr, AppState::new(conn, settings)))?;
        }
    }
    Ok(())
}

fn check_volumes<W: Write>(database: &Path, spec: &ExtractSpec, out: &mut W) -> anyhow::Result<()> {
    let conn = store::open_db(database)?;
    let volumes = store::all_volumes(&conn)?;
    let paths: Vec<_> = volumes.iter().map(|v| v.path.clone()).collect();

    let mut failed = 0usize;
    for (volume, res) in volumes.iter().zip(motscore::extract_many(&paths, spec)) {
        if let Err(e) = res {
            failed += 1;
            writeln!(out, "FAIL {} {}: {e}", volume.id, volume.path.display())?;
        }
    }
    writeln!(out, "Checked {} volumes, {failed} failed.", volumes.len())?;
    if failed > 0 {
        bail!("{failed} volumes cannot be extracted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_args() {
        let cli = Cli::try_parse_from([
            "motscore",
            "--database",
            "/tmp/x.sqlite",
            "serve",
            "--selection",
            "sequential",
            "--crop-threshold",
            "-1",
            "--on-uniform",
            "zero",
        ])
        .unwrap();
        let Command::Serve {
            addr,
            selection,
            extract,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(addr.port(), 5000);
        assert_eq!(selection, Selection::Sequential);
        let spec = ExtractSpec::from(&extract);
        assert_eq!(spec.crop_threshold(), Some(-1));
        assert_eq!(spec.uniform_policy(), UniformPolicy::Zero);
    }
}

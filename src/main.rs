// src/main.rs

use std::error::Error;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use shotexec::config::{load_mission, load_parameters};
use shotexec::simulation::run_mission;

/// 撮影ミッションをシミュレーション上で実行する
#[derive(Parser, Debug)]
#[command(author, version, about = "Shot execution pipeline on a kinematic vehicle")]
struct Args {
    /// ショット実行パラメータ
    #[arg(long, default_value = "config/shot_executer.yaml")]
    params: PathBuf,

    /// ミッション定義
    #[arg(long, default_value = "config/mission.yaml")]
    mission: PathBuf,

    /// 状態ログの出力先
    #[arg(short, long, default_value = "output/shot_log.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    // 設定とミッションの読み込み
    let params = load_parameters(&args.params)?;
    let mission = load_mission(&args.mission)?;
    info!(drone = params.drone_id, goals = mission.goals.len(), "mission loaded");

    // CSV出力の設定
    if let Some(dir) = args.output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut writer = BufWriter::new(File::create(&args.output)?);

    let results = run_mission(&params, &mission, &mut writer).await?;
    for (index, result) in results.iter().enumerate() {
        match &result.error {
            Some(e) => warn!(goal = index, error = %e, "goal failed"),
            None if !result.failed_waypoints.is_empty() => warn!(
                goal = index,
                failed_waypoints = ?result.failed_waypoints,
                "goal finished with unreached waypoints"
            ),
            None => info!(goal = index, achieved = result.achieved, "goal finished"),
        }
    }
    info!(output = %args.output.display(), "log written");
    Ok(())
}

//! Best-effort invocation of the external bulk downloader.
//!
//! One blocking subprocess per configured mission. The downloader's output is
//! not inspected and its exit status carries no contract; any failure is
//! logged and the run proceeds to extraction with whatever landed on disk.

use crate::input::{MissionConfig, PipelineConfig};
use chrono::Utc;
use log::{info, warn};
use std::fs;
use std::process::{Command, ExitStatus};

/// Builds the downloader argument vector for one mission.
///
/// Layout: `-c <collection> -d <dir> -sd <start> -ed <end> -e .nc`. An
/// open-ended mission resolves its end date to the current day.
pub fn downloader_args(mission: &MissionConfig) -> Vec<String> {
    let end_date = mission
        .end_date
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%dT00:00:00Z").to_string());
    vec![
        "-c".to_string(),
        mission.collection.clone(),
        "-d".to_string(),
        mission.data_dir.display().to_string(),
        "-sd".to_string(),
        mission.start_date.clone(),
        "-ed".to_string(),
        end_date,
        "-e".to_string(),
        ".nc".to_string(),
    ]
}

/// Runs the downloader for one mission, blocking until it exits.
///
/// Ensures the mission's data directory exists before spawning.
pub fn fetch_mission(bin: &str, mission: &MissionConfig) -> std::io::Result<ExitStatus> {
    fs::create_dir_all(&mission.data_dir)?;
    Command::new(bin).args(downloader_args(mission)).status()
}

/// Downloads every configured mission in order, best effort.
pub fn fetch_all(config: &PipelineConfig) {
    for mission in &config.missions {
        info!(
            "Downloading {} data ({} -> {})",
            mission.name,
            mission.start_date,
            mission.end_date.as_deref().unwrap_or("present")
        );
        match fetch_mission(&config.downloader_bin, mission) {
            Ok(status) if status.success() => {
                info!("{} download complete", mission.name);
            }
            Ok(status) => {
                warn!(
                    "{} downloader exited with {}; continuing",
                    mission.name, status
                );
            }
            Err(err) => {
                warn!(
                    "Could not run '{}' for {}: {}; continuing",
                    config.downloader_bin, mission.name, err
                );
            }
        }
    }
}

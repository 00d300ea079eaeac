mod etl;

use std::fs::{create_dir_all, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_mapdata::Result;

use crate::etl::parse_osm::ParseOsmEtl;
use crate::etl::Etl;

const DEFAULT_CONFIG_PATH: &str = "config/osm_decode.json";

/// Which of the server's document shapes the input file holds.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Map,
    Changes,
    Diff,
}

#[derive(Deserialize)]
pub struct UserConfig {
    pub data_path: String,
    pub dest_path: String,
    #[serde(default)]
    pub document: DocumentKind,
    /// Decode again even if a summary from an earlier run exists.
    #[serde(default)]
    pub force: bool,
}

fn load_user_config(path: &Path) -> Result<UserConfig> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = PathBuf::from(&config.dest_path);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let user_config = load_user_config(&config_path)?;
    let output_dir = create_output_dir(&user_config)?;

    let mut etl = ParseOsmEtl::new(&user_config);
    if user_config.force {
        etl.clean(&output_dir)?;
    }
    etl.process(&output_dir)?;

    Ok(())
}

pub mod parse_osm;

use std::path::Path;

use log::{error, info};

use osm_mapdata::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Extract,
    Transform,
    Load,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
        }
    }
}

/// Logs a failed stage. Decoding failures also carry the byte offset in the
/// input document.
fn log_failure(etl_name: &str, stage: Stage, err: &Error) {
    let message = err.to_string();
    match err.position() {
        Some(position) => error!(
            etl_name = etl_name,
            stage = stage.as_str(),
            position = position,
            err = message.as_str();
            "Decoding failed"
        ),
        None => error!(
            etl_name = etl_name,
            stage = stage.as_str(),
            err = message.as_str();
            "Stage failed"
        ),
    }
}

/// One input file turned into one output artefact in `dir`. The output doubles
/// as a cache: `process` skips all stages while it exists.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        let name = self.etl_name().to_owned();
        let etl_name = name.as_str();
        info!(etl_name = etl_name; "Starting ETL process");
        if self.is_cached(dir)? {
            info!(etl_name = etl_name; "Using cached value");
            return Ok(());
        }

        info!(etl_name = etl_name, stage = Stage::Extract.as_str(); "Opening input");
        let input = self
            .extract(dir)
            .inspect_err(|err| log_failure(etl_name, Stage::Extract, err))?;

        info!(etl_name = etl_name, stage = Stage::Transform.as_str(); "Decoding document");
        let output = self
            .transform(input)
            .inspect_err(|err| log_failure(etl_name, Stage::Transform, err))?;

        info!(etl_name = etl_name, stage = Stage::Load.as_str(); "Writing summary");
        self.load(dir, output)
            .inspect_err(|err| log_failure(etl_name, Stage::Load, err))?;

        info!(etl_name = etl_name; "Process finished");
        Ok(())
    }
}

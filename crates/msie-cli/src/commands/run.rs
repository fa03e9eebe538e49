//! `msie run`: execute a script file.

use std::path::Path;

use msie_engine::MsieJsEngine;

pub fn execute(engine: &MsieJsEngine, file: &Path) -> anyhow::Result<()> {
    log::info!(target: "msie::cli", "running {}", file.display());
    engine.execute_file(file)?;
    Ok(())
}

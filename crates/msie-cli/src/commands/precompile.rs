//! `msie precompile` and `msie run-precompiled`
//!
//! The buffer file holds only the serialized bytes. Running it needs the
//! original source next to it and an engine of the mode that produced it.

use std::fs;
use std::path::Path;

use anyhow::Context;
use msie_engine::{MsieJsEngine, PrecompiledScript};

use crate::output::StyledOutput;

fn read_source(file: &Path) -> anyhow::Result<String> {
    fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

pub fn compile(engine: &MsieJsEngine, file: &Path, output: &Path, out: &mut StyledOutput) -> anyhow::Result<()> {
    let source = read_source(file)?;
    let script = engine.precompile_with_name(&source, &file.display().to_string())?;
    fs::write(output, script.buffer()).with_context(|| format!("writing {}", output.display()))?;
    out.success(&format!(
        "{} bytes for {} written to {}",
        script.buffer().len(),
        script.mode(),
        output.display()
    ));
    Ok(())
}

pub fn run(engine: &MsieJsEngine, file: &Path, buffer: &Path) -> anyhow::Result<()> {
    let source = read_source(file)?;
    let bytes = fs::read(buffer).with_context(|| format!("reading {}", buffer.display()))?;
    let script = PrecompiledScript::from_parts(engine.mode(), source, file.display().to_string(), bytes);
    engine.execute_precompiled(&script)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msie_engine::{HostValue, JsEngineMode};
    use termcolor::ColorChoice;

    #[test]
    fn test_buffer_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("lib.js");
        let buffer = dir.path().join("lib.bin");
        fs::write(&script, "var answer = 6 * 7;").unwrap();

        let engine = MsieJsEngine::with_mode(JsEngineMode::ChakraEdgeJsRt).unwrap();
        let mut out = StyledOutput::new(ColorChoice::Never);
        compile(&engine, &script, &buffer, &mut out).unwrap();
        assert!(!fs::read(&buffer).unwrap().is_empty());

        let other = MsieJsEngine::with_mode(JsEngineMode::ChakraEdgeJsRt).unwrap();
        run(&other, &script, &buffer).unwrap();
        assert_eq!(other.get_variable_value("answer").unwrap(), HostValue::Int(42));
    }

    #[test]
    fn test_modified_source_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("lib.js");
        let buffer = dir.path().join("lib.bin");
        fs::write(&script, "var answer = 42;").unwrap();

        let engine = MsieJsEngine::with_mode(JsEngineMode::ChakraIeJsRt).unwrap();
        let mut out = StyledOutput::new(ColorChoice::Never);
        compile(&engine, &script, &buffer, &mut out).unwrap();

        fs::write(&script, "var answer = 41;").unwrap();
        assert!(run(&engine, &script, &buffer).is_err());
    }
}

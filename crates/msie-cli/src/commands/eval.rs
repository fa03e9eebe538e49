//! `msie eval`: evaluate an inline expression.

use msie_engine::MsieJsEngine;

use crate::output::StyledOutput;

pub fn execute(engine: &MsieJsEngine, expression: &str, as_json: bool, out: &mut StyledOutput) -> anyhow::Result<()> {
    let value = engine.evaluate_with_name(expression, "eval")?;
    out.value(&value, as_json);
    Ok(())
}

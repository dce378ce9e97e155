//! Keyboard tools.

use anyhow::Result;
use serde_json::Value;

use crate::utils::str_arg;

use super::executor::ToolContext;

pub async fn execute_type_text(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let text = str_arg(args, "text")?;

    ctx.checkpoint()?;
    ctx.controller.type_text(text).await?;
    ctx.settle().await;

    Ok(format!("Typed: {:?}", text))
}

pub async fn execute_press_key(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let key = str_arg(args, "key")?.trim();
    if key.is_empty() {
        anyhow::bail!("key must not be empty");
    }

    ctx.checkpoint()?;
    ctx.controller.press_key(key).await?;
    ctx.settle().await;

    Ok(format!("Pressed key: {}", key))
}

/// Accepts `["ctrl", "c"]` or the shorthand `"ctrl+c"`.
pub(crate) fn hotkey_keys(args: &Value) -> Result<Vec<String>> {
    let keys: Vec<String> = match args.get("keys") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(combo)) => combo.split('+').map(|k| k.trim().to_string()).collect(),
        _ => anyhow::bail!("keys must be a list of key names"),
    };

    if keys.is_empty() || keys.iter().any(|k| k.is_empty()) {
        anyhow::bail!("keys must name at least one key and no empty keys");
    }
    Ok(keys)
}

pub async fn execute_hotkey(args: &Value, ctx: &ToolContext<'_>) -> Result<String> {
    let keys = hotkey_keys(args)?;

    ctx.checkpoint()?;
    ctx.controller.hotkey(&keys).await?;
    ctx.settle().await;

    Ok(format!("Pressed hotkey: {}", keys.join("+")))
}

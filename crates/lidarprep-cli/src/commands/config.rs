use crate::config_loader::load_config;
use crate::output::OutputWriter;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: String,
    value: String,
    source: String,
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(config_path)?;

    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry { key, value, source: format!("{:?}", source) })
        .collect();

    // Sort by key for consistent output
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        output.result(&entries)?;
    } else {
        output.section("Configuration Values");
        output.table(
            entries
                .into_iter()
                .map(|e| ConfigRow { key: e.key, value: e.value, source: e.source })
                .collect(),
        );

        output.section("Configuration Precedence");
        output.info("CLI arguments > Environment variables > Config file > Defaults");
    }

    Ok(())
}

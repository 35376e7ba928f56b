use serde_json::{json, Map, Value};
use tempo_core::config::{AppConfig, LoadOptions};

use crate::commands::{load_config, to_value, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let effective = match to_value(&config) {
        Ok(value) => value,
        Err(failure) => return CommandResult::from_failure("config", failure),
    };

    CommandResult::data(
        "config",
        json!({
            "precedence": "env > file > default",
            "effective": effective,
            "sources": sources(&LoadOptions::default()),
        }),
    )
}

fn sources(options: &LoadOptions) -> Map<String, Value> {
    AppConfig::sources(options)
        .into_iter()
        .map(|(key, source)| (key.to_string(), Value::String(source.to_string())))
        .collect()
}

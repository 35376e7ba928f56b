use clap::Args;
use serde_json::json;
use tempo_core::collaborators::ClientDirectory;
use tempo_core::domain::client::search_clients;

use crate::commands::backend::Backend;
use crate::commands::{load_config, runtime, to_value, CommandFailure, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct ClientsArgs {
    #[arg(long, help = "Case-insensitive match on name, company or email")]
    pub search: Option<String>,
}

pub fn run(args: &ClientsArgs) -> CommandResult {
    let config = match load_config("clients") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("clients") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let backend = Backend::open(&config).await?;
        let listed = backend.clients.list().await;
        backend.close().await;

        let clients = listed.map_err(|error| ("collaborator", error.to_string(), 9u8))?;
        let term = args.search.as_deref().unwrap_or_default();
        let matches = to_value(&search_clients(&clients, term))?;

        Ok::<_, CommandFailure>(json!({ "clients": matches }))
    });

    match result {
        Ok(data) => CommandResult::data("clients", data),
        Err(failure) => CommandResult::from_failure("clients", failure),
    }
}

use clap::Args;
use serde_json::json;
use tempo_core::collaborators::ServiceCatalog;
use tempo_core::cpq::{Catalog, ServiceFilter};

use crate::commands::backend::Backend;
use crate::commands::{load_config, runtime, to_value, CommandFailure, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct CatalogArgs {
    #[arg(long, help = "Only list services in this category (exact match)")]
    pub category: Option<String>,
    #[arg(long, help = "Case-insensitive match on name or description")]
    pub search: Option<String>,
}

pub fn run(args: &CatalogArgs) -> CommandResult {
    let config = match load_config("catalog") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("catalog") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let backend = Backend::open(&config).await?;
        let listed = backend.catalog.list().await;
        backend.close().await;

        let catalog =
            Catalog::new(listed.map_err(|error| ("collaborator", error.to_string(), 9u8))?);
        let filter = ServiceFilter { search: args.search.clone(), category: args.category.clone() };
        let services = to_value(&catalog.filter(&filter))?;

        Ok::<_, CommandFailure>(json!({
            "categories": catalog.categories(),
            "services": services,
        }))
    });

    match result {
        Ok(data) => CommandResult::data("catalog", data),
        Err(failure) => CommandResult::from_failure("catalog", failure),
    }
}

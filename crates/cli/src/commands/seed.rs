use crate::commands::{load_config, runtime, CommandFailure, CommandResult};
use tempo_core::config::StoreBackend;
use tempo_db::{connect_with_config, migrations, DemoDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };

    if config.store.backend == StoreBackend::Memory {
        return CommandResult::success(
            "seed",
            "memory backend always serves the demo dataset; nothing to load",
        );
    }

    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.store)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, CommandFailure> = if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn summary(seeded: SeedResult) -> String {
    format!(
        "demo dataset loaded: {} clients, {} services",
        seeded.clients_seeded, seeded.services_seeded
    )
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for: {}", failed_checks.join(", "))
    }
}

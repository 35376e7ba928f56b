use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock, PoisonError};

use rust_decimal::Decimal;
use serde_json::Value;
use tempo_cli::commands::catalog::{self, CatalogArgs};
use tempo_cli::commands::clients::{self, ClientsArgs};
use tempo_cli::commands::quote::{self, QuoteArgs};
use tempo_cli::commands::{config, migrate, seed};
use tempo_core::config::CONFIG_KEYS;

#[test]
fn config_reports_effective_values_and_env_sources() {
    with_env(&[("TEMPO_QUOTES_CURRENCY", "EUR"), ("TEMPO_LOG_LEVEL", "debug")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["data"]["effective"]["quotes"]["currency"], "EUR");
        assert_eq!(payload["data"]["effective"]["store"]["backend"], "memory");
        assert_eq!(payload["data"]["sources"]["quotes.currency"], "env (TEMPO_QUOTES_CURRENCY)");
        assert_eq!(payload["data"]["sources"]["logging.level"], "env (TEMPO_LOG_LEVEL)");
        assert_eq!(payload["data"]["sources"]["store.database_url"], "default");
    });
}

#[test]
fn invalid_config_is_a_config_validation_failure() {
    with_env(&[("TEMPO_QUOTES_CURRENCY", "dollars")], || {
        let result = catalog::run(&CatalogArgs::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "catalog");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_is_a_noop_for_the_memory_backend() {
    with_env(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_and_seed_populate_a_sqlite_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = sqlite_url(dir.path());

    with_env(&[("TEMPO_STORE_BACKEND", "sqlite"), ("TEMPO_DATABASE_URL", &url)], || {
        let migrated = migrate::run();
        assert_eq!(migrated.exit_code, 0, "migrate output: {}", migrated.output);

        let first = seed::run();
        assert_eq!(first.exit_code, 0, "seed output: {}", first.output);
        let second = seed::run();
        assert_eq!(second.exit_code, 0, "seed output: {}", second.output);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], "demo dataset loaded: 3 clients, 6 services");
        assert_eq!(first_payload["message"], second_payload["message"]);

        let listed = catalog::run(&CatalogArgs::default());
        let payload = parse_payload(&listed.output);
        assert_eq!(payload["data"]["services"].as_array().map(Vec::len), Some(6));
    });
}

#[test]
fn catalog_filters_by_category_and_search() {
    with_env(&[], || {
        let result = catalog::run(&CatalogArgs {
            category: Some("Marketing".to_string()),
            search: Some("social".to_string()),
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let services = payload["data"]["services"].as_array().expect("services array");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0]["name"], "Social Media Management");
        assert_eq!(payload["data"]["categories"].as_array().map(Vec::len), Some(5));
    });
}

#[test]
fn clients_search_matches_company() {
    with_env(&[], || {
        let result = clients::run(&ClientsArgs { search: Some("startup".to_string()) });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let clients = payload["data"]["clients"].as_array().expect("clients array");
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0]["name"], "Emily Rodriguez");
    });
}

#[test]
fn quote_builds_prices_and_sends_in_memory() {
    with_env(&[], || {
        let result = quote::run(&QuoteArgs {
            client: "1".to_string(),
            items: vec!["3=1".to_string(), "4=1".to_string()],
            discount: Some("10".to_string()),
            notes: Some("Kickoff in March".to_string()),
            send: true,
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 0, "quote output: {}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(data["step"], "generate_send");
        assert_eq!(data["quote"]["status"], "sent");
        assert_eq!(data["quote"]["client"]["email"], "sarah@techcorp.com");
        assert_eq!(decimal(&data["calculation"]["subtotal"]), Decimal::new(11_000, 0));
        assert_eq!(decimal(&data["calculation"]["total"]), Decimal::new(9_900, 0));
        assert!(data["message_id"].as_str().is_some_and(|id| id.starts_with("msg-")));
        assert!(data["document_url"]
            .as_str()
            .is_some_and(|url| url.starts_with("https://tempo.app/api/quotes/quote-")));

        let events = data["audit_events"].as_array().expect("audit events");
        assert!(events.iter().any(|event| event == "quote.sent"));
    });
}

#[test]
fn quote_price_override_applies_and_bad_input_is_ignored() {
    with_env(&[], || {
        let result = quote::run(&QuoteArgs {
            client: "2".to_string(),
            items: vec!["2=1".to_string()],
            prices: vec!["0=2000".to_string(), "5=100".to_string()],
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 0, "quote output: {}", result.output);

        let data = &parse_payload(&result.output)["data"];
        assert_eq!(data["quote"]["status"], "draft");
        assert_eq!(decimal(&data["calculation"]["total"]), Decimal::new(2_000, 0));
        assert_eq!(data["ignored_prices"], serde_json::json!([5]));
        assert!(data["message_id"].is_null());
    });
}

#[test]
fn quote_for_unknown_client_is_not_found() {
    with_env(&[], || {
        let result = quote::run(&QuoteArgs {
            client: "99".to_string(),
            items: vec!["1=1".to_string()],
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn quote_without_items_is_rejected_at_the_services_step() {
    with_env(&[], || {
        let result = quote::run(&QuoteArgs { client: "1".to_string(), ..QuoteArgs::default() });
        assert_eq!(result.exit_code, 8);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "quote_rejected");
    });
}

#[test]
fn quote_with_malformed_item_fails_before_touching_the_store() {
    with_env(&[], || {
        let result = quote::run(&QuoteArgs {
            client: "1".to_string(),
            items: vec!["three".to_string()],
            ..QuoteArgs::default()
        });
        assert_eq!(result.exit_code, 11);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn quote_download_writes_document_for_sqlite_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = sqlite_url(dir.path());
    let output_dir = dir.path().join("documents");
    let output_dir_value = output_dir.display().to_string();

    with_env(
        &[
            ("TEMPO_STORE_BACKEND", "sqlite"),
            ("TEMPO_DATABASE_URL", &url),
            ("TEMPO_DELIVERY_OUTPUT_DIR", &output_dir_value),
        ],
        || {
            assert_eq!(seed::run().exit_code, 0);

            let result = quote::run(&QuoteArgs {
                client: "3".to_string(),
                items: vec!["6=2".to_string()],
                download: true,
                ..QuoteArgs::default()
            });
            assert_eq!(result.exit_code, 0, "quote output: {}", result.output);

            let data = &parse_payload(&result.output)["data"];
            let quote_id = data["quote"]["id"].as_str().expect("quote id");
            let file = output_dir
                .join(format!("quote-{}.html", quote_id.trim_start_matches("quote-")));
            let html = std::fs::read_to_string(file).expect("document written");
            assert!(html.contains("Content Writing"));
        },
    );
}

fn sqlite_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("tempo.db").display())
}

fn decimal(value: &Value) -> Decimal {
    let raw = value.as_str().expect("money is serialized as a string");
    Decimal::from_str(raw).expect("decimal string")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

/// Runs `test_fn` with only `vars` set among the tempo variables, one test at a time.
fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(PoisonError::into_inner);

    let tracked: Vec<&str> = CONFIG_KEYS.iter().flat_map(|key| key.env.iter().copied()).collect();
    let saved: Vec<(&str, Option<String>)> =
        tracked.iter().map(|var| (*var, env::var(var).ok())).collect();

    tracked.iter().for_each(|var| env::remove_var(var));
    vars.iter().for_each(|(var, value)| env::set_var(var, value));

    test_fn();

    for (var, value) in saved {
        match value {
            Some(value) => env::set_var(var, value),
            None => env::remove_var(var),
        }
    }
}

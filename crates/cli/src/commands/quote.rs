use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;

use tempo_core::audit::{AuditContext, AuditSink, InMemoryAuditSink, TracingAuditSink};
use tempo_core::cpq::QuoteCalculation;
use tempo_core::domain::client::ClientId;
use tempo_core::domain::quote::Quote;
use tempo_core::domain::service::ServiceId;
use tempo_core::errors::ApplicationError;
use tempo_core::flows::{Collaborators, QuoteSession, WizardStep};
use tempo_core::{QuoteEngine, RecordingNotificationSender};

use crate::commands::backend::Backend;
use crate::commands::{application_failure, load_config, runtime, to_value, CommandResult};

#[derive(Debug, Clone, Default, Args)]
pub struct QuoteArgs {
    #[arg(long, help = "Id of the client the quote is for")]
    pub client: String,
    #[arg(long = "item", value_name = "SERVICE=QTY", help = "Service id and quantity, repeatable")]
    pub items: Vec<String>,
    #[arg(
        long = "price",
        value_name = "INDEX=PRICE",
        help = "Override the unit price of a line (zero-based), repeatable"
    )]
    pub prices: Vec<String>,
    #[arg(long, help = "Discount percent between 0 and 100")]
    pub discount: Option<String>,
    #[arg(long, help = "Notes printed on the quote")]
    pub notes: Option<String>,
    #[arg(long, help = "Send the quote to the client after it is generated")]
    pub send: bool,
    #[arg(long, help = "Email body; defaults to the standard greeting")]
    pub message: Option<String>,
    #[arg(long, help = "Write the rendered document into the delivery output directory")]
    pub download: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct QuotePlan {
    client: ClientId,
    items: Vec<(ServiceId, i32)>,
    prices: Vec<(usize, String)>,
    discount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct QuoteSummary {
    step: WizardStep,
    quote: Quote,
    calculation: QuoteCalculation,
    document_url: Option<String>,
    ignored_prices: Vec<usize>,
    message_id: Option<String>,
    audit_events: Vec<String>,
}

pub fn run(args: &QuoteArgs) -> CommandResult {
    let plan = match plan(args) {
        Ok(plan) => plan,
        Err(error) => {
            return CommandResult::failure("quote", "invalid_input", format!("{error:#}"), 11);
        }
    };
    let config = match load_config("quote") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("quote") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let backend = Backend::open(&config).await?;
        let audit = InMemoryAuditSink::default();
        let sender = RecordingNotificationSender::default();

        let collaborators = match backend.collaborators(Arc::new(sender)) {
            Ok(collaborators) => {
                let sinks: Vec<Arc<dyn AuditSink>> =
                    vec![Arc::new(audit.clone()), Arc::new(TracingAuditSink)];
                collaborators.with_audit(Arc::new(sinks))
            }
            Err(failure) => {
                backend.close().await;
                return Err(failure);
            }
        };
        let correlation_id = format!("cli-{}", std::process::id());
        let engine = QuoteEngine::with_settings(config.quote_settings());
        let built = build(engine, collaborators, &correlation_id, &plan, args).await;
        backend.close().await;

        let mut summary = built.map_err(|error| application_failure(error, &correlation_id))?;
        summary.audit_events = audit.event_types();
        to_value(&summary)
    });

    match result {
        Ok(data) => CommandResult::data("quote", data),
        Err(failure) => CommandResult::from_failure("quote", failure),
    }
}

/// Walks every wizard step in order, the same way an interactive user would.
async fn build(
    engine: QuoteEngine,
    collaborators: Collaborators,
    correlation_id: &str,
    plan: &QuotePlan,
    args: &QuoteArgs,
) -> Result<QuoteSummary, ApplicationError> {
    let audit = AuditContext::new(None, correlation_id, "cli");
    let mut session = QuoteSession::start(engine, collaborators, audit).await?;

    session.begin().await?;
    session.select_client(&plan.client)?;
    session.advance().await?;

    for (service_id, quantity) in &plan.items {
        session.set_quantity(service_id, *quantity)?;
    }
    session.advance().await?;

    let mut ignored_prices = Vec::new();
    for (index, raw) in &plan.prices {
        if !session.set_item_price(*index, raw)? {
            ignored_prices.push(*index);
        }
    }
    if let Some(discount) = plan.discount {
        session.set_discount(discount)?;
    }
    if let Some(notes) = &args.notes {
        session.set_notes(notes.clone())?;
    }
    session.advance().await?;

    if args.download {
        session.download_document().await?;
    }
    let message_id =
        if args.send { session.send(args.message.clone()).await?.message_id } else { None };

    Ok(QuoteSummary {
        step: session.step(),
        quote: session.quote().clone(),
        calculation: session.calculation(),
        document_url: session.prepared_document_url().map(str::to_owned),
        ignored_prices,
        message_id,
        audit_events: Vec::new(),
    })
}

fn plan(args: &QuoteArgs) -> anyhow::Result<QuotePlan> {
    let client = args.client.trim();
    if client.is_empty() {
        return Err(anyhow!("--client must name a client id"));
    }

    let items = args.items.iter().map(|raw| parse_item(raw)).collect::<anyhow::Result<_>>()?;
    let prices = args.prices.iter().map(|raw| parse_price(raw)).collect::<anyhow::Result<_>>()?;
    let discount = args
        .discount
        .as_deref()
        .map(|raw| {
            Decimal::from_str(raw.trim())
                .with_context(|| format!("discount `{raw}` is not a number"))
        })
        .transpose()?;

    Ok(QuotePlan { client: ClientId(client.to_string()), items, prices, discount })
}

fn split_pair<'a>(raw: &'a str, what: &str) -> anyhow::Result<(&'a str, &'a str)> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .ok_or_else(|| anyhow!("{what} `{raw}` must look like KEY=VALUE"))
}

fn parse_item(raw: &str) -> anyhow::Result<(ServiceId, i32)> {
    let (service_id, quantity) = split_pair(raw, "item")?;
    let quantity = quantity
        .parse::<i32>()
        .with_context(|| format!("item `{raw}` has a quantity that is not a whole number"))?;
    Ok((ServiceId(service_id.to_string()), quantity))
}

fn parse_price(raw: &str) -> anyhow::Result<(usize, String)> {
    let (index, price) = split_pair(raw, "price")?;
    let index = index
        .parse::<usize>()
        .with_context(|| format!("price `{raw}` has a line index that is not a whole number"))?;
    Ok((index, price.to_string()))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use tempo_core::domain::service::ServiceId;

    use super::{plan, QuoteArgs};

    #[test]
    fn plan_parses_items_prices_and_discount() {
        let args = QuoteArgs {
            client: " 1 ".to_string(),
            items: vec!["3=1".to_string(), " 5 = 2 ".to_string()],
            prices: vec!["0=7500".to_string()],
            discount: Some("12.5".to_string()),
            ..QuoteArgs::default()
        };

        let plan = plan(&args).expect("valid plan");
        assert_eq!(plan.client.0, "1");
        assert_eq!(plan.items, vec![(ServiceId("3".into()), 1), (ServiceId("5".into()), 2)]);
        assert_eq!(plan.prices, vec![(0, "7500".to_string())]);
        assert_eq!(plan.discount, Some(Decimal::new(125, 1)));
    }

    #[test]
    fn malformed_item_is_reported_with_its_text() {
        let args = QuoteArgs {
            client: "1".to_string(),
            items: vec!["3x1".to_string()],
            ..QuoteArgs::default()
        };

        let error = plan(&args).expect_err("missing separator");
        assert!(error.to_string().contains("`3x1`"));
    }

    #[test]
    fn fractional_quantity_is_rejected() {
        let args = QuoteArgs {
            client: "1".to_string(),
            items: vec!["3=1.5".to_string()],
            ..QuoteArgs::default()
        };

        let error = plan(&args).expect_err("fractional quantity");
        assert!(format!("{error:#}").contains("whole number"));
    }
}

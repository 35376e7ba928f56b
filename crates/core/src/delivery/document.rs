use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tera::{Context, Tera};
use tracing::info;

use crate::collaborators::{CollaboratorError, DocumentRenderer};
use crate::cpq::pricing::{calculate, round_money};
use crate::delivery::DeliveryError;
use crate::domain::quote::{Quote, QuoteId};

const TEMPLATE_NAME: &str = "quote.html";

const QUOTE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Quote {{ quote_id }}</title>
</head>
<body>
  <header>
    <h1>Professional Services Quote</h1>
    <p>Quote #{{ quote_id }}</p>
  </header>
  <section class="parties">
    <div class="bill-to">
      <h3>Bill To:</h3>
      {% if client %}
      <p><strong>{{ client.name }}</strong></p>
      <p>{{ client.company }}</p>
      <p>{{ client.email }}</p>
      {% if client.phone %}<p>{{ client.phone }}</p>{% endif %}
      {% endif %}
    </div>
    <div class="details">
      <h3>Quote Details:</h3>
      <p>From: {{ sender_name }}</p>
      <p>Date: {{ issued_on }}</p>
      <p>Valid Until: {{ valid_until }}</p>
      <p>Status: {{ status }}</p>
    </div>
  </section>
  <table class="services">
    <thead>
      <tr><th>Service</th><th>Qty</th><th>Price</th><th>Total</th></tr>
    </thead>
    <tbody>
      {% for line in lines %}
      <tr>
        <td>
          <p>{{ line.name }}</p>
          <p>{{ line.description }}</p>
          {% if line.notes %}<p class="line-notes">{{ line.notes }}</p>{% endif %}
        </td>
        <td>{{ line.quantity }}</td>
        <td>{{ currency }} {{ line.unit_price | money }}</td>
        <td>{{ currency }} {{ line.line_total | money }}</td>
      </tr>
      {% endfor %}
    </tbody>
  </table>
  <section class="totals">
    <p>Subtotal: {{ currency }} {{ subtotal | money }}</p>
    {% if has_discount %}
    <p>Discount ({{ discount_pct }}%): -{{ currency }} {{ discount_amount | money }}</p>
    {% endif %}
    <p><strong>Total: {{ currency }} {{ total | money }}</strong></p>
  </section>
  {% if notes %}
  <section class="notes">
    <h3>Additional Notes</h3>
    <p>{{ notes }}</p>
  </section>
  {% endif %}
</body>
</html>
"#;

/// Register custom Tera filters used by the quote template.
///
/// - `money`: two-decimal rendering of a decimal string or number, e.g. `amount | money`
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(raw) => Decimal::from_str(raw)
            .map_err(|error| tera::Error::msg(format!("money filter: `{raw}`: {error}")))?,
        tera::Value::Number(number) => number
            .as_i64()
            .map(Decimal::from)
            .or_else(|| number.as_f64().and_then(Decimal::from_f64_retain))
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    };
    Ok(tera::Value::String(format!("{:.2}", round_money(amount))))
}

#[derive(Serialize)]
struct DocumentLine<'a> {
    name: &'a str,
    description: &'a str,
    notes: Option<&'a str>,
    quantity: u32,
    unit_price: Decimal,
    line_total: Decimal,
}

/// Renders quotes as standalone HTML documents on local disk and hands out
/// the public URL they are served under.
#[derive(Clone, Debug)]
pub struct HtmlDocumentRenderer {
    tera: Tera,
    base_url: String,
    output_dir: PathBuf,
    sender_name: String,
    currency: String,
}

impl HtmlDocumentRenderer {
    pub fn new(
        base_url: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, DeliveryError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(TEMPLATE_NAME, QUOTE_TEMPLATE)?;

        Ok(Self {
            tera,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            output_dir: output_dir.into(),
            sender_name: "Your Team".to_owned(),
            currency: "USD".to_owned(),
        })
    }

    pub fn with_sender_name(mut self, sender_name: impl Into<String>) -> Self {
        self.sender_name = sender_name.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn document_url(&self, quote_id: &QuoteId) -> String {
        format!("{}/api/quotes/{}/pdf", self.base_url, quote_id)
    }

    pub fn document_path(&self, quote_id: &QuoteId) -> PathBuf {
        self.output_dir.join(format!("quote-{}.html", quote_id.0.trim_start_matches("quote-")))
    }

    pub fn render_html(&self, quote: &Quote) -> Result<String, DeliveryError> {
        let calculation = calculate(quote);
        let lines = quote
            .items
            .iter()
            .map(|item| DocumentLine {
                name: &item.service.name,
                description: &item.service.description,
                notes: item.notes.as_deref(),
                quantity: item.quantity,
                unit_price: item.effective_price(),
                line_total: item.line_total(),
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("quote_id", &quote.id.0);
        context.insert("client", &quote.client);
        context.insert("sender_name", &self.sender_name);
        context.insert("issued_on", &Utc::now().format("%-m/%-d/%Y").to_string());
        context.insert("valid_until", &quote.valid_until.format("%-m/%-d/%Y").to_string());
        context.insert("status", quote.status.as_str());
        context.insert("lines", &lines);
        context.insert("currency", &self.currency);
        context.insert("subtotal", &calculation.subtotal);
        context.insert("has_discount", &(quote.discount_pct > Decimal::ZERO));
        context.insert("discount_pct", &quote.discount_pct.normalize().to_string());
        context.insert("discount_amount", &calculation.discount_amount);
        context.insert("total", &calculation.total);
        context.insert("notes", &quote.notes);

        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    async fn write_document(&self, quote: &Quote) -> Result<PathBuf, DeliveryError> {
        let html = self.render_html(quote)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.document_path(&quote.id);
        tokio::fs::write(&path, html).await?;
        Ok(path)
    }
}

#[async_trait]
impl DocumentRenderer for HtmlDocumentRenderer {
    async fn render(&self, quote: &Quote) -> Result<String, CollaboratorError> {
        self.render_html(quote)?;
        let url = self.document_url(&quote.id);
        info!(
            event_name = "delivery.document_rendered",
            quote_id = %quote.id,
            url = %url,
            "quote document rendered"
        );
        Ok(url)
    }

    async fn download(&self, quote: &Quote) -> Result<(), CollaboratorError> {
        let path = self.write_document(quote).await?;
        info!(
            event_name = "delivery.document_written",
            quote_id = %quote.id,
            path = %path.display(),
            "quote document written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::collaborators::DocumentRenderer;
    use crate::domain::client::{Client, ClientId};
    use crate::domain::quote::{Quote, QuoteId};
    use crate::domain::service::{ServiceId, ServiceOffering};
    use crate::engine::QuoteEngine;

    use super::HtmlDocumentRenderer;

    fn service(id: &str, name: &str, price: i64) -> ServiceOffering {
        ServiceOffering {
            id: ServiceId(id.to_owned()),
            name: name.to_owned(),
            description: format!("{name} description"),
            base_price: Decimal::new(price, 0),
            category: "Design".to_owned(),
            active: true,
        }
    }

    fn priced_quote() -> Quote {
        let engine = QuoteEngine::default();
        let mut quote = engine.create_quote();
        engine
            .set_client(
                &mut quote,
                Client {
                    id: ClientId("1".to_owned()),
                    name: "Sarah Johnson".to_owned(),
                    email: "sarah@techcorp.com".to_owned(),
                    company: "TechCorp Solutions".to_owned(),
                    phone: Some("+1 (555) 123-4567".to_owned()),
                    created_at: None,
                    updated_at: None,
                },
            )
            .expect("client");
        engine
            .upsert_line_item(&mut quote, &service("1", "Brand Strategy Consultation", 5000), 1)
            .expect("line 1");
        engine
            .upsert_line_item(&mut quote, &service("2", "Logo Design Package", 2500), 2)
            .expect("line 2");
        engine.set_discount(&mut quote, Decimal::new(10, 0)).expect("discount");
        engine.set_notes(&mut quote, "Kickoff <b>next</b> week").expect("notes");
        quote
    }

    #[test]
    fn urls_follow_the_public_document_route() {
        let renderer =
            HtmlDocumentRenderer::new("https://tempo.app/", "/tmp/unused").expect("renderer");
        let id = QuoteId("quote-abc".to_owned());

        assert_eq!(renderer.document_url(&id), "https://tempo.app/api/quotes/quote-abc/pdf");
        assert!(renderer.document_path(&id).ends_with("quote-abc.html"));
    }

    #[test]
    fn rendered_html_lists_lines_totals_and_escapes_notes() {
        let renderer = HtmlDocumentRenderer::new("https://tempo.app", "/tmp/unused")
            .expect("renderer")
            .with_sender_name("Tempo Studio");
        let html = renderer.render_html(&priced_quote()).expect("render");

        assert!(html.contains("Sarah Johnson"));
        assert!(html.contains("From: Tempo Studio"));
        assert!(html.contains("USD 5000.00"));
        assert!(html.contains("Discount (10%): -USD 1000.00"));
        assert!(html.contains("Total: USD 9000.00"));
        assert!(html.contains("Kickoff &lt;b&gt;next"));
        assert!(!html.contains("<b>next</b>"));
    }

    #[test]
    fn discount_row_is_omitted_without_discount() {
        let renderer = HtmlDocumentRenderer::new("https://tempo.app", "/tmp/unused")
            .expect("renderer");
        let mut quote = priced_quote();
        quote.discount_pct = Decimal::ZERO;

        let html = renderer.render_html(&quote).expect("render");
        assert!(!html.contains("Discount ("));
    }

    #[tokio::test]
    async fn download_writes_document_into_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let renderer = HtmlDocumentRenderer::new("https://tempo.app", dir.path().join("docs"))
            .expect("renderer");
        let quote = priced_quote();

        let url = renderer.render(&quote).await.expect("render");
        assert!(url.ends_with(&format!("/api/quotes/{}/pdf", quote.id)));

        renderer.download(&quote).await.expect("download");
        let written =
            std::fs::read_to_string(renderer.document_path(&quote.id)).expect("document exists");
        assert!(written.contains("Professional Services Quote"));
    }
}

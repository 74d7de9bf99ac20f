use std::fmt::Write as _;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::money::two_dp;
use crate::entities::{medicine, sale, sale_item};
use crate::errors::ServiceError;

const COMPANY_NAME: &str = "Pharmacy Management System";

/// A rendered invoice ready to be served as HTML
#[derive(Debug)]
pub struct Invoice {
    pub filename: String,
    pub html: String,
}

/// How the caller wants the invoice delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvoiceFormat {
    /// Inline in the browser
    #[default]
    Preview,
    /// As a file attachment
    Download,
}

impl InvoiceFormat {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value {
            "preview" => Ok(Self::Preview),
            "download" => Ok(Self::Download),
            other => Err(ServiceError::ValidationError(format!(
                "unknown invoice format '{}', expected 'preview' or 'download'",
                other
            ))),
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Service that renders sale invoices as HTML
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Render the invoice for one sale. Line items are joined with the
    /// medicine catalog for display names; items whose medicine was deleted
    /// fall back to a placeholder.
    #[instrument(skip(self))]
    pub async fn render(&self, sale_id: i32) -> Result<Invoice, ServiceError> {
        let sale = sale::Entity::find_by_id(sale_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;

        let lines = sale_item::Entity::find()
            .find_also_related(medicine::Entity)
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .all(&*self.db_pool)
            .await?;

        let filename = format!("invoice_{}_{}.html", sale.id, sale.date.format("%Y%m%d"));
        let html = render_html(&sale, &lines);
        Ok(Invoice { filename, html })
    }
}

fn render_html(sale: &sale::Model, lines: &[(sale_item::Model, Option<medicine::Model>)]) -> String {
    let mut rows = String::new();
    for (item, med) in lines {
        let name = med
            .as_ref()
            .map(|m| escape_html(&m.name))
            .unwrap_or_else(|| format!("Medicine #{}", item.medicine_id));
        let subtotal: Decimal = item.price * Decimal::from(item.quantity);
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            name,
            item.quantity,
            two_dp(item.price),
            two_dp(subtotal)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Invoice #{id}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; color: #222; }}
h1 {{ margin-bottom: 0; }}
.meta {{ color: #666; margin-bottom: 1.5em; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border: 1px solid #ccc; padding: 0.4em 0.8em; text-align: left; }}
th {{ background: #f4f4f4; }}
.totals {{ margin-top: 1.5em; width: auto; margin-left: auto; }}
.totals td {{ border: none; padding: 0.2em 0.8em; }}
.totals .final {{ font-weight: bold; border-top: 1px solid #222; }}
</style>
</head>
<body>
<h1>{company}</h1>
<p class="meta">
Invoice #{id}<br>
Date: {date}<br>
Customer: {customer}<br>
Payment method: {method}
</p>
<table>
<thead><tr><th>Item</th><th>Quantity</th><th>Unit price</th><th>Subtotal</th></tr></thead>
<tbody>{rows}</tbody>
</table>
<table class="totals">
<tr><td>Total</td><td>{total}</td></tr>
<tr><td>Discount</td><td>{discount}</td></tr>
<tr class="final"><td>Amount due</td><td>{final_amount}</td></tr>
</table>
</body>
</html>
"#,
        company = COMPANY_NAME,
        id = sale.id,
        date = sale.date.format("%Y-%m-%d %H:%M UTC"),
        customer = escape_html(&sale.customer_name),
        method = sale.payment_method,
        rows = rows,
        total = two_dp(sale.total_amount),
        discount = two_dp(sale.discount),
        final_amount = two_dp(sale.final_amount()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sale::PaymentMethod;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample_sale() -> sale::Model {
        sale::Model {
            id: 7,
            customer_name: "Jane <Doe>".to_string(),
            total_amount: dec!(45.50),
            discount: dec!(5.00),
            payment_method: PaymentMethod::Cash,
            date: Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn filename_embeds_sale_id_and_date() {
        let sale = sample_sale();
        let filename = format!("invoice_{}_{}.html", sale.id, sale.date.format("%Y%m%d"));
        assert_eq!(filename, "invoice_7_20240315.html");
    }

    #[test]
    fn rendered_html_escapes_names_and_shows_totals() {
        let sale = sample_sale();
        let html = render_html(&sale, &[]);
        assert!(html.contains("Jane &lt;Doe&gt;"));
        assert!(!html.contains("Jane <Doe>"));
        assert!(html.contains("45.50"));
        assert!(html.contains("40.50"));
    }

    #[test]
    fn totals_keep_two_decimals_when_stored_scale_collapsed() {
        // SQLite hands back 12.5 / 38 where 12.50 / 38.00 were stored
        let sale = sale::Model {
            id: 3,
            customer_name: "Walk-in".to_string(),
            total_amount: dec!(38),
            discount: dec!(0),
            payment_method: PaymentMethod::Card,
            date: Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap(),
        };
        let item = sale_item::Model {
            id: 1,
            sale_id: 3,
            medicine_id: 9,
            quantity: 2,
            price: dec!(12.5),
        };
        let html = render_html(&sale, &[(item, None)]);
        assert!(html.contains("12.50"));
        assert!(html.contains("25.00"));
        assert!(html.contains("38.00"));
    }

    #[test]
    fn invoice_format_parses_known_values() {
        assert_eq!(
            InvoiceFormat::parse("preview").unwrap(),
            InvoiceFormat::Preview
        );
        assert_eq!(
            InvoiceFormat::parse("download").unwrap(),
            InvoiceFormat::Download
        );
        assert!(InvoiceFormat::parse("pdf").is_err());
    }
}

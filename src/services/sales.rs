use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::sale::{self, PaymentMethod};
use crate::entities::{medicine, sale_item};
use crate::errors::ServiceError;
use crate::services::activity::day_bounds;
use crate::services::inventory::{decrement_stock_on, StockLevel};

/// One requested sale line
#[derive(Debug, Clone)]
pub struct CreateSaleItem {
    pub medicine_id: i32,
    pub quantity: i32,
    /// When absent, the catalog price at sale time is captured
    pub unit_price: Option<Decimal>,
}

/// Input for creating a sale
#[derive(Debug, Clone)]
pub struct CreateSale {
    pub customer_name: String,
    pub discount: Option<Decimal>,
    pub payment_method: PaymentMethod,
    /// When absent, computed as the sum of line subtotals
    pub total_amount: Option<Decimal>,
    pub items: Vec<CreateSaleItem>,
}

/// Partial update for a sale; the date and line items are immutable.
#[derive(Debug, Default, Clone)]
pub struct UpdateSale {
    pub customer_name: Option<String>,
    pub discount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
}

/// A sale together with its line items
#[derive(Debug, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: sale::Model,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub final_amount: Decimal,
    pub items: Vec<sale_item::Model>,
}

impl SaleWithItems {
    fn new(sale: sale::Model, items: Vec<sale_item::Model>) -> Self {
        let final_amount = sale.final_amount();
        Self {
            sale,
            final_amount,
            items,
        }
    }
}

/// Result of creating a sale; breaches are stock levels that crossed their
/// reorder threshold and still need alerting (after commit).
#[derive(Debug)]
pub struct CreateSaleOutcome {
    pub sale: SaleWithItems,
    pub breaches: Vec<StockLevel>,
}

/// Per-payment-method totals
#[derive(Debug, Default, Clone, Serialize)]
pub struct MethodBreakdown {
    pub count: u64,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub amount: Decimal,
}

/// Totals for one calendar day
#[derive(Debug, Serialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub total_sales: u64,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total_discount: Decimal,
    pub payment_methods: BTreeMap<String, MethodBreakdown>,
}

/// Totals for one calendar month with a per-day breakdown
#[derive(Debug, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub total_sales: u64,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total_discount: Decimal,
    pub daily_breakdown: BTreeMap<String, MethodBreakdown>,
}

/// Service for the sale ledger
#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Create a sale: validate every line, capture unit prices, insert the
    /// sale and its items, and decrement stock per line, all in one
    /// transaction. Any failure (missing medicine, insufficient stock)
    /// rolls the whole sale back.
    #[instrument(skip(self))]
    pub async fn create_sale(&self, input: CreateSale) -> Result<CreateSaleOutcome, ServiceError> {
        if input.customer_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "customer name is required".to_string(),
            ));
        }
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "a sale needs at least one item".to_string(),
            ));
        }
        if input.items.iter().any(|line| line.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "item quantities must be positive".to_string(),
            ));
        }
        if input
            .items
            .iter()
            .any(|line| matches!(line.unit_price, Some(p) if p < Decimal::ZERO))
        {
            return Err(ServiceError::ValidationError(
                "item unit prices cannot be negative".to_string(),
            ));
        }
        let discount = input.discount.unwrap_or(Decimal::ZERO);
        if discount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "discount cannot be negative".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;

        // Capture unit prices (caller override or catalog) and compute the
        // running total
        let mut priced_lines: Vec<(CreateSaleItem, Decimal)> = Vec::with_capacity(input.items.len());
        let mut computed_total = Decimal::ZERO;
        for line in input.items {
            let med = medicine::Entity::find_by_id(line.medicine_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Medicine {} not found", line.medicine_id))
                })?;
            let unit_price = line.unit_price.unwrap_or(med.price);
            computed_total += unit_price * Decimal::from(line.quantity);
            priced_lines.push((line, unit_price));
        }

        let total_amount = input.total_amount.unwrap_or(computed_total);
        if discount > total_amount {
            return Err(ServiceError::ValidationError(
                "discount cannot exceed the total amount".to_string(),
            ));
        }

        let created = sale::ActiveModel {
            customer_name: Set(input.customer_name),
            total_amount: Set(total_amount),
            discount: Set(discount),
            payment_method: Set(input.payment_method),
            date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(priced_lines.len());
        let mut breaches = Vec::new();
        for (line, unit_price) in priced_lines {
            let item = sale_item::ActiveModel {
                sale_id: Set(created.id),
                medicine_id: Set(line.medicine_id),
                quantity: Set(line.quantity),
                price: Set(unit_price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            let level = decrement_stock_on(&txn, line.medicine_id, line.quantity).await?;
            if level.is_breach() {
                breaches.push(level);
            }
            items.push(item);
        }

        txn.commit().await?;

        Ok(CreateSaleOutcome {
            sale: SaleWithItems::new(created, items),
            breaches,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_sale(&self, id: i32) -> Result<SaleWithItems, ServiceError> {
        let found = sale::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;
        let items = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .all(&*self.db_pool)
            .await?;
        Ok(SaleWithItems::new(found, items))
    }

    /// All sales, newest first, with their items
    #[instrument(skip(self))]
    pub async fn list_sales(&self) -> Result<Vec<SaleWithItems>, ServiceError> {
        let rows = sale::Entity::find()
            .find_with_related(sale_item::Entity)
            .order_by_desc(sale::Column::Date)
            .all(&*self.db_pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(s, items)| SaleWithItems::new(s, items))
            .collect())
    }

    /// Update the mutable fields of a sale
    #[instrument(skip(self))]
    pub async fn update_sale(
        &self,
        id: i32,
        update: UpdateSale,
    ) -> Result<SaleWithItems, ServiceError> {
        let found = sale::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", id)))?;

        if let Some(discount) = update.discount {
            if discount < Decimal::ZERO || discount > found.total_amount {
                return Err(ServiceError::ValidationError(
                    "discount must be between zero and the total amount".to_string(),
                ));
            }
        }

        let mut active: sale::ActiveModel = found.into();
        if let Some(customer_name) = update.customer_name {
            active.customer_name = Set(customer_name);
        }
        if let Some(discount) = update.discount {
            active.discount = Set(discount);
        }
        if let Some(payment_method) = update.payment_method {
            active.payment_method = Set(payment_method);
        }
        let updated = active.update(&*self.db_pool).await?;

        let items = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(id))
            .all(&*self.db_pool)
            .await?;
        Ok(SaleWithItems::new(updated, items))
    }

    /// Delete a sale and (via cascade) its items. Stock is not restored.
    #[instrument(skip(self))]
    pub async fn delete_sale(&self, id: i32) -> Result<(), ServiceError> {
        let result = sale::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Sale {} not found", id)));
        }
        Ok(())
    }

    /// Totals for one day. Amounts are sums of final amounts
    /// (total - discount), computed with decimal arithmetic.
    #[instrument(skip(self))]
    pub async fn daily_report(&self, date: Option<NaiveDate>) -> Result<DailyReport, ServiceError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let (start, end) = day_bounds(date);

        let sales = sale::Entity::find()
            .filter(sale::Column::Date.gte(start))
            .filter(sale::Column::Date.lt(end))
            .all(&*self.db_pool)
            .await?;

        let mut total_amount = Decimal::ZERO;
        let mut total_discount = Decimal::ZERO;
        let mut payment_methods: BTreeMap<String, MethodBreakdown> = BTreeMap::new();
        for s in &sales {
            let final_amount = s.final_amount();
            total_amount += final_amount;
            total_discount += s.discount;
            let entry = payment_methods
                .entry(s.payment_method.to_string())
                .or_default();
            entry.count += 1;
            entry.amount += final_amount;
        }

        Ok(DailyReport {
            date,
            total_sales: sales.len() as u64,
            total_amount,
            total_discount,
            payment_methods,
        })
    }

    /// Totals for one month with a per-day breakdown
    #[instrument(skip(self))]
    pub async fn monthly_report(
        &self,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<MonthlyReport, ServiceError> {
        let today = Utc::now().date_naive();
        let year = year.unwrap_or_else(|| today.year());
        let month = month.unwrap_or_else(|| today.month());

        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ServiceError::ValidationError(format!("{}-{} is not a valid month", year, month))
        })?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| ServiceError::InternalError("month arithmetic overflow".to_string()))?;

        let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).ok_or_else(|| {
            ServiceError::InternalError("invalid day start".to_string())
        })?);
        let end = Utc.from_utc_datetime(&next_first.and_hms_opt(0, 0, 0).ok_or_else(|| {
            ServiceError::InternalError("invalid day start".to_string())
        })?);

        let sales = sale::Entity::find()
            .filter(sale::Column::Date.gte(start))
            .filter(sale::Column::Date.lt(end))
            .all(&*self.db_pool)
            .await?;

        let mut total_amount = Decimal::ZERO;
        let mut total_discount = Decimal::ZERO;
        let mut daily_breakdown: BTreeMap<String, MethodBreakdown> = BTreeMap::new();
        for s in &sales {
            let final_amount = s.final_amount();
            total_amount += final_amount;
            total_discount += s.discount;
            let entry = daily_breakdown
                .entry(s.date.date_naive().to_string())
                .or_default();
            entry.count += 1;
            entry.amount += final_amount;
        }

        Ok(MonthlyReport {
            year,
            month,
            total_sales: sales.len() as u64,
            total_amount,
            total_discount,
            daily_breakdown,
        })
    }
}

use rust_decimal::Decimal;
use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub customer_name: String,
    #[serde(serialize_with = "super::money::serialize")]
    pub total_amount: Decimal,
    #[serde(serialize_with = "super::money::serialize")]
    pub discount: Decimal,
    pub payment_method: PaymentMethod,
    /// Immutable after creation
    pub date: DateTimeUtc,
}

impl Model {
    pub fn final_amount(&self) -> Decimal {
        self.total_amount - self.discount
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItems,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Accepted payment methods
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "insurance")]
    Insurance,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "mobile_wallet")]
    MobileWallet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn final_amount_is_decimal_exact() {
        let sale = Model {
            id: 1,
            customer_name: "Walk-in".into(),
            total_amount: dec!(45.50),
            discount: dec!(5.00),
            payment_method: PaymentMethod::Cash,
            date: Utc::now(),
        };
        assert_eq!(sale.final_amount(), dec!(40.50));
    }

    #[test]
    fn money_fields_serialize_with_two_decimal_places() {
        let sale = Model {
            id: 1,
            customer_name: "Walk-in".into(),
            // Scale as it comes back from storage with trailing zeros gone
            total_amount: dec!(40.5),
            discount: dec!(0),
            payment_method: PaymentMethod::Cash,
            date: Utc::now(),
        };
        let json = serde_json::to_value(&sale).unwrap();
        assert_eq!(json["total_amount"], "40.50");
        assert_eq!(json["discount"], "0.00");
    }

    #[test]
    fn payment_method_serializes_snake_case() {
        assert_eq!(PaymentMethod::MobileWallet.to_string(), "mobile_wallet");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::MobileWallet).unwrap(),
            "\"mobile_wallet\""
        );
    }
}

use sea_orm::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub medicine_id: i32,
    pub current_stock: i32,
    pub reorder_level: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Boundary is inclusive: stock equal to the reorder level counts as low.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.reorder_level
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::medicine::Entity",
        from = "Column::MedicineId",
        to = "super::medicine::Column::Id"
    )]
    Medicine,
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(current_stock: i32, reorder_level: i32) -> Model {
        Model {
            id: 1,
            medicine_id: 1,
            current_stock,
            reorder_level,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        assert!(item(10, 10).is_low_stock());
        assert!(item(0, 10).is_low_stock());
        assert!(!item(11, 10).is_low_stock());
    }
}

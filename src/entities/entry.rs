//! Entry entity - A single expense logged against a trip.
//!
//! `converted_cost` is written once from `cost * exchange_rate` and is a
//! historical snapshot: later rate changes never touch stored rows.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    /// Unique identifier (UUID v4 text)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// ID of the trip this entry belongs to
    pub trip_id: String,
    /// Day the expense happened
    pub date: Date,
    /// Free-text location
    pub location: String,
    /// Free-text description
    pub description: String,
    /// Spending category (e.g. `"Food"`)
    pub category: String,
    /// Cost in `currency`
    pub cost: f64,
    /// Currency code of `cost`
    pub currency: String,
    /// Rate from `currency` to `home_currency` when the entry was recorded
    pub exchange_rate: f64,
    /// `cost * exchange_rate`, frozen at creation
    pub converted_cost: f64,
    /// Currency code of `converted_cost`
    pub home_currency: String,
    /// `"cash"` or `"credit"`
    pub payment_method: String,
    /// Identifier of whoever paid
    pub paid_by: String,
    /// When the entry was created
    pub created_at: DateTimeUtc,
    /// When the entry was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Entry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one trip
    #[sea_orm(
        belongs_to = "super::trip::Entity",
        from = "Column::TripId",
        to = "super::trip::Column::Id"
    )]
    Trip,
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trip.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

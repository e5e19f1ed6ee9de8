use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Product joined with its category. `serials` is the raw blob.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i32,
    pub header: String,
    pub subheadline: String,
    pub body: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub category_id: i32,
    pub category_name: String,
    pub category_description: Option<String>,
    pub serials: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct NewCategory<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
}

pub struct NewProduct {
    pub header: String,
    pub subheadline: String,
    pub body: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub category_id: i32,
    pub serials: String,
}

/// Partial product update; `None` leaves the column as is.
#[derive(Debug, Default)]
pub struct ProductChanges {
    pub header: Option<String>,
    pub subheadline: Option<String>,
    pub body: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category_id: Option<i32>,
    pub serials: Option<String>,
}

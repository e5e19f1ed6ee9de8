use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    catalog::{repo_types::ProductRow, serials},
    pagination::Pagination,
    validation::{trimmed, trimmed_opt},
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CategoryRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 2, max = 50, message = "Category name must be 2-50 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Serials may arrive as one newline-delimited string or as an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SerialsInput {
    Text(String),
    List(Vec<String>),
}

impl SerialsInput {
    pub fn items(&self) -> Vec<String> {
        match self {
            SerialsInput::Text(s) => serials::split(&[s]),
            SerialsInput::List(items) => serials::split(items),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProductCreate {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 200, message = "Header must be 3-200 characters"))]
    pub header: String,
    #[validate(length(max = 255, message = "Subheadline must be at most 255 characters"))]
    pub subheadline: Option<String>,
    #[validate(length(max = 5000, message = "Body must be at most 5000 characters"))]
    pub body: Option<String>,
    #[validate(range(
        min = 0.01,
        max = 99999999.99,
        message = "Price must be between 0.01 and 99999999.99"
    ))]
    pub price: f64,
    #[validate(
        url(message = "Image URL must be a valid URL"),
        length(max = 255, message = "Image URL must be at most 255 characters")
    )]
    pub image_url: Option<String>,
    #[validate(range(min = 1, message = "Category id must be a positive integer"))]
    pub category_id: Option<i32>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 2, max = 50, message = "Category name must be 2-50 characters"))]
    pub category: Option<String>,
    pub serials: Option<SerialsInput>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, max = 200, message = "Header must be 3-200 characters"))]
    pub header: Option<String>,
    #[validate(length(max = 255, message = "Subheadline must be at most 255 characters"))]
    pub subheadline: Option<String>,
    #[validate(length(max = 5000, message = "Body must be at most 5000 characters"))]
    pub body: Option<String>,
    #[validate(range(
        min = 0.01,
        max = 99999999.99,
        message = "Price must be between 0.01 and 99999999.99"
    ))]
    pub price: Option<f64>,
    #[validate(
        url(message = "Image URL must be a valid URL"),
        length(max = 255, message = "Image URL must be at most 255 characters")
    )]
    pub image_url: Option<String>,
    #[validate(range(min = 1, message = "Category id must be a positive integer"))]
    pub category_id: Option<i32>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 2, max = 50, message = "Category name must be 2-50 characters"))]
    pub category: Option<String>,
    pub serials: Option<SerialsInput>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.header.is_none()
            && self.subheadline.is_none()
            && self.body.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.category_id.is_none()
            && self.category.is_none()
            && self.serials.is_none()
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SerialsRequest {
    pub serials: SerialsInput,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i64>,
}

/// Product as returned by the API. `serials` is only filled for admin write responses.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub header: String,
    pub subheadline: String,
    pub body: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub category_id: i32,
    pub category_name: String,
    pub category_description: Option<String>,
    pub stock_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serials: Option<Vec<String>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ProductView {
    pub fn public(row: &ProductRow) -> Self {
        Self {
            id: row.id,
            header: row.header.clone(),
            subheadline: row.subheadline.clone(),
            body: row.body.clone(),
            price: row.price,
            image_url: row.image_url.clone(),
            category_id: row.category_id,
            category_name: row.category_name.clone(),
            category_description: row.category_description.clone(),
            stock_count: serials::count(&row.serials),
            serials: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn with_serials(row: &ProductRow) -> Self {
        Self {
            serials: Some(serials::list(&row.serials).into_iter().map(String::from).collect()),
            ..Self::public(row)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse<T> {
    pub category: T,
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub product_id: i32,
    pub product_name: String,
    pub stock_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SerialsResponse {
    pub product_id: i32,
    pub product_name: String,
    pub serials: Vec<String>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl SerialsResponse {
    pub fn new(row: &ProductRow, message: Option<&'static str>) -> Self {
        let serials: Vec<String> = serials::list(&row.serials)
            .into_iter()
            .map(String::from)
            .collect();
        Self {
            product_id: row.id,
            product_name: row.header.clone(),
            count: serials.len(),
            serials,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LowStockResponse {
    pub products: Vec<ProductView>,
    pub count: usize,
    pub threshold: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_accept_string_or_array() {
        let r: SerialsRequest = serde_json::from_str(r#"{"serials":"A1\n\nB2"}"#).unwrap();
        assert_eq!(r.serials.items(), vec!["A1", "B2"]);
        let r: SerialsRequest = serde_json::from_str(r#"{"serials":["A1","B2\nC3"]}"#).unwrap();
        assert_eq!(r.serials.items(), vec!["A1", "B2", "C3"]);
        assert!(serde_json::from_str::<SerialsRequest>(r#"{"serials":42}"#).is_err());
        assert!(serde_json::from_str::<SerialsRequest>(r#"{"serials":"A","x":1}"#).is_err());
    }

    #[test]
    fn product_create_rules() {
        let ok: ProductCreate = serde_json::from_str(
            r#"{"header":"Game key","price":9.99,"category_id":1,"image_url":"https://cdn.example.com/a.png"}"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad: ProductCreate =
            serde_json::from_str(r#"{"header":"ab","price":0,"category_id":0,"image_url":"nope"}"#)
                .unwrap();
        let fields: Vec<String> = crate::validation::field_errors(&bad.validate().unwrap_err())
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["category_id", "header", "image_url", "price"]);

        assert!(serde_json::from_str::<ProductCreate>(
            r#"{"header":"Game key","price":1,"category_id":1,"stock":3}"#
        )
        .is_err());
    }

    #[test]
    fn price_fits_the_stored_precision() {
        let at_max: ProductCreate = serde_json::from_str(
            r#"{"header":"Game key","price":99999999.99,"category_id":1}"#,
        )
        .unwrap();
        assert!(at_max.validate().is_ok());

        let too_big: ProductCreate = serde_json::from_str(
            r#"{"header":"Game key","price":100000000,"category_id":1}"#,
        )
        .unwrap();
        let errs = crate::validation::field_errors(&too_big.validate().unwrap_err());
        assert_eq!(errs[0].field, "price");

        let update: ProductUpdate = serde_json::from_str(r#"{"price":1e12}"#).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn padded_names_are_trimmed_before_validation() {
        let short: ProductCreate =
            serde_json::from_str(r#"{"header":"   x   ","price":1,"category":"  G  "}"#).unwrap();
        assert_eq!(short.header, "x");
        assert_eq!(short.category.as_deref(), Some("G"));
        let fields: Vec<String> = crate::validation::field_errors(&short.validate().unwrap_err())
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["category", "header"]);
    }

    #[test]
    fn empty_update_is_detected() {
        let u: ProductUpdate = serde_json::from_str("{}").unwrap();
        assert!(u.is_empty());
        let u: ProductUpdate = serde_json::from_str(r#"{"price":2.5}"#).unwrap();
        assert!(!u.is_empty());
    }
}

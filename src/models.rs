use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents a catalog product in the database
///
/// `specifications` is an open key/value blob (materials, dimensions,
/// warranty text, whatever the admin supplies); it is stored and served
/// as-is, never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Ceramic Coffee Mug")]
    pub name: String,
    #[schema(example = "kitchen")]
    pub category: String,
    #[schema(example = "Hand-glazed 350ml mug")]
    pub description: String,
    #[schema(value_type = f64, example = 499.0)]
    pub price: Decimal,
    #[schema(example = "https://cdn.example.com/mug.jpg")]
    pub image_url: String,
    #[schema(example = 24)]
    pub stock: i32,
    #[schema(value_type = Object)]
    pub specifications: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a new product
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    #[schema(example = "Ceramic Coffee Mug")]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    #[schema(example = "kitchen")]
    pub category: String,
    #[serde(default)]
    #[schema(example = "Hand-glazed 350ml mug")]
    pub description: String,
    #[validate(custom = "crate::validation::validate_positive_amount")]
    #[schema(value_type = f64, example = 499.0)]
    pub price: Decimal,
    #[serde(default)]
    #[schema(example = "https://cdn.example.com/mug.jpg")]
    pub image_url: String,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    #[schema(example = 24)]
    pub stock: i32,
    #[serde(default = "default_specifications")]
    #[schema(value_type = Object)]
    pub specifications: serde_json::Value,
}

fn default_specifications() -> serde_json::Value {
    serde_json::json!({})
}

/// Payload for updating an existing product; omitted fields keep their
/// current values
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "crate::validation::validate_positive_amount")]
    #[schema(value_type = f64)]
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: Option<i32>,
    #[schema(value_type = Object)]
    pub specifications: Option<serde_json::Value>,
}

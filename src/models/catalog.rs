use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AppError;
use super::validation::{Validate, Validator};
use super::{merge, merge_optional, Patch, Record, RecordId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Category {
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl Validate for NewCategory {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 2, Some(50))
            .url("imageUrl", self.image_url.as_deref());
        v.finish("Invalid category data")
    }
}

impl NewCategory {
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> Category {
        Category {
            id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl Patch<Category> for CategoryPatch {
    fn apply_to(self, category: &mut Category) {
        merge(&mut category.name, self.name);
        merge_optional(&mut category.description, self.description);
        merge_optional(&mut category.image_url, self.image_url);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub category_id: Option<RecordId>,
    pub artisan_id: RecordId,
    pub stock: i64,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Product {
    fn id(&self) -> RecordId {
        self.id
    }
}

/// Body of `POST /api/products`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: RecordId,
    pub image_url: Option<String>,
    pub stock: Option<i64>,
    pub artisan_id: RecordId,
    pub featured: Option<bool>,
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.length("name", &self.name, 3, Some(100))
            .length("description", &self.description, 10, None)
            .positive("price", self.price)
            .check("categoryId", self.category_id.is_valid(), "must be a positive integer")
            .url("imageUrl", self.image_url.as_deref())
            .check("artisanId", self.artisan_id.is_valid(), "must be a positive integer");
        if let Some(stock) = self.stock {
            v.check("stock", stock >= 0, "must be greater than or equal to 0");
        }
        v.finish("Invalid product data")
    }
}

impl NewProduct {
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: Some(self.description),
            price: self.price,
            image_url: self.image_url,
            category_id: Some(self.category_id),
            artisan_id: self.artisan_id,
            stock: self.stock.unwrap_or(0),
            featured: self.featured.unwrap_or(false),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category_id: Option<RecordId>,
    pub stock: Option<i64>,
    pub featured: Option<bool>,
}

impl Patch<Product> for ProductPatch {
    fn apply_to(self, product: &mut Product) {
        merge(&mut product.name, self.name);
        merge_optional(&mut product.description, self.description);
        merge(&mut product.price, self.price);
        merge_optional(&mut product.image_url, self.image_url);
        merge_optional(&mut product.category_id, self.category_id);
        merge(&mut product.stock, self.stock);
        merge(&mut product.featured, self.featured);
    }
}

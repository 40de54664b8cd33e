//! In-memory product catalogue.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub stock_quantity: i64,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
}

/// Listing filters. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: u32,
    pub size: u32,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            category: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: usize,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("size must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize,
    #[error("Product name cannot be empty")]
    EmptyName,
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Stock quantity cannot be negative")]
    NegativeStock,
}

impl ProductError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPage => "INVALID_PAGE",
            Self::InvalidPageSize => "INVALID_PAGE_SIZE",
            Self::EmptyName => "INVALID_PRODUCT_NAME",
            Self::NegativePrice => "INVALID_PRICE",
            Self::NegativeStock => "INVALID_STOCK_QUANTITY",
        }
    }
}

impl ProductQuery {
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.page < 1 {
            return Err(ProductError::InvalidPage);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(ProductError::InvalidPageSize);
        }
        Ok(())
    }

    fn matches(&self, product: &Product) -> bool {
        if !product.is_active {
            return false;
        }

        if let Some(category) = &self.category {
            let same = product
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = product.name.to_lowercase().contains(&needle);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }

        true
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Products kept in process memory, ordered by id.
pub struct ProductStore {
    products: RwLock<Vec<Product>>,
    next_id: AtomicI64,
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Store pre-filled with the sample catalogue.
    pub fn seeded() -> Self {
        let store = Self::new();
        let samples = [
            (
                "Laptop Gaming",
                "High-end gaming laptop with an RTX 4060 graphics card",
                25_000_000.0,
                "Electronics",
                10,
            ),
            (
                "iPhone 15 Pro",
                "iPhone 15 Pro with the A17 Pro chip",
                30_000_000.0,
                "Electronics",
                5,
            ),
            (
                "Nike Air Max",
                "Nike Air Max sports shoes",
                2_500_000.0,
                "Fashion",
                20,
            ),
            (
                "MacBook Pro M3",
                "MacBook Pro with the latest M3 chip",
                45_000_000.0,
                "Electronics",
                3,
            ),
        ];

        let seeded = samples
            .into_iter()
            .filter_map(|(name, description, price, category, stock_quantity)| {
                store
                    .create(NewProduct {
                        name: name.to_string(),
                        description: Some(description.to_string()),
                        price,
                        category: Some(category.to_string()),
                        stock_quantity,
                    })
                    .ok()
            })
            .count();
        info!(count = seeded, "sample products created");
        store
    }

    pub fn create(&self, new: NewProduct) -> Result<Product, ProductError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ProductError::EmptyName);
        }
        if new.price.is_nan() || new.price < 0.0 {
            return Err(ProductError::NegativePrice);
        }
        if new.stock_quantity < 0 {
            return Err(ProductError::NegativeStock);
        }

        // Ids are taken under the write lock so the list stays ordered by id
        let mut products = self.products.write();
        let product = Product {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            description: trimmed(new.description),
            price: new.price,
            category: trimmed(new.category),
            stock_quantity: new.stock_quantity,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        products.push(product.clone());
        Ok(product)
    }

    pub fn find_by_id(&self, id: i64) -> Option<Product> {
        self.products.read().iter().find(|p| p.id == id).cloned()
    }

    /// Returns false when no such product exists.
    pub fn set_active(&self, id: i64, active: bool) -> bool {
        match self.products.write().iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.is_active = active;
                product.updated_at = Some(OffsetDateTime::now_utc());
                true
            }
            None => false,
        }
    }

    /// One page of active products matching `query`.
    ///
    /// `total` counts every match, not just the returned page.
    pub fn list(&self, query: &ProductQuery) -> Result<ProductPage, ProductError> {
        query.validate()?;

        let products = self.products.read();
        let matching: Vec<&Product> = products.iter().filter(|p| query.matches(p)).collect();
        let offset = (query.page as usize - 1).saturating_mul(query.size as usize);

        Ok(ProductPage {
            products: matching
                .iter()
                .skip(offset)
                .take(query.size as usize)
                .map(|p| (*p).clone())
                .collect(),
            total: matching.len(),
            page: query.page,
            size: query.size,
        })
    }
}

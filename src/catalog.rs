//! Product catalog persisted as a single JSON document keyed by product id.

use crate::storage::{self, StoreError};

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PRODUCTS_FILE: &str = "products.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price_cents: u32,
    pub image: Option<String>,
    pub available: bool,
    pub daily_special: bool,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            price_cents: 0,
            image: None,
            available: true,
            daily_special: false,
        }
    }
}

impl Product {
    /// Price formatted for display, e.g. `R$ 12,50`.
    pub fn display_price(&self) -> String {
        format!("R$ {},{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

#[derive(Debug)]
pub enum ProductError {
    InvalidId,
    MissingName,
    Store(StoreError),
}

impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductError::InvalidId => {
                f.write_str("product id must use lowercase letters, digits, and dashes")
            }
            ProductError::MissingName => f.write_str("product name is required"),
            ProductError::Store(err) => write!(f, "product store error: {err}"),
        }
    }
}

pub fn is_valid_product_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('-')
        && !id.ends_with('-')
        && id
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

pub struct ProductStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ProductStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PRODUCTS_FILE),
            guard: Mutex::new(()),
        }
    }

    pub fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        let _guard = self.guard.lock().expect("product store lock");
        storage::load_or_default(&self.path)
    }

    /// Products shown on the storefront: available ones, specials first.
    pub fn list_available(&self) -> Result<Vec<Product>, StoreError> {
        let mut products = self.list_all()?;
        products.retain(|product| product.available);
        products.sort_by_key(|product| !product.daily_special);
        Ok(products)
    }

    pub fn get(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let products = self.list_all()?;
        Ok(products.into_iter().find(|product| product.id == id))
    }

    pub fn upsert(&self, product: Product) -> Result<(), ProductError> {
        if !is_valid_product_id(&product.id) {
            return Err(ProductError::InvalidId);
        }
        if product.name.trim().is_empty() {
            return Err(ProductError::MissingName);
        }

        let _guard = self.guard.lock().expect("product store lock");
        let mut products: Vec<Product> =
            storage::load_or_default(&self.path).map_err(ProductError::Store)?;
        match products
            .iter_mut()
            .find(|existing| existing.id == product.id)
        {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        storage::persist(&self.path, &products).map_err(ProductError::Store)
    }

    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.guard.lock().expect("product store lock");
        let mut products: Vec<Product> = storage::load_or_default(&self.path)?;
        let before = products.len();
        products.retain(|product| product.id != id);
        if products.len() == before {
            return Ok(false);
        }
        storage::persist(&self.path, &products)?;
        Ok(true)
    }
}

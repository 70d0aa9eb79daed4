//! Seed the catalog and restaurants from a YAML file.
//!
//! ```yaml
//! categories: [Бургеры, Напитки]
//! products:
//!   - name: Чизбургер
//!     category: Бургеры
//!     price: "350.00"
//!     image: cheeseburger.jpg
//! restaurants:
//!   - name: Star Burger Арбат
//!     address: Москва, Новый Арбат 10
//!     contact_phone: "+7 (495) 000-00-00"
//!     menu:
//!       - product: Чизбургер
//!       - product: Кола
//!         available: false
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use star_burger_core::Price;
use star_burger_server::db::{self, ProductRepository, RestaurantRepository, products::CreateProduct};
use tracing::{error, info};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub restaurants: Vec<SeedRestaurant>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub special_status: bool,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRestaurant {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub menu: Vec<SeedMenuItem>,
}

#[derive(Debug, Deserialize)]
pub struct SeedMenuItem {
    pub product: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

/// Check references and prices before anything is written.
///
/// Returns every problem found.
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let categories: HashSet<&str> = seed.categories.iter().map(String::as_str).collect();
    let mut products = HashSet::new();

    for product in &seed.products {
        if !products.insert(product.name.as_str()) {
            errors.push(format!("product {:?} is defined twice", product.name));
        }
        if let Some(category) = product
            .category
            .as_deref()
            .filter(|c| !categories.contains(c))
        {
            errors.push(format!(
                "product {:?}: unknown category {category:?}",
                product.name
            ));
        }
        if let Err(e) = Price::new(product.price) {
            errors.push(format!("product {:?}: {e}", product.name));
        }
    }

    for restaurant in &seed.restaurants {
        for item in &restaurant.menu {
            if !products.contains(item.product.as_str()) {
                errors.push(format!(
                    "restaurant {:?}: unknown product {:?}",
                    restaurant.name, item.product
                ));
            }
        }
    }

    errors
}

/// Seed the database from a YAML file.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the file cannot be read or
/// is invalid, or a database operation fails.
pub async fn from_file(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed data from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let products_repo = ProductRepository::new(&pool);
    let restaurants_repo = RestaurantRepository::new(&pool);

    let mut category_ids = HashMap::new();
    for name in &seed.categories {
        category_ids.insert(name.as_str(), products_repo.create_category(name).await?);
    }

    let mut product_ids = HashMap::new();
    for product in &seed.products {
        let id = products_repo
            .create(&CreateProduct {
                name: product.name.clone(),
                category_id: product
                    .category
                    .as_deref()
                    .and_then(|c| category_ids.get(c).copied()),
                price: Price::new(product.price)?,
                special_status: product.special_status,
                description: product.description.clone(),
                image: product.image.clone(),
            })
            .await?;
        product_ids.insert(product.name.as_str(), id);
    }

    let mut menu_items = 0_usize;
    for restaurant in &seed.restaurants {
        let restaurant_id = restaurants_repo
            .create(&restaurant.name, &restaurant.address, &restaurant.contact_phone)
            .await?;

        for item in &restaurant.menu {
            if let Some(product_id) = product_ids.get(item.product.as_str()) {
                restaurants_repo
                    .set_availability(restaurant_id, *product_id, item.available)
                    .await?;
                menu_items += 1;
            }
        }
    }

    info!("Seeding complete!");
    info!("  Categories: {}", category_ids.len());
    info!("  Products: {}", product_ids.len());
    info!("  Restaurants: {}", seed.restaurants.len());
    info!("  Menu items: {menu_items}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VALID: &str = r#"
categories: [Бургеры, Напитки]
products:
  - name: Чизбургер
    category: Бургеры
    price: "350.00"
  - name: Кола
    category: Напитки
    price: 99
restaurants:
  - name: Star Burger Арбат
    address: Москва, Новый Арбат 10
    menu:
      - product: Чизбургер
      - product: Кола
        available: false
"#;

    #[test]
    fn test_parse_and_validate() {
        let seed: SeedFile = serde_yaml::from_str(VALID).unwrap();

        assert_eq!(seed.products.len(), 2);
        assert!(seed.restaurants[0].menu[0].available);
        assert!(!seed.restaurants[0].menu[1].available);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
categories: []
products:
  - name: Чизбургер
    category: Бургеры
    price: "-1"
  - name: Чизбургер
    price: 10
restaurants:
  - name: Star Burger
    menu:
      - product: Кола
"#,
        )
        .unwrap();

        let errors = validate(&seed);
        assert_eq!(errors.len(), 4, "{errors:?}");
    }
}

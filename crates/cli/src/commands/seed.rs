//! Seed the API database from a YAML file.
//!
//! Every record is upserted by its natural key (region name, city name
//! within a region, method name, product slug), so re-running a seed file
//! updates in place.
//!
//! ```yaml
//! states:
//!   - name: Metropolitana
//!     cities: [Santiago, Providencia, Lo Barnechea]
//!   - name: Araucanía
//!     cities: [Temuco, Padre Las Casas]
//! shipping_methods:
//!   - name: Despacho express
//!     price: 3990
//!     cities: [Santiago, Providencia]
//!   - name: Starken
//!     description: Envío a regiones
//!     price: 5990
//!     nationwide: true
//! products:
//!   - slug: cafe-grano-250
//!     name: Café en grano 250 g
//!     price: 4990
//!     stock: 40
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use tienda_api::db::{self, GeoRepository, ProductRepository};
use tienda_core::{Product, ProductId, ShippingMethod, ShippingMethodId};

use super::migrate::database_url;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub states: Vec<StateSeed>,
    pub shipping_methods: Vec<MethodSeed>,
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct StateSeed {
    pub name: String,
    #[serde(default)]
    pub cities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MethodSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub nationwide: bool,
    /// Metro cities the method serves, by name.
    #[serde(default)]
    pub cities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Problems that would make the seed inconsistent.
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    let cities: HashSet<&str> = seed
        .states
        .iter()
        .flat_map(|state| state.cities.iter().map(String::as_str))
        .collect();

    for method in &seed.shipping_methods {
        if method.price.is_sign_negative() {
            errors.push(format!("shipping method {}: negative price", method.name));
        }
        if !method.nationwide && method.cities.is_empty() {
            errors.push(format!(
                "shipping method {}: serves no city and is not nationwide",
                method.name
            ));
        }
        for city in &method.cities {
            if !cities.contains(city.as_str()) {
                errors.push(format!("shipping method {}: unknown city {city}", method.name));
            }
        }
    }

    let mut slugs = HashSet::new();
    for product in &seed.products {
        if !slugs.insert(product.slug.as_str()) {
            errors.push(format!("product {}: duplicate slug", product.slug));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("product {}: negative price", product.slug));
        }
        if product.stock < 0 {
            errors.push(format!("product {}: negative stock", product.slug));
        }
    }

    errors
}

/// Load a seed file into the API database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
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

    let pool = db::create_pool(&database_url("API_DATABASE_URL")?).await?;
    info!("Connected to database");

    let geo = GeoRepository::new(&pool);
    let mut city_count = 0;
    for state in &seed.states {
        let state_id = geo.upsert_state(&state.name).await?;
        for city in &state.cities {
            geo.upsert_city(state_id, city).await?;
            city_count += 1;
        }
    }
    info!(states = seed.states.len(), cities = city_count, "Geography seeded");

    for method in &seed.shipping_methods {
        let record = ShippingMethod {
            id: ShippingMethodId::new(0),
            name: method.name.clone(),
            description: method.description.clone(),
            price: method.price,
        };
        geo.upsert_method(&record, method.nationwide, &method.cities)
            .await?;
    }
    info!(methods = seed.shipping_methods.len(), "Shipping methods seeded");

    let products = ProductRepository::new(&pool);
    for product in seed.products {
        products
            .upsert(&Product {
                id: ProductId::new(0),
                slug: product.slug,
                name: product.name,
                description: product.description,
                price: product.price,
                stock: product.stock,
                image_url: product.image_url,
                category: product.category,
            })
            .await?;
    }
    info!("Seeding complete");

    Ok(())
}

//! Shipping-method resolution by city.
//!
//! Cities in the metro region are served by methods linked to them by name;
//! every other city gets the nationwide methods. Resolution for a metro city
//! is a chain of five lookups:
//!
//! 1. the metro region's id, by its configured name
//! 2. the city's region (an unknown city stops here)
//! 3. the city's name
//! 4. the ids of the methods serving that name
//! 5. those methods, in id order (skipped when step 4 finds none)
//!
//! A city outside the metro region takes step 1, step 2, and one lookup of
//! the nationwide methods.

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;

use tienda_core::{City, CityId, ShippingMethod, ShippingMethodId, StateId};

use crate::db::{GeoRepository, RepositoryError};

/// Errors from shipping resolution.
#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("city {0} not found")]
    CityNotFound(CityId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Single-query lookups the resolver composes.
#[async_trait]
pub trait ShippingDirectory: Send + Sync {
    async fn state_id_by_name(&self, name: &str) -> Result<Option<StateId>, RepositoryError>;
    async fn state_id_of_city(&self, city_id: CityId) -> Result<Option<StateId>, RepositoryError>;
    async fn city_name(&self, city_id: CityId) -> Result<Option<String>, RepositoryError>;
    async fn method_ids_for_city(
        &self,
        city_name: &str,
    ) -> Result<Vec<ShippingMethodId>, RepositoryError>;
    async fn methods_by_ids(
        &self,
        ids: &[ShippingMethodId],
    ) -> Result<Vec<ShippingMethod>, RepositoryError>;
    async fn nationwide_methods(&self) -> Result<Vec<ShippingMethod>, RepositoryError>;
    async fn cities_by_state(&self, state_id: StateId) -> Result<Vec<City>, RepositoryError>;
}

#[async_trait]
impl ShippingDirectory for GeoRepository<'_> {
    async fn state_id_by_name(&self, name: &str) -> Result<Option<StateId>, RepositoryError> {
        GeoRepository::state_id_by_name(self, name).await
    }

    async fn state_id_of_city(&self, city_id: CityId) -> Result<Option<StateId>, RepositoryError> {
        GeoRepository::state_id_of_city(self, city_id).await
    }

    async fn city_name(&self, city_id: CityId) -> Result<Option<String>, RepositoryError> {
        GeoRepository::city_name(self, city_id).await
    }

    async fn method_ids_for_city(
        &self,
        city_name: &str,
    ) -> Result<Vec<ShippingMethodId>, RepositoryError> {
        GeoRepository::method_ids_for_city(self, city_name).await
    }

    async fn methods_by_ids(
        &self,
        ids: &[ShippingMethodId],
    ) -> Result<Vec<ShippingMethod>, RepositoryError> {
        GeoRepository::methods_by_ids(self, ids).await
    }

    async fn nationwide_methods(&self) -> Result<Vec<ShippingMethod>, RepositoryError> {
        GeoRepository::nationwide_methods(self).await
    }

    async fn cities_by_state(&self, state_id: StateId) -> Result<Vec<City>, RepositoryError> {
        GeoRepository::cities_by_state(self, state_id).await
    }
}

/// Resolves which shipping methods serve a city.
pub struct ShippingResolver<'a> {
    directory: &'a dyn ShippingDirectory,
    metro_region: &'a str,
}

impl<'a> ShippingResolver<'a> {
    #[must_use]
    pub const fn new(directory: &'a dyn ShippingDirectory, metro_region: &'a str) -> Self {
        Self {
            directory,
            metro_region,
        }
    }

    /// Shipping methods available in a city. An empty list is a valid answer.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::CityNotFound` for an unknown city, or
    /// `ShippingError::Repository` if a lookup fails.
    #[instrument(skip(self))]
    pub async fn fetch_shipping_methods(
        &self,
        city_id: CityId,
    ) -> Result<Vec<ShippingMethod>, ShippingError> {
        let metro = self.directory.state_id_by_name(self.metro_region).await?;
        let state = self
            .directory
            .state_id_of_city(city_id)
            .await?
            .ok_or(ShippingError::CityNotFound(city_id))?;

        if metro != Some(state) {
            return Ok(self.directory.nationwide_methods().await?);
        }

        let city_name = self
            .directory
            .city_name(city_id)
            .await?
            .ok_or(ShippingError::CityNotFound(city_id))?;

        let ids = self.directory.method_ids_for_city(&city_name).await?;
        if ids.is_empty() {
            tracing::debug!(city = %city_name, "No shipping methods linked to metro city");
            return Ok(Vec::new());
        }

        Ok(self.directory.methods_by_ids(&ids).await?)
    }

    /// Find one method among those serving a city.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_shipping_methods`].
    pub async fn method_for_city(
        &self,
        city_id: CityId,
        method_id: ShippingMethodId,
    ) -> Result<Option<ShippingMethod>, ShippingError> {
        let methods = self.fetch_shipping_methods(city_id).await?;
        Ok(methods.into_iter().find(|method| method.id == method_id))
    }

    /// Cities of a region, in row order.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::Repository` if the lookup fails.
    pub async fn fetch_cities_by_state_id(
        &self,
        state_id: StateId,
    ) -> Result<Vec<City>, ShippingError> {
        Ok(self.directory.cities_by_state(state_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::Decimal;

    use super::*;

    /// In-memory directory that counts every lookup.
    struct CountingDirectory {
        states: Vec<(StateId, &'static str)>,
        cities: Vec<City>,
        links: Vec<(&'static str, ShippingMethodId)>,
        methods: Vec<ShippingMethod>,
        nationwide: Vec<ShippingMethodId>,
        calls: AtomicUsize,
    }

    impl CountingDirectory {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn count(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn city(&self, city_id: CityId) -> Option<&City> {
            self.cities.iter().find(|city| city.id == city_id)
        }
    }

    #[async_trait]
    impl ShippingDirectory for CountingDirectory {
        async fn state_id_by_name(&self, name: &str) -> Result<Option<StateId>, RepositoryError> {
            self.count();
            Ok(self
                .states
                .iter()
                .find(|(_, state)| *state == name)
                .map(|(id, _)| *id))
        }

        async fn state_id_of_city(&self, city_id: CityId) -> Result<Option<StateId>, RepositoryError> {
            self.count();
            Ok(self.city(city_id).map(|city| city.state_id))
        }

        async fn city_name(&self, city_id: CityId) -> Result<Option<String>, RepositoryError> {
            self.count();
            Ok(self.city(city_id).map(|city| city.name.clone()))
        }

        async fn method_ids_for_city(
            &self,
            city_name: &str,
        ) -> Result<Vec<ShippingMethodId>, RepositoryError> {
            self.count();
            Ok(self
                .links
                .iter()
                .filter(|(name, _)| *name == city_name)
                .map(|(_, id)| *id)
                .collect())
        }

        async fn methods_by_ids(
            &self,
            ids: &[ShippingMethodId],
        ) -> Result<Vec<ShippingMethod>, RepositoryError> {
            self.count();
            let mut found: Vec<ShippingMethod> = self
                .methods
                .iter()
                .filter(|method| ids.contains(&method.id))
                .cloned()
                .collect();
            found.sort_by_key(|method| method.id);
            Ok(found)
        }

        async fn nationwide_methods(&self) -> Result<Vec<ShippingMethod>, RepositoryError> {
            self.count();
            Ok(self
                .methods
                .iter()
                .filter(|method| self.nationwide.contains(&method.id))
                .cloned()
                .collect())
        }

        async fn cities_by_state(&self, state_id: StateId) -> Result<Vec<City>, RepositoryError> {
            self.count();
            Ok(self
                .cities
                .iter()
                .filter(|city| city.state_id == state_id)
                .cloned()
                .collect())
        }
    }

    fn method(id: i32, name: &str, price: i64) -> ShippingMethod {
        ShippingMethod {
            id: ShippingMethodId::new(id),
            name: name.to_string(),
            description: None,
            price: Decimal::new(price, 0),
        }
    }

    fn city(id: i32, name: &str, state: i32) -> City {
        City {
            id: CityId::new(id),
            name: name.to_string(),
            state_id: StateId::new(state),
        }
    }

    fn directory() -> CountingDirectory {
        CountingDirectory {
            states: vec![
                (StateId::new(8), "Araucanía"),
                (StateId::new(13), "Metropolitana"),
            ],
            cities: vec![
                city(1, "Santiago", 13),
                city(2, "Lo Barnechea", 13),
                city(81, "Temuco", 8),
                city(82, "Padre Las Casas", 8),
            ],
            links: vec![
                ("Santiago", ShippingMethodId::new(2)),
                ("Santiago", ShippingMethodId::new(1)),
            ],
            methods: vec![
                method(1, "Despacho express", 3990),
                method(2, "Retiro en tienda", 0),
                method(3, "Starken", 5990),
            ],
            nationwide: vec![ShippingMethodId::new(3)],
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_metro_city_takes_five_lookups() {
        let directory = directory();
        let resolver = ShippingResolver::new(&directory, "Metropolitana");

        let methods = resolver
            .fetch_shipping_methods(CityId::new(1))
            .await
            .unwrap();

        assert_eq!(directory.calls(), 5);
        assert_eq!(methods.len(), 2);
        assert_eq!(methods.first().unwrap().id, ShippingMethodId::new(1));
    }

    #[tokio::test]
    async fn test_metro_city_without_links_skips_method_fetch() {
        let directory = directory();
        let resolver = ShippingResolver::new(&directory, "Metropolitana");

        let methods = resolver
            .fetch_shipping_methods(CityId::new(2))
            .await
            .unwrap();

        assert!(methods.is_empty());
        assert_eq!(directory.calls(), 4);
    }

    #[tokio::test]
    async fn test_other_regions_get_nationwide_methods() {
        let directory = directory();
        let resolver = ShippingResolver::new(&directory, "Metropolitana");

        let methods = resolver
            .fetch_shipping_methods(CityId::new(81))
            .await
            .unwrap();

        assert_eq!(directory.calls(), 3);
        assert_eq!(methods, vec![method(3, "Starken", 5990)]);
    }

    #[tokio::test]
    async fn test_unknown_city_is_not_found() {
        let directory = directory();
        let resolver = ShippingResolver::new(&directory, "Metropolitana");

        let err = resolver
            .fetch_shipping_methods(CityId::new(999))
            .await
            .unwrap_err();
        assert!(matches!(err, ShippingError::CityNotFound(id) if id == CityId::new(999)));
    }

    #[tokio::test]
    async fn test_method_for_city_only_offers_served_methods() {
        let directory = directory();
        let resolver = ShippingResolver::new(&directory, "Metropolitana");

        let express = resolver
            .method_for_city(CityId::new(1), ShippingMethodId::new(1))
            .await
            .unwrap();
        assert_eq!(express.unwrap().name, "Despacho express");

        let starken = resolver
            .method_for_city(CityId::new(1), ShippingMethodId::new(3))
            .await
            .unwrap();
        assert!(starken.is_none());
    }

    #[tokio::test]
    async fn test_fetch_cities_by_state_id_keeps_row_order() {
        let directory = directory();
        let resolver = ShippingResolver::new(&directory, "Metropolitana");

        let cities = resolver
            .fetch_cities_by_state_id(StateId::new(8))
            .await
            .unwrap();

        assert_eq!(cities.len(), 2);
        assert_eq!(cities.first().unwrap().name, "Temuco");
    }
}

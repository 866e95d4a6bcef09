//! Repository layer for catalog database reads

pub mod catalog;

use sqlx::{Pool, Postgres};

use crate::config::IndexCodes;

pub use catalog::{CatalogGateway, CatalogRepository};

#[cfg(test)]
pub use catalog::MockCatalogGateway;

/// Main repository struct, one reader per table family
#[derive(Clone)]
pub struct Repository {
    pub catalog: CatalogRepository,
}

impl Repository {
    /// Create a new repository over the given database pool
    pub fn new(pool: Pool<Postgres>, index_codes: IndexCodes) -> Self {
        Self {
            catalog: CatalogRepository::new(pool, index_codes),
        }
    }
}

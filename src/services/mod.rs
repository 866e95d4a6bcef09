//! Business logic services

pub mod catalog;
pub mod eligibility;
pub mod illiad;
pub mod z3950;

use std::sync::Arc;

use crate::{config::AppConfig, repository::{CatalogGateway, Repository}};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub z3950: z3950::Z3950Service,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let gateway: Arc<dyn CatalogGateway> = Arc::new(repository.catalog);
        let connector = Arc::new(z3950::Z3950Connector::new(&config.z3950));
        let z3950 = z3950::Z3950Service::new(gateway.clone(), connector, Arc::new(config.z3950.clone()));

        Self {
            catalog: catalog::CatalogService::new(gateway, z3950.clone(), Arc::new(config.catalog.clone())),
            z3950,
        }
    }
}

//! Business logic services

pub mod borrows;
pub mod catalog;
pub mod identity;

use std::sync::Arc;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub catalog: catalog::CatalogService,
    pub borrows: borrows::BorrowsService,
    pub identity: Arc<dyn identity::IdentityVerifier>,
}

impl Services {
    /// Create all services with the given repository and token verifier
    pub fn new(repository: Repository, identity: Arc<dyn identity::IdentityVerifier>) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            borrows: borrows::BorrowsService::new(repository.clone()),
            identity,
            repository,
        }
    }
}

//! Business logic services

pub mod availability;
pub mod catalog;
pub mod clock;
pub mod inventory;
pub mod loans;
pub mod locks;
pub mod overdue;
pub mod policy;
pub mod seed;

use std::sync::Arc;

use crate::{
    config::{AvailabilityConfig, LendingConfig},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub inventory: inventory::InventoryCoordinator,
    pub loans: loans::LoansService,
    pub overdue: overdue::OverdueScanner,
    pub availability: availability::AvailabilityBroadcaster,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        lending: &LendingConfig,
        availability: &AvailabilityConfig,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        let broadcaster = availability::AvailabilityBroadcaster::new(availability.buffer_size);
        let inventory = inventory::InventoryCoordinator::new(
            repository.clone(),
            policy::BorrowPolicy::from_config(lending),
            broadcaster.clone(),
            clock.clone(),
        );

        Self {
            catalog: catalog::CatalogService::new(repository.clone(), inventory.clone()),
            loans: loans::LoansService::new(repository.clone(), inventory.clone()),
            overdue: overdue::OverdueScanner::new(repository, clock),
            inventory,
            availability: broadcaster,
        }
    }
}

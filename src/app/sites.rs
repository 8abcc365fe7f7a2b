use std::collections::BTreeMap;

use async_trait::async_trait;

use super::error::CheckError;
use super::types::{MonitoredSite, SiteId};

/// Source of monitored sites; owned outside the check pipeline.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// The site, provided it exists and is active.
    async fn get_active(&self, id: SiteId) -> Result<MonitoredSite, CheckError>;

    async fn list_active(&self) -> Vec<MonitoredSite>;
}

/// A fixed set of sites, typically loaded from a sites file at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteRepository {
    sites: BTreeMap<SiteId, MonitoredSite>,
}

impl StaticSiteRepository {
    pub fn new(sites: impl IntoIterator<Item = MonitoredSite>) -> Self {
        Self {
            sites: sites.into_iter().map(|site| (site.id, site)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[async_trait]
impl SiteRepository for StaticSiteRepository {
    async fn get_active(&self, id: SiteId) -> Result<MonitoredSite, CheckError> {
        match self.sites.get(&id) {
            None => Err(CheckError::SiteNotFound(id)),
            Some(site) if !site.is_active => Err(CheckError::SiteInactive(id)),
            Some(site) => Ok(site.clone()),
        }
    }

    async fn list_active(&self) -> Vec<MonitoredSite> {
        self.sites
            .values()
            .filter(|site| site.is_active)
            .cloned()
            .collect()
    }
}

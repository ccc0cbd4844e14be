// src/export/mod.rs
use crate::runner::{RegisteredService, ServiceSnapshot};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Publishes registered services for external introspection.
pub trait MetadataExporter: Send + Sync {
    fn export(&self, object_name: &str, service: &RegisteredService) -> anyhow::Result<()>;
}

/// Name a service is exported under, e.g. `service-monitor:name=disk-space`.
pub fn object_name(service_name: &str) -> String {
    format!("{}:name={}", env!("CARGO_PKG_NAME"), service_name)
}

/// Exporter used when no introspection collaborator is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExporter;

impl MetadataExporter for NoopExporter {
    fn export(&self, _object_name: &str, _service: &RegisteredService) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory directory of exported services, backing `/services`.
#[derive(Default)]
pub struct ServiceDirectory {
    entries: DashMap<String, RegisteredService>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object_name: &str) -> Option<RegisteredService> {
        self.entries.get(object_name).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshots of every exported service, sorted by service name.
    pub fn snapshots(&self) -> Vec<ServiceSnapshot> {
        let mut snapshots: Vec<ServiceSnapshot> = self
            .entries
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}

impl MetadataExporter for ServiceDirectory {
    fn export(&self, object_name: &str, service: &RegisteredService) -> anyhow::Result<()> {
        match self.entries.entry(object_name.to_string()) {
            Entry::Occupied(_) => anyhow::bail!("{} is already exported", object_name),
            Entry::Vacant(entry) => {
                entry.insert(service.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_is_namespaced() {
        assert_eq!(object_name("disk-space"), "service-monitor:name=disk-space");
    }
}

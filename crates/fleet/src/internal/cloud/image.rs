use serde::{Deserialize, Serialize};

use crate::internal::common::Map;
use crate::internal::common::data_structures::sorted_keys;
use crate::internal::resources::ResourceDescription;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudImageDescription {
    pub name: String,
    pub os_type: Option<String>,
    pub os_distribution: Option<String>,
    pub os_version: Option<String>,
    pub software: Vec<String>,
    pub queues: Vec<String>,
    /// Shared disk name -> mount point
    pub shared_disks: Map<String, String>,
    pub price_per_unit: Option<f64>,
    /// Minutes
    pub price_time_unit: Option<u32>,
    /// Connector specific properties passed through untouched
    pub properties: Map<String, String>,
}

impl CloudImageDescription {
    pub fn new(name: impl Into<String>) -> Self {
        CloudImageDescription {
            name: name.into(),
            ..Default::default()
        }
    }

    fn os_matches(&self, requested: &ResourceDescription) -> bool {
        fn matches(image: &Option<String>, requested: &Option<String>) -> bool {
            match (image, requested) {
                (Some(i), Some(r)) => i == r,
                _ => true,
            }
        }
        matches(&self.os_type, &requested.os_type)
            && matches(&self.os_distribution, &requested.os_distribution)
            && matches(&self.os_version, &requested.os_version)
    }

    pub fn is_compatible_with(&self, requested: &ResourceDescription) -> bool {
        self.os_matches(requested)
            && requested
                .app_software
                .iter()
                .all(|s| self.software.contains(s))
            && (requested.host_queues.is_empty()
                || requested.host_queues.iter().any(|q| self.queues.contains(q)))
    }
}

/// Image catalogue of a cloud provider.
#[derive(Debug, Default)]
pub struct CloudImageManager {
    images: Map<String, CloudImageDescription>,
}

impl CloudImageManager {
    pub fn add(&mut self, image: CloudImageDescription) {
        if self.images.insert(image.name.clone(), image).is_some() {
            log::debug!("Cloud image was redefined");
        }
    }

    pub fn get(&self, name: &str) -> Option<&CloudImageDescription> {
        self.images.get(name)
    }

    /// Images in name order.
    pub fn all(&self) -> Vec<&CloudImageDescription> {
        sorted_keys(&self.images)
            .iter()
            .map(|name| &self.images[name])
            .collect()
    }

    /// Images whose OS, installed software and queues can serve `requested`.
    pub fn compatible_images(
        &self,
        requested: &ResourceDescription,
    ) -> Vec<&CloudImageDescription> {
        self.all()
            .into_iter()
            .filter(|image| image.is_compatible_with(requested))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CloudImageDescription, CloudImageManager};
    use crate::internal::tests::utils::resources::ResBuilder;

    fn image(name: &str, os: &str, software: &[&str], queues: &[&str]) -> CloudImageDescription {
        CloudImageDescription {
            os_type: Some(os.to_string()),
            software: software.iter().map(|s| s.to_string()).collect(),
            queues: queues.iter().map(|s| s.to_string()).collect(),
            ..CloudImageDescription::new(name)
        }
    }

    #[test]
    fn software_must_be_subset() {
        let mut manager = CloudImageManager::default();
        manager.add(image("r-image", "linux", &["R"], &[]));

        let rq = ResBuilder::default()
            .os("linux", None, None)
            .software(&["R", "Python"])
            .finish();
        assert!(manager.compatible_images(&rq).is_empty());

        let rq = ResBuilder::default()
            .os("linux", None, None)
            .software(&["R"])
            .finish();
        let images = manager.compatible_images(&rq);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "r-image");
    }

    #[test]
    fn os_exact_or_unassigned() {
        let mut manager = CloudImageManager::default();
        manager.add(image("linux", "linux", &[], &[]));
        manager.add(CloudImageDescription::new("any"));

        let names = |os: &str| -> Vec<String> {
            manager
                .compatible_images(&ResBuilder::default().os(os, None, None).finish())
                .iter()
                .map(|i| i.name.clone())
                .collect()
        };
        assert_eq!(names("linux"), vec!["any", "linux"]);
        assert_eq!(names("windows"), vec!["any"]);
        assert_eq!(manager.compatible_images(&ResBuilder::default().finish()).len(), 2);
    }

    #[test]
    fn queues_only_checked_when_requested() {
        let mut manager = CloudImageManager::default();
        manager.add(image("debug", "linux", &[], &["debug", "short"]));
        manager.add(image("none", "linux", &[], &[]));

        assert_eq!(manager.compatible_images(&ResBuilder::default().finish()).len(), 2);
        let rq = ResBuilder::default().queues(&["short", "long"]).finish();
        let images = manager.compatible_images(&rq);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "debug");
        let rq = ResBuilder::default().queues(&["long"]).finish();
        assert!(manager.compatible_images(&rq).is_empty());
    }
}

use std::sync::{Arc, Once};

use crate::CoreId;
use crate::internal::cloud::CloudProvider;
use crate::internal::cores::{CoreElementDefinition, CoreRegistry, ImplementationDefinition};
use crate::internal::manager::ResourceManager;
use crate::internal::resources::ResourceDescription;
use crate::internal::shutdown::WorkerNode;
use crate::internal::tests::utils::cloud::TestConnector;
use crate::internal::tests::utils::user::RecordingUser;
use crate::internal::worker::{Worker, WorkerInfo, WorkerKind};

static LOGGING: Once = Once::new();

pub struct TestEnv {
    pub registry: Arc<CoreRegistry>,
    pub user: Arc<RecordingUser>,
    pub manager: ResourceManager,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::with_user(RecordingUser::default())
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: RecordingUser) -> Self {
        LOGGING.call_once(|| crate::setup_logging(false));
        let registry = Arc::new(CoreRegistry::new());
        let user = Arc::new(user);
        let manager = ResourceManager::new(registry.clone(), user.clone());
        TestEnv {
            registry,
            user,
            manager,
        }
    }

    /// Registers a core element with one method implementation per requirement and
    /// announces it to the fleet.
    pub fn core(&self, signature: &str, requirements: &[ResourceDescription]) -> CoreId {
        let core_id = self.register_core(signature, requirements);
        self.manager.core_elements_updated(&[core_id]);
        core_id
    }

    /// Registers a core element without announcing it to the fleet.
    pub fn register_core(&self, signature: &str, requirements: &[ResourceDescription]) -> CoreId {
        let definition = CoreElementDefinition {
            signature: signature.to_string(),
            implementations: requirements
                .iter()
                .enumerate()
                .map(|(idx, r)| {
                    ImplementationDefinition::method(format!("{signature}.impl{idx}"), r.clone())
                })
                .collect(),
        };
        self.registry
            .register_core_element_definition(definition)
            .unwrap()
            .id()
    }

    pub fn add_static(&self, name: &str, description: ResourceDescription) {
        self.manager
            .add_static_worker(Worker::new(name, WorkerKind::Static, description, None));
    }

    pub fn add_static_with_node(
        &self,
        name: &str,
        description: ResourceDescription,
        node: Arc<dyn WorkerNode>,
    ) {
        self.manager.add_static_worker(Worker::new(
            name,
            WorkerKind::Static,
            description,
            Some(node),
        ));
    }

    pub fn add_dynamic(&self, name: &str, description: ResourceDescription) {
        self.manager.add_dynamic_worker(
            Worker::new(name, WorkerKind::Dynamic, description.clone(), None),
            description,
        );
    }

    pub fn add_provider(
        &self,
        name: &str,
        limit_of_vms: Option<u32>,
        connector: Arc<TestConnector>,
    ) -> Arc<CloudProvider> {
        self.manager
            .cloud()
            .register_provider(name, limit_of_vms, connector)
            .unwrap()
    }
}

pub fn names(workers: Vec<WorkerInfo>) -> Vec<String> {
    workers.into_iter().map(|w| w.name).collect()
}

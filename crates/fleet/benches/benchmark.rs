use std::sync::Arc;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};

use fleet::cores::{CoreElementDefinition, CoreRegistry, ImplementationDefinition};
use fleet::resources::ResourceDescription;
use fleet::{ResourceManager, ResourceUpdate, ResourceUser, Worker, WorkerInfo, WorkerKind};

struct NoopUser;

impl ResourceUser for NoopUser {
    fn updated_resource(&self, _worker: &WorkerInfo, _update: ResourceUpdate) {}
}

fn create_fleet(core_count: u32, worker_count: u32) -> ResourceManager {
    let registry = Arc::new(CoreRegistry::new());
    for idx in 0..core_count {
        registry.register_core_element_definition(CoreElementDefinition {
            signature: format!("core{idx}"),
            implementations: vec![ImplementationDefinition::method(
                format!("core{idx}.impl"),
                ResourceDescription::cpus(idx % 16 + 1),
            )],
        });
    }
    let manager = ResourceManager::new(registry, Arc::new(NoopUser));
    for idx in 0..worker_count {
        let mut description = ResourceDescription::cpus(idx % 16 + 1);
        description.value = (idx % 7) as f64;
        manager.add_dynamic_worker(
            Worker::new(format!("w{idx}"), WorkerKind::Dynamic, description.clone(), None),
            description,
        );
    }
    manager
}

fn bench_add_worker(c: &mut Criterion) {
    for worker_count in [10, 100, 1_000] {
        c.bench_with_input(
            BenchmarkId::new("add dynamic worker", worker_count),
            &worker_count,
            |b, &worker_count| {
                b.iter_batched_ref(
                    || create_fleet(100, worker_count),
                    |manager| {
                        let description = ResourceDescription::cpus(16);
                        manager.add_dynamic_worker(
                            Worker::new("new", WorkerKind::Dynamic, description.clone(), None),
                            description,
                        );
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
}

fn bench_remove_critical_worker(c: &mut Criterion) {
    for worker_count in [10, 100, 1_000] {
        c.bench_with_input(
            BenchmarkId::new("remove critical worker", worker_count),
            &worker_count,
            |b, &worker_count| {
                b.iter_batched_ref(
                    || {
                        let manager = create_fleet(100, worker_count);
                        let name = manager.critical_workers()[0].name.clone();
                        (manager, name)
                    },
                    |(manager, name)| {
                        manager.remove_worker(name);
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
}

fn bench_core_registration(c: &mut Criterion) {
    for worker_count in [10, 100, 1_000] {
        c.bench_with_input(
            BenchmarkId::new("announce new core", worker_count),
            &worker_count,
            |b, &worker_count| {
                b.iter_batched_ref(
                    || {
                        let manager = create_fleet(100, worker_count);
                        let core = manager
                            .registry()
                            .register_core_element_definition(CoreElementDefinition {
                                signature: "extra".to_string(),
                                implementations: vec![ImplementationDefinition::method(
                                    "extra.impl",
                                    ResourceDescription::cpus(3),
                                )],
                            })
                            .map(|c| c.id());
                        (manager, core)
                    },
                    |(manager, core)| {
                        if let Some(core) = core {
                            manager.core_elements_updated(&[*core]);
                        }
                    },
                    BatchSize::SmallInput,
                );
            },
        );
    }
}

criterion_group!(
    manager,
    bench_add_worker,
    bench_remove_critical_worker,
    bench_core_registration
);
criterion_main!(manager);

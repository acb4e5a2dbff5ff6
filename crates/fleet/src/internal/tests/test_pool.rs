use crate::CoreId;
use crate::internal::common::Set;
use crate::internal::cores::{CoreElementDefinition, CoreRegistry, ImplementationDefinition};
use crate::internal::pool::{Partition, WorkerPool};
use crate::internal::resources::ResourceDescription;
use crate::internal::tests::utils::env::{TestEnv, names};
use crate::internal::tests::utils::resources::ResBuilder;
use crate::internal::worker::{Worker, WorkerKind};

fn worker(
    registry: &CoreRegistry,
    name: &str,
    kind: WorkerKind,
    description: ResourceDescription,
) -> Worker {
    let mut worker = Worker::new(name, kind, description, None);
    worker.update_slots(registry);
    worker
}

fn cores(registry: &CoreRegistry, requirements: &[(&str, u32)]) -> Vec<CoreId> {
    requirements
        .iter()
        .map(|(signature, cpus)| {
            registry
                .register_core_element_definition(CoreElementDefinition {
                    signature: signature.to_string(),
                    implementations: vec![ImplementationDefinition::method(
                        format!("{signature}.impl"),
                        ResBuilder::default().cpus(*cpus).finish(),
                    )],
                })
                .unwrap()
                .id()
        })
        .collect()
}

/// Every core executable by some pooled worker is executable by static or critical ones.
fn assert_coverage(pool: &WorkerPool) {
    let all: Set<CoreId> = pool.all_workers().flat_map(|w| w.executable_cores()).collect();
    let guaranteed: Set<CoreId> = pool
        .static_workers()
        .chain(pool.critical_workers())
        .flat_map(|w| w.executable_cores())
        .collect();
    assert_eq!(all, guaranteed);
}

#[test]
fn test_partitions_are_disjoint() {
    let registry = CoreRegistry::new();
    cores(&registry, &[("a", 1)]);
    let mut pool = WorkerPool::default();
    pool.add_static(worker(
        &registry,
        "s",
        WorkerKind::Static,
        ResBuilder::default().cpus(1).finish(),
    ));
    pool.add_dynamic(worker(
        &registry,
        "d",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(1).finish(),
    ));

    assert_eq!(pool.partition_of("s"), Some(Partition::Static));
    assert_eq!(pool.partition_of("d"), Some(Partition::Critical));
    pool.recompute_critical_set();
    assert_eq!(pool.partition_of("d"), Some(Partition::NonCritical));
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.dynamic_workers().count(), 1);
    assert!(pool.remove("d").is_some());
    assert_eq!(pool.partition_of("d"), None);
    assert!(pool.remove("d").is_none());
}

#[test]
#[should_panic(expected = "already in the pool")]
fn test_duplicate_worker() {
    let registry = CoreRegistry::new();
    let mut pool = WorkerPool::default();
    pool.add_static(worker(
        &registry,
        "w",
        WorkerKind::Static,
        ResBuilder::default().cpus(1).finish(),
    ));
    pool.add_dynamic(worker(
        &registry,
        "w",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(1).finish(),
    ));
}

#[test]
fn test_cheapest_worker_stays_critical() {
    let registry = CoreRegistry::new();
    cores(&registry, &[("a", 2)]);
    let mut pool = WorkerPool::default();
    pool.add_dynamic(worker(
        &registry,
        "expensive",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(4).value(3.0).finish(),
    ));
    pool.add_dynamic(worker(
        &registry,
        "cheap",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(4).value(1.0).finish(),
    ));
    pool.recompute_critical_set();
    assert_eq!(pool.partition_of("cheap"), Some(Partition::Critical));
    assert_eq!(pool.partition_of("expensive"), Some(Partition::NonCritical));
    assert_coverage(&pool);

    // The cheap worker leaves, the demoted one has to come back
    pool.remove("cheap");
    pool.recompute_critical_set();
    assert_eq!(pool.partition_of("expensive"), Some(Partition::Critical));
    assert_coverage(&pool);
}

#[test]
fn test_equal_cost_keeps_insertion_order() {
    let registry = CoreRegistry::new();
    cores(&registry, &[("a", 1)]);
    let mut pool = WorkerPool::default();
    for name in ["w1", "w2", "w3"] {
        pool.add_dynamic(worker(
            &registry,
            name,
            WorkerKind::Dynamic,
            ResBuilder::default().cpus(1).finish(),
        ));
    }
    pool.recompute_critical_set();
    assert_eq!(pool.partition_of("w1"), Some(Partition::Critical));
    assert_eq!(pool.partition_of("w2"), Some(Partition::NonCritical));
    assert_eq!(pool.partition_of("w3"), Some(Partition::NonCritical));
}

#[test]
fn test_worker_with_unique_core_is_critical() {
    let registry = CoreRegistry::new();
    cores(&registry, &[("small", 1), ("big", 8)]);
    let mut pool = WorkerPool::default();
    pool.add_static(worker(
        &registry,
        "s",
        WorkerKind::Static,
        ResBuilder::default().cpus(2).finish(),
    ));
    pool.add_dynamic(worker(
        &registry,
        "d1",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(2).finish(),
    ));
    pool.add_dynamic(worker(
        &registry,
        "d2",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(8).value(5.0).finish(),
    ));
    pool.recompute_critical_set();

    assert_eq!(pool.partition_of("d1"), Some(Partition::NonCritical));
    assert_eq!(pool.partition_of("d2"), Some(Partition::Critical));
    assert_coverage(&pool);
}

#[test]
fn test_reduction_safety() {
    let registry = CoreRegistry::new();
    cores(&registry, &[("a", 1)]);
    let mut pool = WorkerPool::default();
    pool.add_dynamic(worker(
        &registry,
        "d",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(4).finish(),
    ));
    pool.recompute_critical_set();

    assert!(pool.is_reduction_safe(&[vec![2]]));
    assert!(!pool.is_reduction_safe(&[vec![4]]));
    assert!(pool.is_reduction_safe(&[vec![0]]));

    // Only the critical set counts, static capacity does not
    pool.add_static(worker(
        &registry,
        "s",
        WorkerKind::Static,
        ResBuilder::default().cpus(8).finish(),
    ));
    assert_eq!(pool.partition_of("d"), Some(Partition::Critical));
    assert!(!pool.is_reduction_safe(&[vec![4]]));
    assert!(pool.is_reduction_safe(&[vec![3]]));

    pool.recompute_critical_set();
    assert_eq!(pool.partition_of("d"), Some(Partition::NonCritical));
    assert!(!pool.is_reduction_safe(&[vec![1]]));
}

#[test]
fn test_core_slots_sum_workers() {
    let registry = CoreRegistry::new();
    cores(&registry, &[("a", 1), ("b", 2)]);
    let mut pool = WorkerPool::default();
    pool.add_static(worker(
        &registry,
        "s",
        WorkerKind::Static,
        ResBuilder::default().cpus(4).finish(),
    ));
    pool.add_dynamic(worker(
        &registry,
        "d",
        WorkerKind::Dynamic,
        ResBuilder::default().cpus(2).finish(),
    ));
    let slots = pool.core_slots(2);
    assert_eq!(slots.to_vec(), vec![6, 3]);
}

#[test]
fn test_alternative_implementation_keeps_core_executable() {
    let env = TestEnv::new();
    let f = env.core(
        "f",
        &[
            ResBuilder::default().cpus(2).finish(),
            ResBuilder::default().cpus(4).finish(),
        ],
    );
    env.add_dynamic("w4", ResBuilder::default().cpus(4).finish());
    assert!(env.manager.executable_cores("w4").contains(&f));
    assert_eq!(env.manager.available_slots(), vec![2]);

    env.add_dynamic("w6", ResBuilder::default().cpus(6).finish());
    assert_eq!(names(env.manager.critical_workers()), vec!["w4"]);
    env.manager.remove_worker("w4");

    assert!(env.manager.executable_cores("w6").contains(&f));
    assert_eq!(names(env.manager.critical_workers()), vec!["w6"]);
    assert_eq!(env.manager.available_slots(), vec![3]);
    let executable = env
        .registry
        .find_executable_cores(&ResBuilder::default().cpus(6).finish());
    assert_eq!(executable.len(), 1);
}

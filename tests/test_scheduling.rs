use perf_sim_core::api::simulation_dto::architecture_dto::ArchitectureDto;
use perf_sim_core::domain::architecture::architecture_model::ArchitectureModel;
use perf_sim_core::domain::architecture::static_architecture::StaticArchitecture;
use perf_sim_core::domain::resource::job::{Job, JobId, RequesterId};
use perf_sim_core::domain::resource::resource::{ActiveResourceKey, ResourceKind, ResourceRef};
use perf_sim_core::domain::resource::resource_registry::ResourceRegistry;
use perf_sim_core::domain::resource::scheduling_policy::SchedulingPolicy;
use perf_sim_core::domain::utils::id::{ContainerId, ResourceId, ResourceTypeId};
use perf_sim_core::error::{ConfigurationError, Error};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn server_room() -> StaticArchitecture {
    let json = r#"{
        "resourceContainers": [
            { "id": "fcfs-node", "activeResources": [ { "id": "fcfs-cpu", "resourceType": "CPU", "schedulingPolicy": "FCFS", "capacity": 1 } ] },
            { "id": "ps-node", "activeResources": [ { "id": "ps-cpu", "resourceType": "CPU", "schedulingPolicy": "PS", "capacity": 2 } ] },
            { "id": "delay-node", "activeResources": [ { "id": "think", "resourceType": "CPU", "schedulingPolicy": "DELAY", "capacity": 1 } ] },
            { "id": "odd-node", "activeResources": [ { "id": "odd-cpu", "resourceType": "CPU", "schedulingPolicy": "LOTTERY", "capacity": 1 } ],
              "passiveResources": [ { "id": "odd-pool", "capacity": 4 } ] }
        ],
        "components": [],
        "allocation": []
    }"#;

    let dto: ArchitectureDto = serde_json::from_str(json).unwrap();
    StaticArchitecture::try_from(dto).unwrap()
}

fn key(container: &str) -> ActiveResourceKey {
    ActiveResourceKey::new(ContainerId::new(container), ResourceTypeId::new("CPU"))
}

fn job(id: u64, demand: f64, arrival: f64) -> Job {
    Job::new(JobId(id), RequesterId(id), demand, arrival)
}

#[test]
fn test_registry_is_built_from_descriptors() {
    let architecture = server_room();
    let registry = ResourceRegistry::from_architecture(&architecture).unwrap();

    assert_eq!(registry.len(), architecture.resource_descriptors().len());
    assert_eq!(registry.kind_of(&ResourceId::new("odd-pool")), Some(ResourceKind::Passive));

    let odd = registry.lookup_by_compound_key(&ContainerId::new("odd-node"), &ResourceTypeId::new("CPU")).unwrap();
    assert_eq!(odd.policy(), SchedulingPolicy::Default);

    match registry.lookup(&ResourceId::new("ps-cpu")) {
        Some(ResourceRef::Active(active)) => assert_eq!(active.policy(), SchedulingPolicy::ProcessorSharing),
        other => panic!("expected an active resource, got {:?}", other.map(|r| r.kind())),
    }
}

#[test]
fn test_fcfs_completion_order_follows_arrivals() {
    let mut registry = ResourceRegistry::from_architecture(&server_room()).unwrap();

    assert!(approx(registry.submit_job(&key("fcfs-node"), job(1, 5.0, 0.0)).unwrap(), 5.0));
    assert!(approx(registry.submit_job(&key("fcfs-node"), job(2, 2.0, 1.0)).unwrap(), 7.0));

    assert!(registry.advance_resource(&key("fcfs-node"), 4.0).unwrap().is_empty());
    let done = registry.advance_resource(&key("fcfs-node"), 7.0).unwrap();
    assert_eq!(done.iter().map(|job| (job.id, job.response_time())).collect::<Vec<_>>(), vec![(JobId(1), Some(5.0)), (JobId(2), Some(6.0))]);
}

#[test]
fn test_processor_sharing_slows_down_on_arrival() {
    let mut registry = ResourceRegistry::from_architecture(&server_room()).unwrap();
    let ps = key("ps-node");

    registry.submit_job(&ps, job(1, 4.0, 0.0)).unwrap();
    registry.submit_job(&ps, job(2, 4.0, 0.0)).unwrap();
    let projected = registry.active_by_key(&ps).unwrap().projected_completions();
    assert!(projected.iter().all(|(_, at)| approx(*at, 4.0)));

    registry.submit_job(&ps, job(3, 4.0, 2.0)).unwrap();
    // 2 + 2 left of the first two jobs plus the new 4.
    assert!(approx(registry.active_by_key(&ps).unwrap().outstanding_shared_work(), 8.0));
    let projected = registry.active_by_key(&ps).unwrap().projected_completions();
    let times: Vec<f64> = projected.iter().map(|(_, at)| *at).collect();
    assert_eq!(times.len(), 3);
    assert!(approx(times[0], 5.0) && approx(times[1], 5.0) && approx(times[2], 6.0));

    let done = registry.advance_resource(&ps, 6.0).unwrap();
    assert_eq!(done.iter().map(|job| job.id).collect::<Vec<_>>(), vec![JobId(1), JobId(2), JobId(3)]);
    assert_eq!(registry.active_by_key(&ps).unwrap().outstanding_shared_work(), 0.0);
}

#[test]
fn test_delay_and_default_ignore_each_other() {
    let mut registry = ResourceRegistry::from_architecture(&server_room()).unwrap();

    for (id, container) in ["delay-node", "odd-node"].into_iter().enumerate() {
        let first = registry.submit_job(&key(container), job(10 + id as u64, 3.0, 0.0)).unwrap();
        let second = registry.submit_job(&key(container), job(20 + id as u64, 3.0, 0.0)).unwrap();
        assert!(approx(first, 3.0) && approx(second, 3.0));
    }
}

#[test]
fn test_bad_demands_are_rejected() {
    let mut registry = ResourceRegistry::from_architecture(&server_room()).unwrap();

    let result = registry.submit_job(&key("fcfs-node"), job(1, -1.0, 0.0));
    assert!(matches!(result, Err(Error::Configuration(ConfigurationError::InvalidDemand { .. }))));

    registry.submit_job(&key("fcfs-node"), job(2, 1.0, 3.0)).unwrap();
    let result = registry.submit_job(&key("fcfs-node"), job(3, 1.0, 1.0));
    assert!(result.unwrap_err().is_consistency_violation());
}

#[test]
fn test_zero_capacity_in_description_is_rejected() {
    let json = r#"{
        "resourceContainers": [ { "id": "n", "activeResources": [ { "id": "cpu", "resourceType": "CPU", "schedulingPolicy": "FCFS", "capacity": 0 } ] } ],
        "components": [],
        "allocation": []
    }"#;
    let architecture = StaticArchitecture::try_from(serde_json::from_str::<ArchitectureDto>(json).unwrap()).unwrap();

    let result = ResourceRegistry::from_architecture(&architecture);
    assert!(matches!(result, Err(Error::Configuration(ConfigurationError::InvalidCapacity { .. }))));
}

#[test]
fn test_clear_all_jobs_empties_every_table() {
    let mut registry = ResourceRegistry::from_architecture(&server_room()).unwrap();
    registry.submit_job(&key("fcfs-node"), job(1, 5.0, 0.0)).unwrap();
    registry.submit_job(&key("ps-node"), job(2, 5.0, 0.0)).unwrap();
    registry.acquire(&ResourceId::new("odd-pool"), RequesterId(1), 4).unwrap();
    registry.acquire(&ResourceId::new("odd-pool"), RequesterId(2), 1).unwrap();

    for _ in 0..2 {
        registry.clear_all_jobs();
        assert!(registry.active_resources().all(|active| active.in_flight_jobs() == 0));
        assert!(registry.passive_resources().all(|pool| pool.queue_length() == 0 && pool.currently_available() == Some(4)));
    }
}

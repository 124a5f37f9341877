use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureDto {
    pub resource_containers: Vec<ResourceContainerDto>,
    #[serde(default)]
    pub linking_resources: Vec<LinkingResourceDto>,
    pub components: Vec<ComponentDto>,
    pub allocation: Vec<AllocationDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContainerDto {
    pub id: String,
    #[serde(default)]
    pub active_resources: Vec<ActiveResourceDto>,
    #[serde(default)]
    pub passive_resources: Vec<PassiveResourceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveResourceDto {
    pub id: String,
    pub name: Option<String>,
    pub resource_type: String,
    #[serde(default)]
    pub scheduling_policy: String,
    /// Missing means unbounded.
    pub capacity: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveResourceDto {
    pub id: String,
    pub name: Option<String>,
    pub capacity: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingResourceDto {
    pub id: String,
    pub name: Option<String>,
    pub connects: Vec<String>,
    #[serde(default)]
    pub latency: f64,
    /// Bytes per time unit; missing means latency only.
    pub throughput: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDto {
    pub id: String,
    pub provided_role: String,
    pub operations: Vec<OperationDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDto {
    pub signature: String,
    #[serde(default)]
    pub steps: Vec<ServiceStepDto>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServiceStepDto {
    Demand { resource_type: String, amount: f64 },
    Acquire { passive_resource: String, amount: u64 },
    Release { passive_resource: String, amount: u64 },
    Call { component: String, signature: String, payload_bytes: Option<f64> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDto {
    pub component: String,
    pub container: String,
}

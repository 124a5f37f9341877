use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageScenarioDto {
    pub id: String,
    pub root_behavior: String,
    pub workload: WorkloadDto,
    pub behaviors: Vec<BehaviorDto>,
    pub tick_interval: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkloadDto {
    Closed { population: u32, think_time: f64 },
    Open { inter_arrival: InterArrivalDto, evolution_interval: Option<f64> },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "distribution", rename_all = "camelCase")]
pub enum InterArrivalDto {
    Fixed { delay: f64 },
    Exponential { mean: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorDto {
    pub id: String,
    pub actions: Vec<ActionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    pub id: String,
    pub successor: Option<String>,
    #[serde(flatten)]
    pub kind: ActionKindDto,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActionKindDto {
    Start,
    Stop,
    Delay { duration: f64 },
    SystemCall { component: String, signature: String, payload_bytes: Option<f64> },
    Loop { body: String, iterations: i64 },
    Branch { transitions: Vec<BranchTransitionDto> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchTransitionDto {
    pub probability: f64,
    pub body: String,
}

use std::collections::HashMap;

use crate::api::simulation_dto::usage_dto::{ActionDto, ActionKindDto, BehaviorDto, InterArrivalDto, UsageScenarioDto, WorkloadDto};
use crate::domain::simulator::clock::SimTime;
use crate::domain::utils::id::{ActionId, BehaviorId, ComponentId, ScenarioId, SignatureId};
use crate::error::{ConfigurationError, ConversionError, Error};

/// Tolerance for branch probabilities summing up to one.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct BranchTransition {
    pub probability: f64,
    pub body: BehaviorId,
}

/// One step of a user's behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioAction {
    Start { successor: ActionId },
    Stop,
    Delay { duration: SimTime, successor: ActionId },
    SystemCall { component: ComponentId, signature: SignatureId, payload_bytes: f64, successor: ActionId },
    Loop { body: BehaviorId, iterations: i64, successor: ActionId },
    Branch { transitions: Vec<BranchTransition>, successor: ActionId },
}

impl ScenarioAction {
    pub fn successor(&self) -> Option<&ActionId> {
        match self {
            ScenarioAction::Stop => None,
            ScenarioAction::Start { successor }
            | ScenarioAction::Delay { successor, .. }
            | ScenarioAction::SystemCall { successor, .. }
            | ScenarioAction::Loop { successor, .. }
            | ScenarioAction::Branch { successor, .. } => Some(successor),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioBehavior {
    pub id: BehaviorId,

    /// The start action of the behavior.
    pub entry: ActionId,
    pub actions: Vec<ActionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterArrival {
    Fixed(SimTime),
    Exponential { mean: SimTime },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Workload {
    /// A fixed number of users, each restarting after `think_time`.
    Closed { population: u32, think_time: SimTime },

    /// Users arrive independently of each other.
    Open { inter_arrival: InterArrival, evolution_interval: Option<SimTime> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageScenario {
    pub id: ScenarioId,
    pub root_behavior: BehaviorId,
    pub workload: Workload,
    pub tick_interval: Option<SimTime>,
}

/// Immutable description of how users behave. Action ids are unique model-wide.
#[derive(Debug, Clone, Default)]
pub struct UsageModel {
    scenarios: Vec<UsageScenario>,
    behaviors: HashMap<BehaviorId, ScenarioBehavior>,
    actions: HashMap<ActionId, ScenarioAction>,
}

impl UsageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_behavior(&mut self, id: BehaviorId, actions: Vec<(ActionId, ScenarioAction)>) -> Result<(), Error> {
        if self.behaviors.contains_key(&id) {
            return Err(ConversionError::DuplicateIdentifier(id.to_string()).into());
        }

        let starts: Vec<&ActionId> = actions.iter().filter(|(_, action)| matches!(action, ScenarioAction::Start { .. })).map(|(id, _)| id).collect();
        let [entry] = starts.as_slice() else {
            return Err(ConfigurationError::InvalidUsageModel(format!("Behavior '{}' must have exactly one start action, found {}", id, starts.len())).into());
        };
        let entry = (*entry).clone();

        let mut action_ids = Vec::with_capacity(actions.len());
        for (action_id, action) in actions {
            if self.actions.contains_key(&action_id) {
                return Err(ConversionError::DuplicateIdentifier(action_id.to_string()).into());
            }
            action_ids.push(action_id.clone());
            self.actions.insert(action_id, action);
        }

        self.behaviors.insert(id.clone(), ScenarioBehavior { id, entry, actions: action_ids });
        Ok(())
    }

    pub fn add_scenario(&mut self, scenario: UsageScenario) -> Result<(), Error> {
        if self.scenarios.iter().any(|existing| existing.id == scenario.id) {
            return Err(ConversionError::DuplicateIdentifier(scenario.id.to_string()).into());
        }
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn scenarios(&self) -> &[UsageScenario] {
        &self.scenarios
    }

    pub fn scenario(&self, id: &ScenarioId) -> Result<&UsageScenario, ConfigurationError> {
        self.scenarios.iter().find(|scenario| &scenario.id == id).ok_or_else(|| ConfigurationError::UnknownScenario(id.to_string()))
    }

    pub fn behavior(&self, id: &BehaviorId) -> Result<&ScenarioBehavior, ConfigurationError> {
        self.behaviors.get(id).ok_or_else(|| ConfigurationError::UnknownBehavior(id.to_string()))
    }

    pub fn action(&self, id: &ActionId) -> Result<&ScenarioAction, ConfigurationError> {
        self.actions.get(id).ok_or_else(|| ConfigurationError::UnknownAction(id.to_string()))
    }

    pub fn actions(&self) -> impl Iterator<Item = (&ActionId, &ScenarioAction)> {
        self.actions.iter()
    }

    /// Checks every cross reference and numeric bound of the model.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for scenario in &self.scenarios {
            self.behavior(&scenario.root_behavior)?;
            validate_workload(scenario)?;
        }

        for (id, action) in &self.actions {
            if let Some(successor) = action.successor() {
                self.action(successor)?;
            }

            match action {
                ScenarioAction::Delay { duration, .. } if !duration.is_finite() || *duration < 0.0 => {
                    return Err(invalid(format!("Delay '{}' has invalid duration {}", id, duration)));
                }
                ScenarioAction::SystemCall { payload_bytes, .. } if !payload_bytes.is_finite() || *payload_bytes < 0.0 => {
                    return Err(invalid(format!("System call '{}' has invalid payload {}", id, payload_bytes)));
                }
                ScenarioAction::Loop { body, iterations, .. } => {
                    self.behavior(body)?;
                    if *iterations < 0 {
                        return Err(ConfigurationError::InvalidLoopBounds { maximal_loop_count: *iterations, initial_progression: 0 });
                    }
                }
                ScenarioAction::Branch { transitions, .. } => {
                    if transitions.is_empty() {
                        return Err(invalid(format!("Branch '{}' has no transitions", id)));
                    }
                    for transition in transitions {
                        self.behavior(&transition.body)?;
                        if !(0.0..=1.0).contains(&transition.probability) {
                            return Err(invalid(format!("Branch '{}' has probability {} outside [0, 1]", id, transition.probability)));
                        }
                    }
                    let total: f64 = transitions.iter().map(|t| t.probability).sum();
                    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
                        return Err(invalid(format!("Branch '{}' probabilities sum to {}", id, total)));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> ConfigurationError {
    ConfigurationError::InvalidUsageModel(message)
}

fn validate_workload(scenario: &UsageScenario) -> Result<(), ConfigurationError> {
    let positive = |value: f64| value.is_finite() && value > 0.0;

    match &scenario.workload {
        Workload::Closed { think_time, .. } if !think_time.is_finite() || *think_time < 0.0 => {
            Err(invalid(format!("Scenario '{}' has invalid think time {}", scenario.id, think_time)))
        }
        Workload::Open { inter_arrival: InterArrival::Fixed(delay), .. } if !positive(*delay) => {
            Err(invalid(format!("Scenario '{}' has non-positive inter-arrival time {}", scenario.id, delay)))
        }
        Workload::Open { inter_arrival: InterArrival::Exponential { mean }, .. } if !positive(*mean) => {
            Err(invalid(format!("Scenario '{}' has non-positive mean inter-arrival time {}", scenario.id, mean)))
        }
        Workload::Open { evolution_interval: Some(interval), .. } if !positive(*interval) => {
            Err(invalid(format!("Scenario '{}' has non-positive evolution interval {}", scenario.id, interval)))
        }
        _ => match scenario.tick_interval {
            Some(interval) if !positive(interval) => Err(invalid(format!("Scenario '{}' has non-positive tick interval {}", scenario.id, interval))),
            _ => Ok(()),
        },
    }
}

fn convert_action(behavior: &BehaviorId, dto: ActionDto) -> Result<(ActionId, ScenarioAction), Error> {
    if dto.id.trim().is_empty() {
        return Err(ConversionError::EmptyIdentifier("action id").into());
    }

    let id = ActionId::new(dto.id);
    let successor = || {
        dto.successor
            .clone()
            .map(ActionId::new)
            .ok_or_else(|| Error::from(invalid(format!("Action '{}' in behavior '{}' needs a successor", id, behavior))))
    };

    let action = match dto.kind {
        ActionKindDto::Start => ScenarioAction::Start { successor: successor()? },
        ActionKindDto::Stop => ScenarioAction::Stop,
        ActionKindDto::Delay { duration } => ScenarioAction::Delay { duration, successor: successor()? },
        ActionKindDto::SystemCall { component, signature, payload_bytes } => ScenarioAction::SystemCall {
            component: ComponentId::new(component),
            signature: SignatureId::new(signature),
            payload_bytes: payload_bytes.unwrap_or(0.0),
            successor: successor()?,
        },
        ActionKindDto::Loop { body, iterations } => ScenarioAction::Loop { body: BehaviorId::new(body), iterations, successor: successor()? },
        ActionKindDto::Branch { transitions } => ScenarioAction::Branch {
            transitions: transitions.into_iter().map(|t| BranchTransition { probability: t.probability, body: BehaviorId::new(t.body) }).collect(),
            successor: successor()?,
        },
    };

    Ok((id, action))
}

fn convert_behavior(model: &mut UsageModel, dto: BehaviorDto) -> Result<(), Error> {
    if dto.id.trim().is_empty() {
        return Err(ConversionError::EmptyIdentifier("behavior id").into());
    }

    let id = BehaviorId::new(dto.id);
    let actions = dto.actions.into_iter().map(|action| convert_action(&id, action)).collect::<Result<Vec<_>, Error>>()?;
    model.add_behavior(id, actions)
}

impl From<WorkloadDto> for Workload {
    fn from(dto: WorkloadDto) -> Self {
        match dto {
            WorkloadDto::Closed { population, think_time } => Workload::Closed { population, think_time },
            WorkloadDto::Open { inter_arrival, evolution_interval } => {
                let inter_arrival = match inter_arrival {
                    InterArrivalDto::Fixed { delay } => InterArrival::Fixed(delay),
                    InterArrivalDto::Exponential { mean } => InterArrival::Exponential { mean },
                };
                Workload::Open { inter_arrival, evolution_interval }
            }
        }
    }
}

impl TryFrom<Vec<UsageScenarioDto>> for UsageModel {
    type Error = Error;

    fn try_from(dtos: Vec<UsageScenarioDto>) -> Result<Self, Self::Error> {
        let mut model = UsageModel::new();

        for dto in dtos {
            if dto.id.trim().is_empty() {
                return Err(ConversionError::EmptyIdentifier("scenario id").into());
            }

            for behavior in dto.behaviors {
                convert_behavior(&mut model, behavior)?;
            }

            model.add_scenario(UsageScenario {
                id: ScenarioId::new(dto.id),
                root_behavior: BehaviorId::new(dto.root_behavior),
                workload: Workload::from(dto.workload),
                tick_interval: dto.tick_interval,
            })?;
        }

        model.validate()?;
        log::info!("Usage model with {} scenario(s), {} behavior(s) and {} action(s) loaded.", model.scenarios.len(), model.behaviors.len(), model.actions.len());
        Ok(model)
    }
}

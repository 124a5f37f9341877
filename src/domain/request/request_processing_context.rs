use serde::Serialize;

use crate::domain::utils::id::{ComponentId, LocationId, RoleId, ScenarioId, SignatureId, UserId};
use crate::error::ConfigurationError;

/// The system call a user issued, as it travels through the architecture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRequest {
    pub user: UserId,
    pub scenario: ScenarioId,
    pub component: ComponentId,
    pub signature: SignatureId,
    pub payload_bytes: f64,
}

impl UserRequest {
    pub fn new(user: UserId, scenario: ScenarioId, component: ComponentId, signature: SignatureId, payload_bytes: f64) -> Self {
        Self { user, scenario, component, signature, payload_bytes }
    }
}

/// One operation being interpreted: which step of which service runs where.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceFrame {
    pub component: ComponentId,
    pub signature: SignatureId,
    pub location: LocationId,

    /// Index of the next step to interpret.
    pub step: usize,
}

impl ServiceFrame {
    pub fn new(component: ComponentId, signature: SignatureId, location: LocationId) -> Self {
        Self { component, signature, location, step: 0 }
    }
}

/// Call stack of the services executed on behalf of one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpretationContext {
    frames: Vec<ServiceFrame>,
}

impl InterpretationContext {
    pub fn new(entry: ServiceFrame) -> Self {
        Self { frames: vec![entry] }
    }

    pub fn current(&self) -> Option<&ServiceFrame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ServiceFrame> {
        self.frames.last_mut()
    }

    pub fn call(&mut self, frame: ServiceFrame) {
        self.frames.push(frame);
    }

    /// Leaves the current service; returns the frame that completed.
    pub fn return_from_call(&mut self) -> Option<ServiceFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Everything needed to interpret a request: who sent it, which provided role and
/// location serve it, and how far the interpretation has come.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestProcessingContext {
    request: UserRequest,
    user: UserId,
    role: RoleId,
    location: LocationId,
    interpretation: InterpretationContext,
}

impl RequestProcessingContext {
    pub fn new(request: UserRequest, role: RoleId, location: LocationId, interpretation: InterpretationContext) -> Result<Self, ConfigurationError> {
        if role.is_empty() {
            return Err(ConfigurationError::MissingContextField("provided role"));
        }
        if location.is_empty() {
            return Err(ConfigurationError::MissingContextField("deployment location"));
        }
        if interpretation.is_finished() {
            return Err(ConfigurationError::MissingContextField("interpretation context"));
        }

        let user = request.user;
        Ok(Self { request, user, role, location, interpretation })
    }

    pub fn request(&self) -> &UserRequest {
        &self.request
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn role(&self) -> &RoleId {
        &self.role
    }

    /// Location hosting the component that received the request.
    pub fn location(&self) -> &LocationId {
        &self.location
    }

    pub fn interpretation(&self) -> &InterpretationContext {
        &self.interpretation
    }

    pub fn interpretation_mut(&mut self) -> &mut InterpretationContext {
        &mut self.interpretation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UserRequest {
        UserRequest::new(UserId(9), ScenarioId::new("s"), ComponentId::new("Shop"), SignatureId::new("buy"), 0.0)
    }

    #[test]
    fn test_context_requires_interpretation() {
        let result = RequestProcessingContext::new(request(), RoleId::new("IShop"), LocationId::new("A"), InterpretationContext::default());
        assert_eq!(result, Err(ConfigurationError::MissingContextField("interpretation context")));
    }

    #[test]
    fn test_nested_calls_return_in_order() {
        let entry = ServiceFrame::new(ComponentId::new("Shop"), SignatureId::new("buy"), LocationId::new("A"));
        let mut context = RequestProcessingContext::new(request(), RoleId::new("IShop"), LocationId::new("A"), InterpretationContext::new(entry)).unwrap();
        assert_eq!(context.user(), UserId(9));

        context.interpretation_mut().call(ServiceFrame::new(ComponentId::new("Db"), SignatureId::new("query"), LocationId::new("B")));
        assert_eq!(context.interpretation().depth(), 2);

        let returned = context.interpretation_mut().return_from_call().unwrap();
        assert_eq!(returned.component, ComponentId::new("Db"));
        assert_eq!(context.interpretation().current().unwrap().location, LocationId::new("A"));
        assert!(!context.interpretation().is_finished());

        context.interpretation_mut().return_from_call().unwrap();
        assert!(context.interpretation().is_finished());
        assert!(context.interpretation().current().is_none());
    }
}

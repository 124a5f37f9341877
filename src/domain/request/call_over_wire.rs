use serde::Serialize;
use uuid::Uuid;

use crate::domain::request::request_processing_context::UserRequest;
use crate::domain::utils::id::{LocationId, SignatureId, UserId};
use crate::error::ConfigurationError;

/// A synchronous call leaving one deployment location for another.
///
/// Built once per call and immutable afterwards; construction rejects a call without
/// destination, signature or originating user instead of letting it fail later.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallOverWireRequest {
    id: Uuid,
    from: LocationId,
    to: LocationId,
    signature: SignatureId,
    user: UserId,
    request: UserRequest,
}

impl CallOverWireRequest {
    pub fn new(
        from: LocationId,
        to: Option<LocationId>,
        signature: Option<SignatureId>,
        user: Option<UserId>,
        request: UserRequest,
    ) -> Result<Self, ConfigurationError> {
        if from.is_empty() {
            return Err(ConfigurationError::MissingCallField("source location"));
        }

        let to = to.filter(|location| !location.is_empty()).ok_or(ConfigurationError::MissingCallField("destination location"))?;
        let signature = signature.filter(|signature| !signature.is_empty()).ok_or(ConfigurationError::MissingCallField("operation signature"))?;
        let user = user.ok_or(ConfigurationError::MissingCallField("originating user"))?;

        Ok(Self { id: Uuid::new_v4(), from, to, signature, user, request })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn from(&self) -> &LocationId {
        &self.from
    }

    pub fn to(&self) -> &LocationId {
        &self.to
    }

    pub fn signature(&self) -> &SignatureId {
        &self.signature
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn request(&self) -> &UserRequest {
        &self.request
    }
}

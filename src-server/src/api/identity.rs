//! Caller identity as asserted by the upstream identity provider.

use axum::http::HeaderMap;
use cir_core::domain::Incident;

use crate::api::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const STAFF_ROLE: &str = "admin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub is_staff: bool,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            user_id: header(USER_ID_HEADER),
            is_staff: header(USER_ROLE_HEADER)
                .map(|role| role.eq_ignore_ascii_case(STAFF_ROLE))
                .unwrap_or(false),
        }
    }

    pub fn require_user(&self) -> Result<&str, ApiError> {
        self.user_id.as_deref().ok_or_else(ApiError::auth_required)
    }

    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Staff see everything; users see only named reports they filed.
    pub fn can_view(&self, incident: &Incident) -> bool {
        if self.is_staff {
            return true;
        }
        match (&self.user_id, &incident.created_by_user_id) {
            (Some(me), Some(owner)) => !incident.is_anonymous && me == owner,
            _ => false,
        }
    }
}

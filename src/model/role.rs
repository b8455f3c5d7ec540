use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Identity role carried in the access token.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    SuperAdmin,
    CourseAdmin,
    AdminPersonnel,
    Tutor,
    Peon,
    Technical,
    Accounts,
    Student,
}

/// Roles that may file a leave request.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RequesterRole {
    Tutor,
    Peon,
    Technical,
    AdminPersonnel,
}

impl Role {
    pub fn as_requester(self) -> Option<RequesterRole> {
        match self {
            Role::Tutor => Some(RequesterRole::Tutor),
            Role::Peon => Some(RequesterRole::Peon),
            Role::Technical => Some(RequesterRole::Technical),
            Role::AdminPersonnel => Some(RequesterRole::AdminPersonnel),
            _ => None,
        }
    }

    /// True for every role that shows up as an approver in the routing table.
    pub fn is_approver(self) -> bool {
        matches!(
            self,
            Role::SuperAdmin | Role::CourseAdmin | Role::AdminPersonnel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snake_case_names() {
        assert_eq!("course_admin".parse::<Role>().unwrap(), Role::CourseAdmin);
        assert_eq!("Super_Admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(Role::AdminPersonnel.to_string(), "admin_personnel");
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn only_staff_roles_can_request_leave() {
        assert_eq!(Role::Tutor.as_requester(), Some(RequesterRole::Tutor));
        assert_eq!(
            Role::AdminPersonnel.as_requester(),
            Some(RequesterRole::AdminPersonnel)
        );
        assert_eq!(Role::Student.as_requester(), None);
        assert_eq!(Role::SuperAdmin.as_requester(), None);
    }
}

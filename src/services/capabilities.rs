//! Servicio de autorización
//!
//! Único punto donde se decide si un rol puede realizar una acción. Las
//! comprobaciones de propiedad (mismo tenant, mismo conductor) las hacen
//! los servicios con los datos concretos.

use uuid::Uuid;

use crate::models::auth::{Caller, UserRole};
use crate::utils::errors::{forbidden_error, validation_error, AppResult};

/// Acciones del sistema sujetas a autorización
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewRoutes,
    ManageRoutes,
    StartTrip,
    AdvanceTrip,
    CompleteTrip,
    WatchTrip,
    ProvisionUsers,
    SendNotifications,
    ManageSchools,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ViewRoutes => "view routes",
            Action::ManageRoutes => "manage routes",
            Action::StartTrip => "start a trip",
            Action::AdvanceTrip => "advance a trip",
            Action::CompleteTrip => "complete a trip",
            Action::WatchTrip => "watch a trip",
            Action::ProvisionUsers => "provision users",
            Action::SendNotifications => "send notifications",
            Action::ManageSchools => "manage schools",
        }
    }
}

/// Verifica si un rol puede realizar una acción
pub fn is_allowed(role: UserRole, action: Action) -> bool {
    use UserRole::*;

    match action {
        Action::ViewRoutes | Action::WatchTrip => true,
        Action::ManageRoutes | Action::ProvisionUsers | Action::SendNotifications => {
            matches!(role, SuperAdmin | Admin)
        }
        Action::StartTrip | Action::AdvanceTrip | Action::CompleteTrip => role == Driver,
        Action::ManageSchools => role == SuperAdmin,
    }
}

/// Igual que `is_allowed` pero devuelve `Forbidden` para propagar con `?`
pub fn require(caller: &Caller, action: Action) -> AppResult<()> {
    if is_allowed(caller.role, action) {
        Ok(())
    } else {
        Err(forbidden_error(
            action.as_str(),
            &format!("role '{}' is not allowed", caller.role.as_str()),
        ))
    }
}

/// Tenant sobre el que opera el llamante.
///
/// Un super admin puede elegir cualquiera (o usar el suyo); el resto queda
/// fijado a su propio tenant y no puede pedir otro.
pub fn resolve_tenant(caller: &Caller, requested: Option<Uuid>) -> AppResult<Uuid> {
    if caller.is_super_admin() {
        return requested
            .or(caller.tenant_id)
            .ok_or_else(|| validation_error("tenant_id is required"));
    }

    let own = caller
        .tenant_id
        .ok_or_else(|| forbidden_error("access tenant data", "caller has no school"))?;

    match requested {
        Some(other) if other != own => Err(forbidden_error(
            "access tenant data",
            "callers may only act within their own school",
        )),
        _ => Ok(own),
    }
}

/// Un llamante no super admin solo puede crear roles por debajo del suyo
pub fn can_assign_role(requester: UserRole, target: UserRole) -> bool {
    if !is_allowed(requester, Action::ProvisionUsers) {
        return false;
    }
    requester == UserRole::SuperAdmin || target.level() < requester.level()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_drivers_move_trips() {
        for action in [Action::StartTrip, Action::AdvanceTrip, Action::CompleteTrip] {
            assert!(is_allowed(UserRole::Driver, action));
            assert!(!is_allowed(UserRole::Parent, action));
            assert!(!is_allowed(UserRole::Admin, action));
        }
    }

    #[test]
    fn test_everyone_can_watch() {
        for role in [
            UserRole::SuperAdmin,
            UserRole::Admin,
            UserRole::Teacher,
            UserRole::Student,
            UserRole::Driver,
            UserRole::Parent,
        ] {
            assert!(is_allowed(role, Action::WatchTrip));
            assert!(is_allowed(role, Action::ViewRoutes));
        }
    }

    #[test]
    fn test_route_management_is_admin_only() {
        assert!(is_allowed(UserRole::Admin, Action::ManageRoutes));
        assert!(is_allowed(UserRole::SuperAdmin, Action::ManageRoutes));
        assert!(!is_allowed(UserRole::Driver, Action::ManageRoutes));
        assert!(!is_allowed(UserRole::Admin, Action::ManageSchools));
    }

    #[test]
    fn test_role_assignment_levels() {
        assert!(can_assign_role(UserRole::SuperAdmin, UserRole::SuperAdmin));
        assert!(can_assign_role(UserRole::SuperAdmin, UserRole::Admin));
        assert!(can_assign_role(UserRole::Admin, UserRole::Driver));
        assert!(can_assign_role(UserRole::Admin, UserRole::Parent));
        assert!(!can_assign_role(UserRole::Admin, UserRole::Admin));
        assert!(!can_assign_role(UserRole::Admin, UserRole::SuperAdmin));
        assert!(!can_assign_role(UserRole::Teacher, UserRole::Student));
    }

    #[test]
    fn test_resolve_tenant() {
        let school = Uuid::new_v4();
        let other = Uuid::new_v4();

        let admin = Caller::new(Uuid::new_v4(), UserRole::Admin, Some(school));
        assert_eq!(resolve_tenant(&admin, None).unwrap(), school);
        assert_eq!(resolve_tenant(&admin, Some(school)).unwrap(), school);
        assert!(resolve_tenant(&admin, Some(other)).is_err());

        let root = Caller::new(Uuid::new_v4(), UserRole::SuperAdmin, None);
        assert_eq!(resolve_tenant(&root, Some(other)).unwrap(), other);
        assert!(resolve_tenant(&root, None).is_err());

        let orphan = Caller::new(Uuid::new_v4(), UserRole::Parent, None);
        assert!(resolve_tenant(&orphan, None).is_err());
    }

    #[test]
    fn test_require_returns_forbidden() {
        let caller = Caller::new(Uuid::new_v4(), UserRole::Parent, None);
        assert!(require(&caller, Action::WatchTrip).is_ok());
        let err = require(&caller, Action::StartTrip).unwrap_err();
        assert!(err.to_string().contains("start a trip"));
    }
}

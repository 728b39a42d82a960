use std::sync::Arc;

use uuid::Uuid;

use schools24_transport::config::EnvironmentConfig;
use schools24_transport::models::auth::{Caller, LoginRequest, UserRole};
use schools24_transport::models::route::{CreateRouteRequest, StopInput, UpdateRouteRequest};
use schools24_transport::models::school::{CreateSchoolRequest, TenantLocks};
use schools24_transport::models::user::CreateUserRequest;
use schools24_transport::repositories::{DirectoryStore, MemoryStore};
use schools24_transport::services::LogDispatcher;
use schools24_transport::utils::errors::AppError;
use schools24_transport::{AppState, Stores};

const TEMP_PASSWORD: &str = "Welcome#2024";

struct Fixture {
    store: Arc<MemoryStore>,
    state: AppState,
    root: Caller,
    school: Uuid,
    admin: Caller,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let config = EnvironmentConfig {
        default_user_password: Some(TEMP_PASSWORD.to_string()),
        route_list_limit: 2,
        password_hash_cost: 4,
        ..EnvironmentConfig::default()
    };
    let state = AppState::new(config, Stores::memory(store.clone()), Arc::new(LogDispatcher));

    let root = Caller::new(Uuid::new_v4(), UserRole::SuperAdmin, None);
    let school = state
        .schools
        .create_school(&root, CreateSchoolRequest { name: "Greenwood High".into() })
        .await
        .unwrap()
        .id;

    Fixture {
        store,
        state,
        root,
        school,
        admin: Caller::new(Uuid::new_v4(), UserRole::Admin, Some(school)),
    }
}

fn user(email: &str, role: &str, tenant_id: Option<Uuid>) -> CreateUserRequest {
    CreateUserRequest {
        name: None,
        email: email.to_string(),
        role: role.to_string(),
        tenant_id,
    }
}

fn route_request(name: &str) -> CreateRouteRequest {
    CreateRouteRequest {
        name: name.to_string(),
        driver_id: None,
        driver_name: None,
        vehicle_no: None,
        stops: vec![StopInput {
            name: "Gate".to_string(),
            lat: Some(12.97),
            lng: Some(77.59),
            arrival_time: Some("07:30".to_string()),
        }],
        tenant_id: None,
    }
}

#[tokio::test]
async fn test_admin_provisions_driver_in_own_school() {
    let f = fixture().await;

    let created = f
        .state
        .users
        .create_user(&f.admin, user("  Ravi.Driver@School.TEST ", "driver", None))
        .await
        .unwrap();

    assert_eq!(created.email, "ravi.driver@school.test");
    assert_eq!(created.role, UserRole::Driver);
    assert_eq!(created.tenant_id, Some(f.school));
    assert_eq!(created.temp_password, TEMP_PASSWORD);

    let profile = f.store.find_profile(created.uid).await.unwrap().unwrap();
    assert!(profile.must_change_password);
    assert_eq!(profile.created_by, Some(f.admin.uid));
    assert_eq!(profile.display_name, "ravi.driver");

    let login = f
        .state
        .auth
        .login(LoginRequest {
            email: "ravi.driver@school.test".to_string(),
            password: TEMP_PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(login.uid, created.uid);
    assert!(login.must_change_password);
}

#[tokio::test]
async fn test_admin_cannot_create_peers_or_other_schools() {
    let f = fixture().await;

    let err = f
        .state
        .users
        .create_user(&f.admin, user("peer@school.test", "admin", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = f
        .state
        .users
        .create_user(&f.admin, user("kid@school.test", "student", Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let teacher = Caller::new(Uuid::new_v4(), UserRole::Teacher, Some(f.school));
    let err = f
        .state
        .users
        .create_user(&teacher, user("kid@school.test", "student", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_invalid_requests_are_validation_errors() {
    let f = fixture().await;

    let err = f
        .state
        .users
        .create_user(&f.admin, user("nobody@school.test", "janitor", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = f
        .state
        .users
        .create_user(&f.admin, user("not-an-email", "parent", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_malformed_emails_are_rejected() {
    let f = fixture().await;

    for bad in ["a@b@c.com", "ra vi@school.test", "x@.com"] {
        let err = f
            .state
            .users
            .create_user(&f.admin, user(bad, "driver", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "{} was accepted", bad);
    }

    let stored = f.store.find_credentials("a@b@c.com").await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let f = fixture().await;
    f.state
        .users
        .create_user(&f.admin, user("mum@school.test", "parent", None))
        .await
        .unwrap();

    let err = f
        .state
        .users
        .create_user(&f.admin, user("MUM@school.test", "parent", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_users_lock_blocks_admins_but_not_super_admins() {
    let f = fixture().await;
    f.state
        .schools
        .set_locks(&f.root, f.school, TenantLocks { users: true, ..Default::default() })
        .await
        .unwrap();

    let err = f
        .state
        .users
        .create_user(&f.admin, user("dad@school.test", "parent", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let created = f
        .state
        .users
        .create_user(&f.root, user("head@school.test", "admin", Some(f.school)))
        .await
        .unwrap();
    assert_eq!(created.tenant_id, Some(f.school));
}

#[tokio::test]
async fn test_super_admin_must_name_a_school_for_school_roles() {
    let f = fixture().await;
    let err = f
        .state
        .users
        .create_user(&f.root, user("head@school.test", "admin", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let created = f
        .state
        .users
        .create_user(&f.root, user("ops@schools24.test", "super_admin", None))
        .await
        .unwrap();
    assert_eq!(created.tenant_id, None);
}

#[tokio::test]
async fn test_transport_lock_blocks_route_changes() {
    let f = fixture().await;
    let route = f
        .state
        .routes
        .create_route(&f.admin, route_request("Route 12"))
        .await
        .unwrap();

    f.state
        .schools
        .set_locks(&f.root, f.school, TenantLocks { transport: true, ..Default::default() })
        .await
        .unwrap();

    let err = f
        .state
        .routes
        .create_route(&f.admin, route_request("Route 13"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let patch = UpdateRouteRequest {
        vehicle_no: Some("KA-02".to_string()),
        ..Default::default()
    };
    let err = f
        .state
        .routes
        .update_route(&f.admin, route.id, patch.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = f.state.routes.update_route(&f.root, route.id, patch).await.unwrap();
    assert_eq!(updated.vehicle_no.as_deref(), Some("KA-02"));
    assert_eq!(updated.stops, route.stops);
}

#[tokio::test]
async fn test_route_listing_is_tenant_scoped_and_truncated() {
    let f = fixture().await;
    for name in ["A", "B", "C"] {
        f.state
            .routes
            .create_route(&f.admin, route_request(name))
            .await
            .unwrap();
    }

    let listed = f.state.routes.list_routes(&f.admin, None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|r| r.tenant_id == f.school));

    let other_admin = Caller::new(Uuid::new_v4(), UserRole::Admin, Some(Uuid::new_v4()));
    assert!(f.state.routes.list_routes(&other_admin, None).await.unwrap().is_empty());

    let err = f
        .state
        .routes
        .get_route(&other_admin, listed[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_mutations_are_audited() {
    let f = fixture().await;
    let route = f
        .state
        .routes
        .create_route(&f.admin, route_request("Route 12"))
        .await
        .unwrap();
    f.state.routes.delete_route(&f.admin, route.id).await.unwrap();

    let entries = f.store.audit_entries().await;
    let actions: Vec<_> = entries
        .iter()
        .filter(|e| e.entity == "route")
        .map(|e| e.action.as_str())
        .collect();
    assert_eq!(actions, vec!["create", "delete"]);
    assert!(entries.iter().all(|e| e.created_at <= chrono::Utc::now()));
}

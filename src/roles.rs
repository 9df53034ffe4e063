//! Default role catalog and the bootstrap seeder that installs it into a
//! fresh tenant store.

use crate::error::AppError;
use crate::models::Role;
use crate::tenant::context::TenantContext;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;

pub struct DefaultRole {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

/// Versioned catalog seeded into every new tenant store. Admin is first; the
/// first-admin registration flow assigns the first role to the new user.
pub const DEFAULT_ROLES: &[DefaultRole] = &[
    DefaultRole {
        name: "Admin",
        description: "Has full access to the system, including managing users, roles, and all supply chain operations.",
        permissions: &[
            "manage:users",
            "manage:roles",
            "view:orders",
            "create:orders",
            "update:orders",
            "delete:orders",
            "view:inventory",
            "update:inventory",
            "view:shipments",
            "create:shipments",
            "update:shipments",
            "delete:shipments",
            "view:suppliers",
            "create:suppliers",
            "update:suppliers",
            "delete:suppliers",
            "view:reports",
            "generate:reports",
            "manage:settings",
        ],
    },
    DefaultRole {
        name: "User",
        description: "Can view and manage supply chain operations but cannot manage users or roles.",
        permissions: &[
            "view:orders",
            "create:orders",
            "update:orders",
            "view:inventory",
            "view:shipments",
            "create:shipments",
            "update:shipments",
            "view:suppliers",
            "view:reports",
        ],
    },
];

/// Storage the seeder runs against. Implemented by [`TenantContext`] over the
/// tenant's roles collection; tests substitute an in-memory store.
#[async_trait]
pub trait RoleStore {
    async fn list_roles(&self) -> Result<Vec<Role>, AppError>;
    async fn insert_role(&self, role: &Role) -> Result<(), AppError>;
}

#[async_trait]
impl RoleStore for TenantContext {
    async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        Ok(self.roles().find(doc! {}).await?.try_collect().await?)
    }

    async fn insert_role(&self, role: &Role) -> Result<(), AppError> {
        self.roles().insert_one(role).await?;
        Ok(())
    }
}

/// Ensure the tenant store has its default roles, exactly once. If any roles
/// already exist they are returned unchanged; otherwise the catalog is
/// inserted and the fresh set returned.
pub async fn ensure_default_roles<S>(store: &S) -> Result<Vec<Role>, AppError>
where
    S: RoleStore + Sync,
{
    let existing = store.list_roles().await?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    tracing::info!("creating default roles");
    for def in DEFAULT_ROLES {
        store
            .insert_role(&Role {
                id: None,
                name: def.name.to_string(),
                description: def.description.to_string(),
                permissions: def.permissions.iter().map(|p| p.to_string()).collect(),
            })
            .await?;
    }

    let created = store.list_roles().await?;
    tracing::info!(
        roles = ?created.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        "default roles created"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryRoles {
        roles: Mutex<Vec<Role>>,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl RoleStore for InMemoryRoles {
        async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
            Ok(self.roles.lock().unwrap().clone())
        }

        async fn insert_role(&self, role: &Role) -> Result<(), AppError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            let mut stored = role.clone();
            stored.id = Some(ObjectId::new());
            self.roles.lock().unwrap().push(stored);
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_call_seeds_the_catalog() {
        let store = InMemoryRoles::default();
        let roles = ensure_default_roles(&store).await.unwrap();
        assert_eq!(roles.len(), DEFAULT_ROLES.len());
        assert_eq!(roles[0].name, "Admin");
        assert_eq!(store.inserts.load(Ordering::SeqCst), DEFAULT_ROLES.len());
    }

    #[tokio::test]
    async fn second_call_returns_the_same_set_without_reseeding() {
        let store = InMemoryRoles::default();
        let first = ensure_default_roles(&store).await.unwrap();
        let second = ensure_default_roles(&store).await.unwrap();

        // No further inserts, and the identical role set comes back.
        assert_eq!(store.inserts.load(Ordering::SeqCst), DEFAULT_ROLES.len());
        let first_ids: Vec<_> = first.iter().map(|r| r.id).collect();
        let second_ids: Vec<_> = second.iter().map(|r| r.id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(
            first.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            second.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        );
    }

    #[tokio::test]
    async fn existing_roles_are_returned_untouched_even_if_not_the_catalog() {
        let store = InMemoryRoles::default();
        store
            .insert_role(&Role {
                id: None,
                name: "Auditor".into(),
                description: "Read-only access.".into(),
                permissions: vec!["view:reports".into()],
            })
            .await
            .unwrap();

        let roles = ensure_default_roles(&store).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "Auditor");
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn admin_is_first_and_can_manage_users_and_roles() {
        assert_eq!(DEFAULT_ROLES[0].name, "Admin");
        assert!(DEFAULT_ROLES[0].permissions.contains(&"manage:users"));
        assert!(DEFAULT_ROLES[0].permissions.contains(&"manage:roles"));
    }

    #[test]
    fn user_permissions_are_a_strict_subset_of_admin() {
        let admin: HashSet<_> = DEFAULT_ROLES[0].permissions.iter().collect();
        let user: HashSet<_> = DEFAULT_ROLES[1].permissions.iter().collect();
        assert!(user.is_subset(&admin));
        assert!(user.len() < admin.len());
        assert!(!user.contains(&"manage:users"));
    }

    #[test]
    fn role_names_are_unique() {
        let names: HashSet<_> = DEFAULT_ROLES.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), DEFAULT_ROLES.len());
    }
}

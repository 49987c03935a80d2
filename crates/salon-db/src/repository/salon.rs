//! # Salon Repository
//!
//! The salon tree and the explicit permission grants on it.
//!
//! ## Lineage
//! ```text
//! Downtown Group ◄── Downtown South ◄── South Kiosk
//!      depth 2            depth 1          depth 0
//!
//! lineage("South Kiosk") = [South Kiosk, Downtown South, Downtown Group]
//! ```
//! Permission resolution (salon-core) walks this list, so it is always
//! returned nearest first. The recursive query is depth-capped so a corrupt
//! parent chain can't loop forever.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use salon_core::permissions::{check_no_cycle, AccessContext};
use salon_core::validation::{
    validate_name, validate_optional, validate_optional_email, validate_optional_phone,
    MAX_NAME_LEN, MAX_SALON_PHONE_LEN,
};
use salon_core::{Page, Pagination, PermissionKind, Salon, SalonAssignment, SalonPermission, User};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{fetch_page, generate_id, like, require, search};
use crate::error::{DbError, DbResult};

const MAX_DEPTH: i64 = 64;

const LINEAGE_SQL: &str = "\
    WITH RECURSIVE lineage(id, depth) AS ( \
        SELECT id, 0 FROM salons WHERE id = ?1 \
        UNION ALL \
        SELECT s.parent_id, l.depth + 1 FROM salons s JOIN lineage l ON s.id = l.id \
        WHERE s.parent_id IS NOT NULL AND l.depth < ?2 \
    ) \
    SELECT s.* FROM salons s JOIN lineage l ON s.id = l.id ORDER BY l.depth ASC";

/// Salons at or below one the user owns, holds a grant on or is assigned to.
const REACHABLE_SQL: &str = "\
    WITH RECURSIVE reach(id, depth) AS ( \
        SELECT id, 0 FROM salons WHERE owner_id = ?1 \
            OR id IN (SELECT salon_id FROM salon_permissions WHERE user_id = ?1) \
            OR id IN (SELECT salon_id FROM salon_assignments WHERE barber_user_id = ?1) \
        UNION \
        SELECT s.id, r.depth + 1 FROM salons s JOIN reach r ON s.parent_id = r.id \
        WHERE r.depth < ?2 \
    ) \
    SELECT * FROM salons WHERE id IN (SELECT id FROM reach) ORDER BY name ASC";

/// Input for [`SalonRepository::create`].
#[derive(Debug, Clone)]
pub struct NewSalon {
    pub name: String,
    pub description: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub parent_id: Option<String>,
    pub owner_id: String,
}

/// Partial update. `parent_id: Some(None)` detaches the salon to the root.
#[derive(Debug, Clone, Default)]
pub struct SalonUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub parent_id: Option<Option<String>>,
}

/// Owned facts needed to resolve one user's permissions on one salon.
#[derive(Debug, Clone, Default)]
pub struct AccessFacts {
    pub lineage: Vec<Salon>,
    pub grants: Vec<SalonPermission>,
    pub assignments: Vec<SalonAssignment>,
}

impl AccessFacts {
    /// Borrows the facts as a resolver context for `user` on `today`.
    pub fn context<'a>(&'a self, user: &'a User, today: NaiveDate) -> AccessContext<'a> {
        AccessContext {
            user,
            lineage: &self.lineage,
            grants: &self.grants,
            assignments: &self.assignments,
            today,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SalonRepository {
    pool: SqlitePool,
}

impl SalonRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SalonRepository { pool }
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub async fn create(&self, input: NewSalon) -> DbResult<Salon> {
        let name = validate_name(&input.name)?;
        let address = validate_optional("address", input.address.as_deref(), MAX_NAME_LEN)?;
        let phone = validate_optional_phone(input.phone.as_deref(), MAX_SALON_PHONE_LEN)?;
        let email = validate_optional_email("email", input.email.as_deref())?;

        if let Some(parent_id) = &input.parent_id {
            let _: Salon = require(&self.pool, "salons", "Salon", parent_id).await?;
        }

        let now = Utc::now();
        let salon = Salon {
            id: generate_id(),
            name,
            description: input.description.trim().to_string(),
            address,
            phone,
            email,
            parent_id: input.parent_id,
            owner_id: input.owner_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO salons (id, name, description, address, phone, email, parent_id, \
             owner_id, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&salon.id)
        .bind(&salon.name)
        .bind(&salon.description)
        .bind(&salon.address)
        .bind(&salon.phone)
        .bind(&salon.email)
        .bind(&salon.parent_id)
        .bind(&salon.owner_id)
        .bind(salon.is_active)
        .bind(salon.created_at)
        .bind(salon.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            salon_id = %salon.id,
            name = %salon.name,
            parent_id = ?salon.parent_id,
            "Salon created"
        );
        Ok(salon)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Salon> {
        require(&self.pool, "salons", "Salon", id).await
    }

    /// Every salon, ordered by name. Visibility filtering is
    /// [`list_visible`](Self::list_visible).
    pub async fn list(&self, name: Option<&str>, pagination: Pagination) -> DbResult<Page<Salon>> {
        let name = search("name", name)?;
        fetch_page(&self.pool, "salons", "name ASC", pagination, |qb| {
            if let Some(n) = &name {
                qb.push(" AND name LIKE ");
                qb.push_bind(like(n));
            }
        })
        .await
    }

    /// Salons on which `user` can exercise at least one permission kind.
    pub async fn list_visible(
        &self,
        user: &User,
        name: Option<&str>,
        today: NaiveDate,
        pagination: Pagination,
    ) -> DbResult<Page<Salon>> {
        let needle = search("name", name)?.map(|n| n.to_lowercase());
        if !user.is_active {
            return Ok(Page::new(Vec::new(), pagination, 0));
        }

        // Access only flows down the tree, so the subtrees under salons the
        // user owns, is granted on or is assigned to cover everything visible.
        let salons = if user.is_superuser {
            sqlx::query_as::<_, Salon>("SELECT * FROM salons ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as::<_, Salon>(REACHABLE_SQL)
                .bind(&user.id)
                .bind(MAX_DEPTH)
                .fetch_all(&self.pool)
                .await?
        };
        let grants = self.grants_for_user(&user.id).await?;
        let assignments = sqlx::query_as::<_, SalonAssignment>(
            "SELECT * FROM salon_assignments WHERE barber_user_id = ?1",
        )
        .bind(&user.id)
        .fetch_all(&self.pool)
        .await?;

        let by_id: HashMap<&str, &Salon> = salons.iter().map(|s| (s.id.as_str(), s)).collect();

        let visible: Vec<Salon> = salons
            .iter()
            .filter(|s| {
                needle
                    .as_deref()
                    .map_or(true, |n| s.name.to_lowercase().contains(n))
            })
            .filter(|s| {
                let lineage = lineage_in_memory(s, &by_id);
                AccessContext {
                    user,
                    lineage: &lineage,
                    grants: &grants,
                    assignments: &assignments,
                    today,
                }
                .can_see()
            })
            .cloned()
            .collect();

        debug!(user_id = %user.id, visible = visible.len(), "Resolved visible salons");

        let total = visible.len() as i64;
        let items = visible
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok(Page::new(items, pagination, total))
    }

    /// Direct children, ordered by name.
    pub async fn children(&self, salon_id: &str) -> DbResult<Vec<Salon>> {
        let children =
            sqlx::query_as::<_, Salon>("SELECT * FROM salons WHERE parent_id = ?1 ORDER BY name ASC")
                .bind(salon_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(children)
    }

    /// The salon followed by its ancestors, nearest first.
    pub async fn lineage(&self, salon_id: &str) -> DbResult<Vec<Salon>> {
        let mut conn = self.pool.acquire().await?;
        lineage_in(&mut conn, salon_id).await
    }

    /// Updates fields; a `parent_id` change is checked for cycles.
    ///
    /// Who may re-parent is decided by the caller.
    pub async fn update(&self, id: &str, update: SalonUpdate) -> DbResult<Salon> {
        let mut tx = self.pool.begin().await?;
        let current: Salon = require(&mut *tx, "salons", "Salon", id).await?;

        let name = match &update.name {
            Some(n) => validate_name(n)?,
            None => current.name.clone(),
        };
        let description = update
            .description
            .as_deref()
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| current.description.clone());
        let address = match &update.address {
            Some(a) => validate_optional("address", Some(a.as_str()), MAX_NAME_LEN)?,
            None => current.address.clone(),
        };
        let phone = match &update.phone {
            Some(p) => validate_optional_phone(Some(p.as_str()), MAX_SALON_PHONE_LEN)?,
            None => current.phone.clone(),
        };
        let email = match &update.email {
            Some(e) => validate_optional_email("email", Some(e.as_str()))?,
            None => current.email.clone(),
        };
        let is_active = update.is_active.unwrap_or(current.is_active);

        let parent_id = match update.parent_id {
            Some(Some(parent_id)) => {
                let parent_lineage = lineage_in(&mut tx, &parent_id).await?;
                if parent_lineage.is_empty() {
                    return Err(DbError::not_found("Salon", parent_id));
                }
                check_no_cycle(id, &parent_lineage)?;
                Some(parent_id)
            }
            Some(None) => None,
            None => current.parent_id.clone(),
        };

        sqlx::query(
            "UPDATE salons SET name = ?2, description = ?3, address = ?4, phone = ?5, email = ?6, \
             is_active = ?7, parent_id = ?8, updated_at = ?9 WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(&description)
        .bind(&address)
        .bind(&phone)
        .bind(&email)
        .bind(is_active)
        .bind(&parent_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let updated: Salon = require(&mut *tx, "salons", "Salon", id).await?;
        tx.commit().await?;

        debug!(salon_id = %id, parent_id = ?updated.parent_id, "Salon updated");
        Ok(updated)
    }

    /// Deletes the salon, its descendants and everything scoped to them.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM salons WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Salon", id));
        }

        info!(salon_id = %id, "Salon deleted");
        Ok(())
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    pub async fn grant(
        &self,
        salon_id: &str,
        user_id: &str,
        permission: PermissionKind,
    ) -> DbResult<SalonPermission> {
        let grant = SalonPermission {
            id: generate_id(),
            salon_id: salon_id.to_string(),
            user_id: user_id.to_string(),
            permission,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO salon_permissions (id, salon_id, user_id, permission, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&grant.id)
        .bind(&grant.salon_id)
        .bind(&grant.user_id)
        .bind(grant.permission)
        .bind(grant.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("permission", permission.as_str()),
            other => other,
        })?;

        info!(
            salon_id = %salon_id,
            user_id = %user_id,
            permission = %permission,
            "Permission granted"
        );
        Ok(grant)
    }

    pub async fn revoke(&self, salon_id: &str, user_id: &str, permission: PermissionKind) -> DbResult<()> {
        let result = sqlx::query(
            "DELETE FROM salon_permissions WHERE salon_id = ?1 AND user_id = ?2 AND permission = ?3",
        )
        .bind(salon_id)
        .bind(user_id)
        .bind(permission)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "SalonPermission",
                format!("{}:{}", user_id, permission),
            ));
        }

        info!(salon_id = %salon_id, user_id = %user_id, permission = %permission, "Permission revoked");
        Ok(())
    }

    /// Explicit grants on one salon (not inherited ones).
    pub async fn permissions(&self, salon_id: &str) -> DbResult<Vec<SalonPermission>> {
        let grants = sqlx::query_as::<_, SalonPermission>(
            "SELECT * FROM salon_permissions WHERE salon_id = ?1 ORDER BY user_id, permission",
        )
        .bind(salon_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(grants)
    }

    pub async fn grants_for_user(&self, user_id: &str) -> DbResult<Vec<SalonPermission>> {
        let grants =
            sqlx::query_as::<_, SalonPermission>("SELECT * FROM salon_permissions WHERE user_id = ?1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(grants)
    }

    /// Loads what the resolver needs for `user_id` on `salon_id`.
    ///
    /// Fails with `NotFound` when the salon doesn't exist.
    pub async fn access_facts(&self, user_id: &str, salon_id: &str) -> DbResult<AccessFacts> {
        let lineage = self.lineage(salon_id).await?;
        if lineage.is_empty() {
            return Err(DbError::not_found("Salon", salon_id));
        }

        let grants = self.grants_for_user(user_id).await?;
        let assignments = sqlx::query_as::<_, SalonAssignment>(
            "SELECT * FROM salon_assignments WHERE barber_user_id = ?1 AND salon_id = ?2",
        )
        .bind(user_id)
        .bind(salon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(AccessFacts {
            lineage,
            grants,
            assignments,
        })
    }
}

pub(crate) async fn lineage_in(conn: &mut SqliteConnection, salon_id: &str) -> DbResult<Vec<Salon>> {
    let lineage = sqlx::query_as::<_, Salon>(LINEAGE_SQL)
        .bind(salon_id)
        .bind(MAX_DEPTH)
        .fetch_all(&mut *conn)
        .await?;
    Ok(lineage)
}

fn lineage_in_memory(salon: &Salon, by_id: &HashMap<&str, &Salon>) -> Vec<Salon> {
    let mut lineage = vec![salon.clone()];
    let mut parent = salon.parent_id.as_deref();
    while let Some(id) = parent {
        if lineage.len() as i64 > MAX_DEPTH {
            break;
        }
        match by_id.get(id) {
            Some(s) => {
                lineage.push((*s).clone());
                parent = s.parent_id.as_deref();
            }
            None => break,
        }
    }
    lineage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use crate::repository::user::NewUser;
    use salon_core::CoreError;

    #[tokio::test]
    async fn test_lineage_nearest_first() {
        let db = db().await;
        let alice = user(&db, "alice@salon.test").await;
        let root = salon(&db, &alice, "Group", None).await;
        let child = salon(&db, &alice, "South", Some(&root.id)).await;
        let kiosk = salon(&db, &alice, "Kiosk", Some(&child.id)).await;

        let lineage = db.salons().lineage(&kiosk.id).await.unwrap();
        let names: Vec<_> = lineage.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Kiosk", "South", "Group"]);

        let children = db.salons().children(&root.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, child.id);
    }

    #[tokio::test]
    async fn test_reparent_rejects_cycle() {
        let db = db().await;
        let alice = user(&db, "alice@salon.test").await;
        let root = salon(&db, &alice, "Group", None).await;
        let child = salon(&db, &alice, "South", Some(&root.id)).await;

        let err = db
            .salons()
            .update(
                &root.id,
                SalonUpdate {
                    parent_id: Some(Some(child.id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::SalonCycle { .. })));

        // Self-parenting is a cycle too
        let err = db
            .salons()
            .update(
                &child.id,
                SalonUpdate {
                    parent_id: Some(Some(child.id.clone())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::SalonCycle { .. })));

        let detached = db
            .salons()
            .update(
                &child.id,
                SalonUpdate {
                    parent_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(detached.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_grants_and_access_facts() {
        let db = db().await;
        let alice = user(&db, "alice@salon.test").await;
        let carol = user(&db, "carol@salon.test").await;
        let root = salon(&db, &alice, "Group", None).await;
        let child = salon(&db, &alice, "South", Some(&root.id)).await;

        db.salons()
            .grant(&root.id, &carol.id, PermissionKind::ManageFinance)
            .await
            .unwrap();
        let err = db
            .salons()
            .grant(&root.id, &carol.id, PermissionKind::ManageFinance)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let facts = db.salons().access_facts(&carol.id, &child.id).await.unwrap();
        let access = facts.context(&carol, date(2024, 6, 1));
        assert!(access.can(PermissionKind::ManageFinance));
        assert!(!access.can(PermissionKind::ManageInventory));

        db.salons()
            .revoke(&root.id, &carol.id, PermissionKind::ManageFinance)
            .await
            .unwrap();
        let facts = db.salons().access_facts(&carol.id, &child.id).await.unwrap();
        assert!(!facts.context(&carol, date(2024, 6, 1)).can_see());

        let err = db.salons().access_facts(&carol.id, "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_visible() {
        let db = db().await;
        let alice = user(&db, "alice@salon.test").await;
        let bob = user(&db, "bob@salon.test").await;
        let root = salon(&db, &alice, "Alpha Group", None).await;
        salon(&db, &alice, "Alpha Kiosk", Some(&root.id)).await;
        let other = salon(&db, &bob, "Bob Cuts", None).await;

        let today = date(2024, 6, 1);
        let page = db
            .salons()
            .list_visible(&alice, None, today, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        db.salons().grant(&other.id, &alice.id, PermissionKind::Read).await.unwrap();
        let page = db
            .salons()
            .list_visible(&alice, Some("bob"), today, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, other.id);
    }

    #[tokio::test]
    async fn test_list_visible_follows_grants_down_the_tree() {
        let db = db().await;
        let alice = user(&db, "alice@salon.test").await;
        let carol = user(&db, "carol@salon.test").await;
        let group = salon(&db, &alice, "Group", None).await;
        let south = salon(&db, &alice, "South", Some(&group.id)).await;
        salon(&db, &alice, "South Kiosk", Some(&south.id)).await;
        salon(&db, &alice, "North", Some(&group.id)).await;
        let today = date(2024, 6, 1);

        let page = db
            .salons()
            .list_visible(&carol, None, today, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        db.salons().grant(&south.id, &carol.id, PermissionKind::Read).await.unwrap();
        let page = db
            .salons()
            .list_visible(&carol, None, today, Pagination::default())
            .await
            .unwrap();
        let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["South", "South Kiosk"]);

        let root = db
            .users()
            .create(NewUser {
                email: "root@salon.test".to_string(),
                first_name: "Root".to_string(),
                last_name: "User".to_string(),
                password_hash: "hash".to_string(),
                is_active: true,
                is_staff: true,
                is_superuser: true,
            })
            .await
            .unwrap();
        let page = db
            .salons()
            .list_visible(&root, None, today, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.total, 4);
    }

    #[tokio::test]
    async fn test_delete_cascades_children() {
        let db = db().await;
        let alice = user(&db, "alice@salon.test").await;
        let root = salon(&db, &alice, "Group", None).await;
        let child = salon(&db, &alice, "South", Some(&root.id)).await;

        db.salons().delete(&root.id).await.unwrap();
        assert!(matches!(
            db.salons().get_by_id(&child.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}

//! # Permissions Module
//!
//! Answers "may this user exercise permission K on salon S?".
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. inactive user                                   → DENY             │
//! │  2. superuser                                       → ALLOW            │
//! │  3. owner of S or of any ancestor of S              → ALLOW            │
//! │  4. grant of K (or `manage`) on S or any ancestor   → ALLOW            │
//! │  5. current active assignment to S, and K is one of                    │
//! │     read / manage_shave / manage_hairstyle / manage_finance → ALLOW    │
//! │  6. otherwise                                       → DENY             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lineage
//! The caller loads the salon and its ancestors, nearest first:
//! ```text
//! [South Kiosk, Downtown South, Downtown Group]
//!  ▲ S          ▲ parent        ▲ root
//! ```
//! Everything here is pure; salon-db supplies the facts.

use chrono::NaiveDate;

use crate::error::{CoreError, CoreResult};
use crate::types::{PermissionKind, Salon, SalonAssignment, SalonPermission, User};

/// Kinds a barber gets from a current assignment alone.
pub const ASSIGNED_BARBER_KINDS: [PermissionKind; 4] = [
    PermissionKind::Read,
    PermissionKind::ManageShave,
    PermissionKind::ManageHairstyle,
    PermissionKind::ManageFinance,
];

/// Every kind; what an owner effectively holds.
pub fn owner_permission_set() -> [PermissionKind; 7] {
    PermissionKind::ALL
}

// =============================================================================
// Access Context
// =============================================================================

/// Facts about one user and one salon, enough to resolve any kind.
#[derive(Debug, Clone, Copy)]
pub struct AccessContext<'a> {
    pub user: &'a User,
    /// The salon first, then its ancestors up to the root.
    pub lineage: &'a [Salon],
    /// The user's explicit grants. Grants on unrelated salons are ignored.
    pub grants: &'a [SalonPermission],
    /// The user's assignments. Only those on the salon itself count.
    pub assignments: &'a [SalonAssignment],
    pub today: NaiveDate,
}

impl<'a> AccessContext<'a> {
    fn salon(&self) -> Option<&'a Salon> {
        self.lineage.first()
    }

    fn in_lineage(&self, salon_id: &str) -> bool {
        self.lineage.iter().any(|s| s.id == salon_id)
    }

    /// Owner of the salon or an ancestor, or a superuser.
    pub fn is_owner(&self) -> bool {
        if !self.user.is_active {
            return false;
        }
        self.user.is_superuser || self.lineage.iter().any(|s| s.owner_id == self.user.id)
    }

    fn has_grant(&self, kind: PermissionKind) -> bool {
        self.grants
            .iter()
            .filter(|g| g.user_id == self.user.id && self.in_lineage(&g.salon_id))
            .any(|g| g.permission.implies(kind))
    }

    fn has_current_assignment(&self) -> bool {
        let Some(salon) = self.salon() else {
            return false;
        };
        self.assignments.iter().any(|a| {
            a.salon_id == salon.id && a.barber_user_id == self.user.id && a.is_current(self.today)
        })
    }

    /// Resolves one permission kind.
    pub fn can(&self, kind: PermissionKind) -> bool {
        if !self.user.is_active || self.salon().is_none() {
            return false;
        }
        if self.is_owner() {
            return true;
        }
        if self.has_grant(kind) {
            return true;
        }
        self.has_current_assignment() && ASSIGNED_BARBER_KINDS.contains(&kind)
    }

    /// Any access at all; used to decide which salons a user sees.
    pub fn can_see(&self) -> bool {
        !self.effective_permissions().is_empty()
    }

    /// All kinds the user can exercise on the salon.
    pub fn effective_permissions(&self) -> Vec<PermissionKind> {
        PermissionKind::ALL
            .iter()
            .copied()
            .filter(|k| self.can(*k))
            .collect()
    }

    /// Like [`can`](Self::can) but returns `PermissionDenied`.
    pub fn require(&self, kind: PermissionKind) -> CoreResult<()> {
        if self.can(kind) {
            return Ok(());
        }
        Err(CoreError::PermissionDenied(format!(
            "{} on salon {}",
            kind,
            self.salon().map(|s| s.name.as_str()).unwrap_or("unknown")
        )))
    }

    pub fn require_owner(&self) -> CoreResult<()> {
        if self.is_owner() {
            return Ok(());
        }
        Err(CoreError::PermissionDenied(
            "only an owner can do this".to_string(),
        ))
    }
}

// =============================================================================
// Salon Tree Rules
// =============================================================================

/// Re-parenting is reserved to superusers.
pub fn require_can_reparent(user: &User) -> CoreResult<()> {
    if user.is_active && user.is_superuser {
        return Ok(());
    }
    Err(CoreError::PermissionDenied(
        "only a superuser can move a salon".to_string(),
    ))
}

/// Rejects a new parent whose lineage (parent first) contains the salon.
pub fn check_no_cycle(salon_id: &str, parent_lineage: &[Salon]) -> CoreResult<()> {
    if let Some(parent) = parent_lineage.first() {
        if parent_lineage.iter().any(|s| s.id == salon_id) {
            return Err(CoreError::SalonCycle {
                salon_id: salon_id.to_string(),
                parent_id: parent.id.clone(),
            });
        }
    }
    Ok(())
}

/// Global catalogue writes (currencies, payment types, barber types).
pub fn require_staff(user: &User) -> CoreResult<()> {
    if user.is_active && (user.is_superuser || user.is_staff) {
        return Ok(());
    }
    Err(CoreError::PermissionDenied(
        "staff access required".to_string(),
    ))
}

pub fn require_superuser(user: &User) -> CoreResult<()> {
    if user.is_active && user.is_superuser {
        return Ok(());
    }
    Err(CoreError::PermissionDenied(
        "superuser access required".to_string(),
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Households, members, and finance contexts.
//!
//! A household groups the members that share tasks. Members carry a role
//! from the ordered set {owner, admin, member, viewer} plus fine-grained
//! capability flags; the role decides the default flags and the rank used
//! for admin-override checks. Finance contexts partition a household's
//! financial data (e.g. personal vs. business) for segregated reporting.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// Member Role
// =============================================================================

/// Role of a member within a household, ordered by rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Founding member, full control
    Owner,
    /// Can manage tasks and members
    Admin,
    /// Normal collaborative member
    Member,
    /// Read-only access
    Viewer,
}

impl MemberRole {
    /// Rank of the role (higher = more authority)
    pub fn rank(&self) -> u8 {
        match self {
            MemberRole::Owner => 3,
            MemberRole::Admin => 2,
            MemberRole::Member => 1,
            MemberRole::Viewer => 0,
        }
    }

    /// Whether the role carries admin-level override authority
    pub fn is_admin(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Owner => write!(f, "owner"),
            MemberRole::Admin => write!(f, "admin"),
            MemberRole::Member => write!(f, "member"),
            MemberRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for MemberRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "member" => Ok(MemberRole::Member),
            "viewer" => Ok(MemberRole::Viewer),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid role '{}'. Expected: owner, admin, member, viewer",
                s
            ))),
        }
    }
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::Member
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Fine-grained capability flags carried by each member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_edit_tasks: bool,
    pub can_claim_tasks: bool,
    pub can_add_accounts: bool,
    pub can_view_all_transactions: bool,
    pub can_invite: bool,
}

impl Capabilities {
    /// Default capability set for a role
    pub fn for_role(role: MemberRole) -> Self {
        match role {
            MemberRole::Owner | MemberRole::Admin => Self {
                can_edit_tasks: true,
                can_claim_tasks: true,
                can_add_accounts: true,
                can_view_all_transactions: true,
                can_invite: true,
            },
            MemberRole::Member => Self {
                can_edit_tasks: true,
                can_claim_tasks: true,
                can_add_accounts: false,
                can_view_all_transactions: false,
                can_invite: false,
            },
            MemberRole::Viewer => Self {
                can_edit_tasks: false,
                can_claim_tasks: false,
                can_add_accounts: false,
                can_view_all_transactions: false,
                can_invite: false,
            },
        }
    }
}

// =============================================================================
// Member
// =============================================================================

/// A member of a household
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Unique member id
    pub id: Uuid,
    /// Household this membership belongs to
    pub household_id: Uuid,
    /// Display name
    pub name: String,
    /// Role within the household
    pub role: MemberRole,
    /// Capability flags (defaults derive from the role)
    pub capabilities: Capabilities,
    /// Timestamp when the membership was created
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Create a member with the default capabilities for the role
    pub fn new(household_id: Uuid, name: impl Into<String>, role: MemberRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            name: name.into(),
            role,
            capabilities: Capabilities::for_role(role),
            joined_at: Utc::now(),
        }
    }

    /// Whether this member can override ownership checks
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

// =============================================================================
// Finance Context
// =============================================================================

/// Kind tag for a finance context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Personal,
    Business,
    Investment,
    Other,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::Personal => write!(f, "personal"),
            ContextKind::Business => write!(f, "business"),
            ContextKind::Investment => write!(f, "investment"),
            ContextKind::Other => write!(f, "other"),
        }
    }
}

impl FromStr for ContextKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "personal" => Ok(ContextKind::Personal),
            "business" => Ok(ContextKind::Business),
            "investment" => Ok(ContextKind::Investment),
            "other" => Ok(ContextKind::Other),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid context kind '{}'. Expected: personal, business, investment, other",
                s
            ))),
        }
    }
}

impl Default for ContextKind {
    fn default() -> Self {
        ContextKind::Personal
    }
}

/// A named partition of a household's financial data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceContext {
    pub id: Uuid,
    pub household_id: Uuid,
    pub name: String,
    pub kind: ContextKind,
    /// Reported separately for tax purposes
    pub tax_separate: bool,
    /// At most one default context per household
    pub is_default: bool,
}

impl FinanceContext {
    pub fn new(household_id: Uuid, name: impl Into<String>, kind: ContextKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id,
            name: name.into(),
            kind,
            tax_separate: false,
            is_default: false,
        }
    }
}

// =============================================================================
// Household
// =============================================================================

/// Household settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdSettings {
    /// Whether non-admin members may invite others
    #[serde(default)]
    pub allow_member_invites: bool,

    /// Role granted to members joining via invite code
    #[serde(default)]
    pub default_role: MemberRole,
}

impl Default for HouseholdSettings {
    fn default() -> Self {
        Self {
            allow_member_invites: false,
            default_role: MemberRole::Member,
        }
    }
}

/// A group of members sharing tasks and finance contexts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Household {
    pub id: Uuid,
    pub name: String,
    /// Code handed to prospective members for joining
    pub invite_code: String,
    /// The founding member, implicitly an owner
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: HouseholdSettings,
}

/// Generate a short, url-safe invite code
fn generate_invite_code() -> String {
    // First uuid segment is 8 hex chars; short enough to share, unique
    // enough for a registry of households.
    let raw = Uuid::new_v4().simple().to_string();
    raw[..8].to_string()
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of all households, members, and contexts in a data root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseholdRegistry {
    pub households: Vec<Household>,
    pub members: Vec<Member>,
    #[serde(default)]
    pub contexts: Vec<FinanceContext>,
}

impl HouseholdRegistry {
    /// Create a household; the creator becomes its owner
    pub fn create_household(
        &mut self,
        name: impl Into<String>,
        creator_name: impl Into<String>,
    ) -> Result<(Household, Member)> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "household name cannot be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let owner = Member::new(id, creator_name, MemberRole::Owner);
        let household = Household {
            id,
            name,
            invite_code: generate_invite_code(),
            created_by: owner.id,
            created_at: Utc::now(),
            settings: HouseholdSettings::default(),
        };

        self.households.push(household.clone());
        self.members.push(owner.clone());
        Ok((household, owner))
    }

    /// Find a household by id
    pub fn household(&self, id: Uuid) -> Result<&Household> {
        self.households
            .iter()
            .find(|h| h.id == id)
            .ok_or_else(|| Error::HouseholdNotFound(id.to_string()))
    }

    /// Find a household by its invite code
    pub fn household_by_invite(&self, code: &str) -> Result<&Household> {
        self.households
            .iter()
            .find(|h| h.invite_code == code.trim())
            .ok_or_else(|| Error::HouseholdNotFound(format!("invite code {code}")))
    }

    /// Find a household by name
    pub fn household_by_name(&self, name: &str) -> Result<&Household> {
        self.households
            .iter()
            .find(|h| h.name == name.trim())
            .ok_or_else(|| Error::HouseholdNotFound(name.to_string()))
    }

    /// Find a member by id
    pub fn member(&self, id: Uuid) -> Result<&Member> {
        self.members
            .iter()
            .find(|m| m.id == id)
            .ok_or(Error::MemberNotFound(id))
    }

    /// Find a member of a household by display name
    pub fn member_by_name(&self, household: Uuid, name: &str) -> Result<&Member> {
        self.members
            .iter()
            .find(|m| m.household_id == household && m.name == name.trim())
            .ok_or_else(|| Error::InvalidArgument(format!("no member named '{name}'")))
    }

    /// All members of a household
    pub fn members_of(&self, household: Uuid) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|m| m.household_id == household)
            .collect()
    }

    /// Add a member via invite code.
    ///
    /// The inviter needs the invite capability unless member invites are
    /// open; joiners get the household's default role.
    pub fn join_household(
        &mut self,
        invite_code: &str,
        name: impl Into<String>,
        inviter: Option<Uuid>,
    ) -> Result<Member> {
        let household = self.household_by_invite(invite_code)?.clone();

        if let Some(inviter) = inviter {
            let inviter = self.member(inviter)?;
            if inviter.household_id != household.id {
                return Err(Error::Forbidden(
                    "inviter belongs to a different household".to_string(),
                ));
            }
            let allowed = inviter.is_admin()
                || inviter.capabilities.can_invite
                || household.settings.allow_member_invites;
            if !allowed {
                return Err(Error::Forbidden(format!(
                    "{} cannot invite members",
                    inviter.name
                )));
            }
        }

        let name = name.into();
        if self
            .members
            .iter()
            .any(|m| m.household_id == household.id && m.name == name)
        {
            return Err(Error::InvalidArgument(format!(
                "member already exists: {name}"
            )));
        }

        let member = Member::new(household.id, name, household.settings.default_role);
        self.members.push(member.clone());
        Ok(member)
    }

    /// Add a finance context, enforcing a single default per household
    pub fn add_context(&mut self, mut context: FinanceContext) -> Result<FinanceContext> {
        self.household(context.household_id)?;

        if context.name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "context name cannot be empty".to_string(),
            ));
        }
        if self
            .contexts
            .iter()
            .any(|c| c.household_id == context.household_id && c.name == context.name)
        {
            return Err(Error::InvalidArgument(format!(
                "context already exists: {}",
                context.name
            )));
        }

        // First context for a household becomes the default
        let has_default = self
            .contexts
            .iter()
            .any(|c| c.household_id == context.household_id && c.is_default);
        if !has_default {
            context.is_default = true;
        } else if context.is_default {
            for existing in &mut self.contexts {
                if existing.household_id == context.household_id {
                    existing.is_default = false;
                }
            }
        }

        self.contexts.push(context.clone());
        Ok(context)
    }

    /// Find a context by id
    pub fn context(&self, id: Uuid) -> Result<&FinanceContext> {
        self.contexts
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::InvalidArgument(format!("context not found: {id}")))
    }

    /// Validate registry consistency
    pub fn validate(&self) -> Result<()> {
        for household in &self.households {
            let owners = self
                .members
                .iter()
                .filter(|m| m.household_id == household.id && m.role == MemberRole::Owner)
                .count();
            if owners == 0 {
                return Err(Error::InvalidArgument(format!(
                    "household {} has no owner",
                    household.name
                )));
            }

            let defaults = self
                .contexts
                .iter()
                .filter(|c| c.household_id == household.id && c.is_default)
                .count();
            if defaults > 1 {
                return Err(Error::InvalidArgument(format!(
                    "household {} has {} default contexts",
                    household.name, defaults
                )));
            }
        }
        Ok(())
    }
}

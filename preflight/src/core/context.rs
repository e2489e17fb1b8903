//! The normalized description of why a run is happening.

use std::collections::BTreeMap;

use crate::core::event::{AutomationPayload, EntityPayload, EventClass, EventName};
use crate::core::types::ModeName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub repo: String,
    pub full_name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        let full_name = format!("{owner}/{repo}");
        Self {
            owner,
            repo,
            full_name,
        }
    }

    /// Parse `owner/name`; both halves must be non-empty.
    pub fn parse(full_name: &str) -> Option<Self> {
        let (owner, repo) = full_name.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo))
    }
}

/// User-facing inputs, resolved once during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    pub mode: ModeName,
    pub trigger_phrase: String,
    pub assignee_trigger: String,
    pub label_trigger: String,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub custom_instructions: String,
    pub direct_prompt: String,
    pub override_prompt: String,
    pub base_branch: Option<String>,
    pub branch_prefix: String,
    pub use_sticky_comment: bool,
    pub use_commit_signing: bool,
    pub additional_permissions: BTreeMap<String, String>,
}

/// Fields shared by both context variants.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBase {
    pub run_id: String,
    pub event_action: Option<String>,
    pub repository: Repository,
    pub actor: String,
    pub inputs: Inputs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityContext {
    pub base: ContextBase,
    pub payload: EntityPayload,
    pub entity_number: u64,
    pub is_pr: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutomationContext {
    pub base: ContextBase,
    pub payload: AutomationPayload,
}

/// Exactly one variant is produced per event.
#[derive(Debug, Clone, PartialEq)]
pub enum Context {
    Entity(EntityContext),
    Automation(AutomationContext),
}

impl Context {
    pub fn base(&self) -> &ContextBase {
        match self {
            Self::Entity(ctx) => &ctx.base,
            Self::Automation(ctx) => &ctx.base,
        }
    }

    pub fn event_name(&self) -> EventName {
        match self {
            Self::Entity(ctx) => ctx.payload.event_name(),
            Self::Automation(ctx) => ctx.payload.event_name(),
        }
    }

    pub fn class(&self) -> EventClass {
        match self {
            Self::Entity(_) => EventClass::Entity,
            Self::Automation(_) => EventClass::Automation,
        }
    }

    pub fn inputs(&self) -> &Inputs {
        &self.base().inputs
    }

    pub fn repository(&self) -> &Repository {
        &self.base().repository
    }

    pub fn actor(&self) -> &str {
        &self.base().actor
    }

    pub fn as_entity(&self) -> Option<&EntityContext> {
        match self {
            Self::Entity(ctx) => Some(ctx),
            Self::Automation(_) => None,
        }
    }

    pub fn is_automation(&self) -> bool {
        matches!(self, Self::Automation(_))
    }
}

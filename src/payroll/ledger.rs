//! Effective-dated salary revision history.
//!
//! Each employee's revisions form a sorted list of half-open intervals
//! `[effective_from, effective_to)` over payroll cycles. Only the last revision
//! may be open (no `effective_to`). Every mutation runs on a working copy that
//! is validated before it replaces the current list, so a failed operation
//! leaves the ledger exactly as it was.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::payroll::compensation::{CompensationBreakdown, decompose};
use crate::payroll::cycle::{PayrollCycle, resolve_cycle};
use crate::payroll::error::{PayrollError, PayrollResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct RevisionId(Uuid);

impl RevisionId {
    pub fn new() -> Self {
        RevisionId(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> PayrollResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(RevisionId)
            .map_err(|_| PayrollError::invalid(format!("'{raw}' is not a revision id")))
    }
}

impl Default for RevisionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability to change the ledger, supplied by whoever calls into it.
pub trait LedgerActor {
    /// Recorded as `updated_by` on the revisions the actor touches.
    fn actor_name(&self) -> &str;

    /// May add or edit revisions for `emp_id`.
    fn can_revise(&self, emp_id: &str) -> bool;

    /// May remove revisions for `emp_id`.
    fn can_remove(&self, emp_id: &str) -> bool {
        self.can_revise(emp_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalaryRevision {
    #[schema(value_type = String, example = "5b7c9a8e-3f64-4c55-9b4f-0e5c1f0a2d11")]
    pub id: RevisionId,
    #[schema(example = "E001")]
    pub emp_id: String,
    pub effective_from: PayrollCycle,
    /// `None` while this is the current revision.
    pub effective_to: Option<PayrollCycle>,
    #[serde(flatten)]
    pub breakdown: CompensationBreakdown,
    #[schema(example = "Annual increment")]
    pub reason: String,
    #[schema(example = "hr.anita")]
    pub updated_by: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl SalaryRevision {
    pub fn is_open(&self) -> bool {
        self.effective_to.is_none()
    }

    pub fn covers(&self, cycle: PayrollCycle) -> bool {
        self.effective_from <= cycle && self.effective_to.is_none_or(|to| cycle < to)
    }
}

/// Cycles between two neighbouring revisions that no revision covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerGap {
    pub from: PayrollCycle,
    /// Exclusive.
    pub to: PayrollCycle,
}

/// Fields of a revision that may be edited.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct RevisionEdit {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>, example = 18000.0)]
    pub gross_ctc: Option<Decimal>,
    pub effective_from: Option<PayrollCycle>,
    pub reason: Option<String>,
}

impl RevisionEdit {
    pub fn is_empty(&self) -> bool {
        self.gross_ctc.is_none() && self.effective_from.is_none() && self.reason.is_none()
    }
}

/// Rows changed by one ledger operation, for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerMutation {
    /// Revisions inserted or modified, in ledger order.
    pub upserted: Vec<SalaryRevision>,
    pub removed: Option<SalaryRevision>,
    /// Revision that became current again after the open one was removed.
    pub reopened: Option<RevisionId>,
    /// Hole left by removing a past revision.
    pub gap: Option<LedgerGap>,
}

/// One row-level write of a [`LedgerMutation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowWrite<'a> {
    Delete(&'a SalaryRevision),
    Upsert(&'a SalaryRevision),
}

impl LedgerMutation {
    /// The revision an add or edit operated on.
    pub fn primary(&self) -> Option<&SalaryRevision> {
        self.upserted.last()
    }

    /// Writes in the order storage applies them. The removed row goes first
    /// so a reopened revision never meets the one it replaces on the
    /// open-revision key; upserts follow in ledger order, which closes the
    /// old open revision before the new one is written.
    pub fn writes(&self) -> impl Iterator<Item = RowWrite<'_>> {
        self.removed
            .iter()
            .map(RowWrite::Delete)
            .chain(self.upserted.iter().map(RowWrite::Upsert))
    }
}

/// All revisions of one employee, ordered by `effective_from`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeLedger {
    emp_id: String,
    revisions: Vec<SalaryRevision>,
}

impl EmployeeLedger {
    pub fn new(emp_id: impl Into<String>) -> Self {
        Self {
            emp_id: emp_id.into(),
            revisions: Vec::new(),
        }
    }

    /// Builds a ledger from stored rows, in any order.
    pub fn from_revisions(
        emp_id: impl Into<String>,
        mut revisions: Vec<SalaryRevision>,
    ) -> PayrollResult<Self> {
        let emp_id = emp_id.into();
        revisions.sort_by_key(|r| r.effective_from);
        validate(&emp_id, &revisions)?;
        Ok(Self { emp_id, revisions })
    }

    pub fn emp_id(&self) -> &str {
        &self.emp_id
    }

    pub fn revisions(&self) -> &[SalaryRevision] {
        &self.revisions
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Newest first.
    pub fn history(&self) -> Vec<SalaryRevision> {
        self.revisions.iter().rev().cloned().collect()
    }

    pub fn open_revision(&self) -> Option<&SalaryRevision> {
        self.revisions.iter().find(|r| r.is_open())
    }

    pub fn get(&self, id: RevisionId) -> Option<&SalaryRevision> {
        self.revisions.iter().find(|r| r.id == id)
    }

    pub fn active_for_cycle(&self, cycle: PayrollCycle) -> PayrollResult<&SalaryRevision> {
        self.revisions
            .iter()
            .find(|r| r.covers(cycle))
            .ok_or_else(|| {
                PayrollError::NotFound(format!(
                    "no salary revision for {} covers cycle {cycle}",
                    self.emp_id
                ))
            })
    }

    /// Revision in force for the payroll cycle `date` resolves to.
    pub fn active_at(&self, date: NaiveDate) -> PayrollResult<&SalaryRevision> {
        self.active_for_cycle(resolve_cycle(date))
    }

    pub fn gaps(&self) -> Vec<LedgerGap> {
        self.revisions
            .windows(2)
            .filter_map(|pair| match pair[0].effective_to {
                Some(to) if to < pair[1].effective_from => Some(LedgerGap {
                    from: to,
                    to: pair[1].effective_from,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn validate(&self) -> PayrollResult<()> {
        validate(&self.emp_id, &self.revisions)
    }

    fn require_revise(&self, actor: &dyn LedgerActor) -> PayrollResult<()> {
        if actor.can_revise(&self.emp_id) {
            Ok(())
        } else {
            Err(PayrollError::Forbidden(format!(
                "{} may not revise salary for {}",
                actor.actor_name(),
                self.emp_id
            )))
        }
    }

    fn position(&self, id: RevisionId) -> PayrollResult<usize> {
        self.revisions
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PayrollError::NotFound(format!("salary revision {id}")))
    }

    fn commit(&mut self, working: Vec<SalaryRevision>) -> PayrollResult<()> {
        validate(&self.emp_id, &working)?;
        self.revisions = working;
        Ok(())
    }

    /// Adds a revision effective from `effective_from` and closes the current
    /// one at that cycle.
    pub fn add_revision(
        &mut self,
        gross_ctc: Decimal,
        effective_from: PayrollCycle,
        reason: &str,
        actor: &dyn LedgerActor,
    ) -> PayrollResult<LedgerMutation> {
        self.require_revise(actor)?;
        let breakdown = decompose(gross_ctc)?;

        if let Some(latest) = self.revisions.last() {
            if effective_from <= latest.effective_from {
                return Err(PayrollError::integrity(format!(
                    "revision effective {effective_from} does not follow the latest revision effective {}",
                    latest.effective_from
                )));
            }
        }

        let now = Utc::now();
        let mut working = self.revisions.clone();
        let mut mutation = LedgerMutation::default();

        if let Some(open) = working.iter_mut().find(|r| r.is_open()) {
            open.effective_to = Some(effective_from);
            open.updated_at = now;
            mutation.upserted.push(open.clone());
        }

        let revision = SalaryRevision {
            id: RevisionId::new(),
            emp_id: self.emp_id.clone(),
            effective_from,
            effective_to: None,
            breakdown,
            reason: reason_or_default(reason),
            updated_by: actor.actor_name().to_string(),
            created_at: now,
            updated_at: now,
        };
        working.push(revision.clone());
        mutation.upserted.push(revision);

        self.commit(working)?;
        Ok(mutation)
    }

    /// Edits one revision. A new CTC replaces the whole breakdown; a new
    /// effective cycle drags the predecessor's end along when the two were
    /// contiguous.
    pub fn edit_revision(
        &mut self,
        id: RevisionId,
        edit: RevisionEdit,
        actor: &dyn LedgerActor,
    ) -> PayrollResult<LedgerMutation> {
        self.require_revise(actor)?;
        if edit.is_empty() {
            return Err(PayrollError::invalid("No fields provided for update"));
        }
        let idx = self.position(id)?;

        // computed up front so a failing CTC never leaves a half-edited revision
        let breakdown = edit.gross_ctc.map(decompose).transpose()?;

        let now = Utc::now();
        let mut working = self.revisions.clone();
        let mut mutation = LedgerMutation::default();

        if let Some(new_from) = edit.effective_from {
            let old_from = working[idx].effective_from;
            if idx > 0 && new_from <= working[idx - 1].effective_from {
                return Err(PayrollError::integrity(format!(
                    "{new_from} does not follow the previous revision effective {}",
                    working[idx - 1].effective_from
                )));
            }
            if let Some(next) = working.get(idx + 1) {
                if new_from >= next.effective_from {
                    return Err(PayrollError::integrity(format!(
                        "{new_from} is not before the next revision effective {}",
                        next.effective_from
                    )));
                }
            }
            if idx > 0 && working[idx - 1].effective_to == Some(old_from) {
                let prev = &mut working[idx - 1];
                prev.effective_to = Some(new_from);
                prev.updated_at = now;
                mutation.upserted.push(prev.clone());
            }
            working[idx].effective_from = new_from;
        }

        let target = &mut working[idx];
        if let Some(breakdown) = breakdown {
            target.breakdown = breakdown;
        }
        if let Some(reason) = edit.reason {
            target.reason = reason_or_default(&reason);
        }
        target.updated_by = actor.actor_name().to_string();
        target.updated_at = now;
        mutation.upserted.push(target.clone());

        self.commit(working)?;
        Ok(mutation)
    }

    /// Removes a revision. Removing the current revision reopens its
    /// predecessor; removing a past one leaves a reported gap.
    pub fn delete_revision(
        &mut self,
        id: RevisionId,
        actor: &dyn LedgerActor,
    ) -> PayrollResult<LedgerMutation> {
        if !actor.can_remove(&self.emp_id) {
            return Err(PayrollError::Forbidden(format!(
                "{} may not remove salary revisions for {}",
                actor.actor_name(),
                self.emp_id
            )));
        }
        let idx = self.position(id)?;
        if self.revisions.len() == 1 {
            return Err(PayrollError::integrity(
                "cannot delete the only salary revision; at least one must remain",
            ));
        }

        let mut working = self.revisions.clone();
        let removed = working.remove(idx);
        let mut mutation = LedgerMutation::default();

        if removed.is_open() {
            if let Some(prev) = idx.checked_sub(1).and_then(|i| working.get_mut(i)) {
                prev.effective_to = None;
                prev.updated_at = Utc::now();
                mutation.reopened = Some(prev.id);
                mutation.upserted.push(prev.clone());
            }
        } else if idx > 0 {
            if let (Some(to), Some(next)) = (working[idx - 1].effective_to, working.get(idx)) {
                if to < next.effective_from {
                    mutation.gap = Some(LedgerGap {
                        from: to,
                        to: next.effective_from,
                    });
                }
            }
        }

        if let Some(gap) = mutation.gap {
            warn!(
                emp_id = %self.emp_id,
                gap_from = %gap.from,
                gap_to = %gap.to,
                "Salary revision removed; ledger now has an uncovered gap"
            );
        }

        mutation.removed = Some(removed);
        self.commit(working)?;
        Ok(mutation)
    }
}

fn reason_or_default(reason: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        "Salary revision".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Interval integrity of one employee's revisions, which must already be sorted.
fn validate(emp_id: &str, revisions: &[SalaryRevision]) -> PayrollResult<()> {
    for revision in revisions {
        if revision.emp_id != emp_id {
            return Err(PayrollError::integrity(format!(
                "revision {} belongs to {}, not {emp_id}",
                revision.id, revision.emp_id
            )));
        }
        if let Some(to) = revision.effective_to {
            if to <= revision.effective_from {
                return Err(PayrollError::integrity(format!(
                    "revision {} ends ({to}) at or before it starts ({})",
                    revision.id, revision.effective_from
                )));
            }
        }
    }

    for pair in revisions.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        if earlier.effective_from >= later.effective_from {
            return Err(PayrollError::integrity(format!(
                "revisions {} and {} share or invert their effective cycle {}",
                earlier.id, later.id, later.effective_from
            )));
        }
        match earlier.effective_to {
            None => {
                return Err(PayrollError::integrity(format!(
                    "revision {} is open but is followed by {}",
                    earlier.id, later.id
                )));
            }
            Some(to) if to > later.effective_from => {
                return Err(PayrollError::integrity(format!(
                    "revision {} (until {to}) overlaps {} (from {})",
                    earlier.id, later.id, later.effective_from
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// In-process ledger for many employees with one writer per employee.
#[derive(Default)]
pub struct SalaryLedger {
    employees: RwLock<HashMap<String, Arc<Mutex<EmployeeLedger>>>>,
    owners: RwLock<HashMap<RevisionId, String>>,
}

impl SalaryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an already-validated employee ledger, replacing any existing one.
    pub fn load(&self, ledger: EmployeeLedger) {
        let emp_id = ledger.emp_id().to_string();
        {
            let mut owners = self.owners.write().expect("salary ledger poisoned");
            owners.retain(|_, owner| owner != &emp_id);
            for revision in ledger.revisions() {
                owners.insert(revision.id, emp_id.clone());
            }
        }
        self.employees
            .write()
            .expect("salary ledger poisoned")
            .insert(emp_id, Arc::new(Mutex::new(ledger)));
    }

    fn employee(&self, emp_id: &str) -> Arc<Mutex<EmployeeLedger>> {
        if let Some(existing) = self.existing(emp_id) {
            return existing;
        }
        self.employees
            .write()
            .expect("salary ledger poisoned")
            .entry(emp_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(EmployeeLedger::new(emp_id))))
            .clone()
    }

    fn existing(&self, emp_id: &str) -> Option<Arc<Mutex<EmployeeLedger>>> {
        self.employees
            .read()
            .expect("salary ledger poisoned")
            .get(emp_id)
            .cloned()
    }

    fn owner_of(&self, id: RevisionId) -> PayrollResult<Arc<Mutex<EmployeeLedger>>> {
        let emp_id = self
            .owners
            .read()
            .expect("salary ledger poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| PayrollError::NotFound(format!("salary revision {id}")))?;
        self.existing(&emp_id)
            .ok_or_else(|| PayrollError::NotFound(format!("salary revision {id}")))
    }

    pub fn add_revision(
        &self,
        emp_id: &str,
        gross_ctc: Decimal,
        effective_from: PayrollCycle,
        reason: &str,
        actor: &dyn LedgerActor,
    ) -> PayrollResult<SalaryRevision> {
        let handle = self.employee(emp_id);
        let mut ledger = handle.lock().expect("employee ledger poisoned");
        let mutation = ledger.add_revision(gross_ctc, effective_from, reason, actor)?;
        let added = mutation
            .primary()
            .cloned()
            .ok_or_else(|| PayrollError::integrity("add produced no revision"))?;
        self.owners
            .write()
            .expect("salary ledger poisoned")
            .insert(added.id, emp_id.to_string());
        debug!(emp_id, revision_id = %added.id, effective_from = %effective_from, "Salary revision added");
        Ok(added)
    }

    pub fn edit_revision(
        &self,
        id: RevisionId,
        edit: RevisionEdit,
        actor: &dyn LedgerActor,
    ) -> PayrollResult<SalaryRevision> {
        let handle = self.owner_of(id)?;
        let mut ledger = handle.lock().expect("employee ledger poisoned");
        let mutation = ledger.edit_revision(id, edit, actor)?;
        mutation
            .primary()
            .cloned()
            .ok_or_else(|| PayrollError::integrity("edit produced no revision"))
    }

    pub fn delete_revision(
        &self,
        id: RevisionId,
        actor: &dyn LedgerActor,
    ) -> PayrollResult<LedgerMutation> {
        let handle = self.owner_of(id)?;
        let mut ledger = handle.lock().expect("employee ledger poisoned");
        let mutation = ledger.delete_revision(id, actor)?;
        self.owners.write().expect("salary ledger poisoned").remove(&id);
        Ok(mutation)
    }

    pub fn active_revision_at(&self, emp_id: &str, date: NaiveDate) -> PayrollResult<SalaryRevision> {
        let handle = self
            .existing(emp_id)
            .ok_or_else(|| PayrollError::NotFound(format!("no salary revisions for {emp_id}")))?;
        let ledger = handle.lock().expect("employee ledger poisoned");
        ledger.active_at(date).cloned()
    }

    /// Newest first; empty when the employee has no revisions.
    pub fn history(&self, emp_id: &str) -> Vec<SalaryRevision> {
        self.existing(emp_id)
            .map(|handle| handle.lock().expect("employee ledger poisoned").history())
            .unwrap_or_default()
    }

    pub fn gaps(&self, emp_id: &str) -> Vec<LedgerGap> {
        self.existing(emp_id)
            .map(|handle| handle.lock().expect("employee ledger poisoned").gaps())
            .unwrap_or_default()
    }
}

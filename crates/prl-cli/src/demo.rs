//! Built-in merge scenarios over a scratch in-memory store.
//!
//! Two branches grow from a shared genesis, are analyzed, and are merged with
//! explicit resolutions. A third scenario shows collision detection. Ids are
//! sequential so runs are reproducible apart from timestamps.

use std::collections::BTreeMap;

use colored::Colorize;
use prl_canon::Value;
use prl_identity::{detect_collision, IdentityAnchor};
use prl_lineage::{
    Commit, CommitId, CommitRequest, InMemoryLineageStore, LineageStore, Operation, Subject,
};
use prl_merge::{analyze, commit_merge, MergeDecision, MergeIdentity};
use serde_json::json;

use crate::cli::{OutputFormat, Scenario};
use crate::output::{commit_json, print_commit_line, print_decision, print_json};

const KIND: &str = "motif";
const NAMESPACE: &str = "A1.demo";

pub fn run(scenario: Scenario, format: OutputFormat) -> anyhow::Result<()> {
    let mut reports = Vec::new();
    if matches!(scenario, Scenario::All | Scenario::NoConflict) {
        reports.push(no_conflict()?);
    }
    if matches!(scenario, Scenario::All | Scenario::Conflict) {
        reports.push(conflict()?);
    }
    if matches!(scenario, Scenario::All | Scenario::Collision) {
        reports.push(collision()?);
    }

    match format {
        OutputFormat::Json => {
            let all: Vec<serde_json::Value> = reports.iter().map(Report::to_json).collect();
            print_json(&json!(all))
        }
        OutputFormat::Text => {
            for report in &reports {
                report.print();
            }
            Ok(())
        }
    }
}

struct Report {
    title: &'static str,
    lineage: Vec<Commit>,
    decision: Option<MergeDecision>,
    merged: Vec<Commit>,
    collision: Option<String>,
}

impl Report {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            lineage: Vec::new(),
            decision: None,
            merged: Vec::new(),
            collision: None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "scenario": self.title,
            "lineage": self.lineage.iter().map(commit_json).collect::<Vec<_>>(),
            "decision": self.decision,
            "merge_commits": self.merged.iter().map(commit_json).collect::<Vec<_>>(),
            "collision": self.collision,
        })
    }

    fn print(&self) {
        let rule = "=".repeat(self.title.len());
        println!("\n{rule}\n{}\n{rule}", self.title.bold());
        if !self.lineage.is_empty() {
            println!("\nLineage:");
            for commit in &self.lineage {
                print_commit_line(commit);
            }
        }
        if let Some(decision) = &self.decision {
            println!();
            print_decision(decision);
        }
        if !self.merged.is_empty() {
            println!("\nMerge commits:");
            for commit in &self.merged {
                print_commit_line(commit);
            }
        }
        if self.decision.is_none() {
            match &self.collision {
                Some(reason) => println!("{} {}", "✗ collision:".red().bold(), reason),
                None => println!("{} no collision", "✓".green()),
            }
        }
    }
}

fn motif(statement: &str, tensions: &[&str]) -> Value {
    Value::map([
        ("statement", Value::from(statement)),
        ("tensions", Value::list(tensions.iter().copied())),
        (
            "metadata",
            Value::map([("format", "toy"), ("role", "structural_payload")]),
        ),
    ])
}

fn subject_of(payload: &Value) -> anyhow::Result<Subject> {
    Ok(Subject::from(&IdentityAnchor::create_global(KIND, NAMESPACE, payload)?))
}

fn append(
    store: &mut InMemoryLineageStore,
    op: Operation,
    subject: Subject,
    payload: Value,
    parent: &CommitId,
    note: &str,
) -> anyhow::Result<CommitId> {
    let request = CommitRequest::new(op, subject, payload)
        .with_parent(parent.clone())
        .with_note(note);
    Ok(store.append(request)?.id)
}

fn motif_a() -> Value {
    motif("Never let inference write persistence.", &["speed vs stability"])
}

/// Genesis milestone, then motif A on the shared trunk. Returns the trunk head.
fn seed(store: &mut InMemoryLineageStore) -> anyhow::Result<CommitId> {
    let request = CommitRequest::new(
        Operation::Milestone,
        subject_of(&motif("GENESIS", &[]))?,
        Value::map([("milestone", "genesis")]),
    )
    .with_note("genesis");
    let genesis = store.append(request)?.id;
    let a = motif_a();
    append(store, Operation::Add, subject_of(&a)?, a, &genesis, "add motif A")
}

/// Refine A in place, then add B.
fn branch_left(store: &mut InMemoryLineageStore, trunk: &CommitId) -> anyhow::Result<CommitId> {
    let a2 = motif(
        "Never let inference write persistence (write barrier is non-negotiable).",
        &["speed vs stability", "convenience vs discipline"],
    );
    let c1 = append(
        store,
        Operation::Replace,
        subject_of(&motif_a())?,
        a2,
        trunk,
        "L: refine motif A",
    )?;
    let b = motif(
        "Append-only lineage defines identity boundaries.",
        &["storage cost vs auditability"],
    );
    append(store, Operation::Add, subject_of(&b)?, b, &c1, "L: add motif B")
}

/// Optionally refine A differently, then add C.
fn branch_right(
    store: &mut InMemoryLineageStore,
    trunk: &CommitId,
    diverge: bool,
) -> anyhow::Result<CommitId> {
    let mut head = trunk.clone();
    if diverge {
        let alt = motif(
            "Avoid direct writes from inference; prefer governance commits.",
            &["iteration speed vs correctness"],
        );
        head = append(
            store,
            Operation::Replace,
            subject_of(&motif_a())?,
            alt,
            &head,
            "R: refine motif A differently",
        )?;
    }
    let c = motif(
        "Non-queryability is a design property, not a policy.",
        &["debuggability vs collapse risk"],
    );
    append(store, Operation::Add, subject_of(&c)?, c, &head, "R: add motif C")
}

fn merge(
    store: &mut InMemoryLineageStore,
    decision: &MergeDecision,
    resolutions: &BTreeMap<String, Value>,
    note: &str,
) -> anyhow::Result<Vec<Commit>> {
    Ok(commit_merge(
        store,
        (decision.left(), decision.right()),
        decision,
        resolutions,
        &MergeIdentity::global(KIND, NAMESPACE),
        note,
    )?)
}

fn no_conflict() -> anyhow::Result<Report> {
    let mut report = Report::new("Scenario 1: branches add different motifs (no direct conflicts)");
    let mut store = InMemoryLineageStore::sequential();
    let base = seed(&mut store)?;
    let left = branch_left(&mut store, &base)?;
    let right = branch_right(&mut store, &base, false)?;

    let decision = analyze(&store, &left, &right)?;
    let resolutions = decision.proposed_payloads(&store)?;
    report.lineage = store.all_commits().into_iter().cloned().collect();
    report.merged = merge(&mut store, &decision, &resolutions, "MERGE: scenario 1")?;
    report.decision = Some(decision);
    Ok(report)
}

fn conflict() -> anyhow::Result<Report> {
    let mut report =
        Report::new("Scenario 2: divergent updates (structural conflict requiring explicit decision)");
    let mut store = InMemoryLineageStore::sequential();
    let base = seed(&mut store)?;
    let left = branch_left(&mut store, &base)?;
    let right = branch_right(&mut store, &base, true)?;

    let decision = analyze(&store, &left, &right)?;
    let mut resolutions = decision.proposed_payloads(&store)?;
    // Resolve each conflict with a new payload capturing both framings; the
    // committer turns it into a replace under a new anchor.
    for conflict in decision.conflicts() {
        resolutions.insert(
            conflict.subject_id.clone(),
            motif(
                "Write barrier: prohibit inference writes; governance commits only (captures both framings).",
                &["speed vs stability", "iteration vs correctness"],
            ),
        );
    }
    report.lineage = store.all_commits().into_iter().cloned().collect();
    report.merged = merge(
        &mut store,
        &decision,
        &resolutions,
        "MERGE: scenario 2 (explicit resolution)",
    )?;
    report.decision = Some(decision);
    Ok(report)
}

fn collision() -> anyhow::Result<Report> {
    let mut report = Report::new("Scenario 3: identity collision / mismatch detection");
    let p = motif("Scope-first: persistence is bounded by scope.", &[]);
    let q = motif(
        "Scope-first: persistence is bounded by scope (but secretly changed).",
        &[],
    );
    let anchor = IdentityAnchor::create_global(KIND, NAMESPACE, &p)?;
    report.collision = detect_collision(&anchor, &p, &q).map(|c| c.to_string());
    Ok(report)
}

use colored::Colorize;
use prl_lineage::Commit;
use prl_merge::MergeDecision;
use serde_json::json;

pub fn commit_json(commit: &Commit) -> serde_json::Value {
    json!({
        "id": commit.id,
        "timestamp_ms": commit.timestamp_ms,
        "parents": commit.parents,
        "operation": commit.operation,
        "subject": commit.subject,
        "payload": commit.payload.to_json(),
        "note": commit.note,
    })
}

pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_commit_line(commit: &Commit) {
    let parents = if commit.parents.is_empty() {
        "-".to_owned()
    } else {
        commit
            .parents
            .iter()
            .map(|p| p.short().to_owned())
            .collect::<Vec<_>>()
            .join(",")
    };
    println!(
        "{}  {:<13}  subject={}  parents={}  {}",
        commit.id.short().yellow(),
        commit.operation.as_str().cyan(),
        commit.subject.id.get(..12).unwrap_or(&commit.subject.id),
        parents.as_str().dimmed(),
        commit.note
    );
}

pub fn print_commit_detail(commit: &Commit) {
    println!("commit {}", commit.id.as_str().yellow().bold());
    println!("  Timestamp: {}", commit.timestamp_ms);
    if !commit.parents.is_empty() {
        let parents: Vec<&str> = commit.parents.iter().map(|p| p.as_str()).collect();
        println!("  Parents:   {}", parents.join(" "));
    }
    println!("  Operation: {}", commit.operation.as_str().cyan());
    println!("  Subject:   {}", commit.subject.id);
    println!(
        "             {}/{} @ {}",
        commit.subject.namespace, commit.subject.kind, commit.subject.scope
    );
    if !commit.note.is_empty() {
        println!("  Note:      {}", commit.note);
    }
    println!("  Payload:   {}", commit.payload);
}

pub fn print_decision(decision: &MergeDecision) {
    let base = decision.base().map_or("(no base)", |b| b.short());
    println!(
        "Merge {} <- {} + {}",
        base.bold(),
        decision.left().short().yellow(),
        decision.right().short().yellow()
    );

    println!("\n{} ({})", "Actions".bold(), decision.actions().len());
    for action in decision.actions() {
        println!(
            "  {} {:<14} {}",
            "✓".green(),
            action.proposal.as_str().green(),
            action.subject_id
        );
        println!("      {}", action.reason.dimmed());
    }

    println!("\n{} ({})", "Conflicts".bold(), decision.conflicts().len());
    for conflict in decision.conflicts() {
        println!(
            "  {} {:<14} {}",
            "✗".red(),
            conflict.kind.to_string().as_str().red(),
            conflict.subject_id
        );
        println!("      {}", conflict.reason.dimmed());
        println!(
            "      left {}  right {}",
            conflict.left_commit.short(),
            conflict.right_commit.short()
        );
    }

    if !decision.is_clean() {
        println!(
            "\n{} conflicts need an explicit decision: accept left, accept right, \
             replace with a new payload, or keep both",
            "note:".yellow()
        );
    }
}

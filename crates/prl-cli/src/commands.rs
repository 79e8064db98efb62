use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use prl_canon::{canonicalize, Value};
use prl_identity::{detect_collision, IdentityAnchor};
use prl_lineage::{CommitId, CommitRequest, FileLineageStore, LineageStore, Operation, Subject};
use prl_merge::{analyze, commit_merge, MergeIdentity};
use serde_json::json;
use tracing::debug;

use crate::cli::*;
use crate::config::{CliConfig, IdentityConfig};
use crate::demo;
use crate::output::{commit_json, print_commit_detail, print_commit_line, print_decision, print_json};

struct Session {
    config: CliConfig,
    store_path: PathBuf,
    format: OutputFormat,
}

impl Session {
    fn open_store(&self) -> anyhow::Result<FileLineageStore> {
        debug!(path = %self.store_path.display(), "opening lineage store");
        FileLineageStore::open(&self.store_path, self.config.store.file_store_config())
            .with_context(|| format!("opening lineage log {}", self.store_path.display()))
    }

    fn identity(&self, args: &IdentityArgs) -> IdentityConfig {
        let defaults = &self.config.identity;
        IdentityConfig {
            kind: args.kind.clone().unwrap_or_else(|| defaults.kind.clone()),
            namespace: args.namespace.clone().unwrap_or_else(|| defaults.namespace.clone()),
            scope: args.scope.clone().unwrap_or_else(|| defaults.scope.clone()),
        }
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let ctx = Session {
        store_path: cli.store.unwrap_or_else(|| config.store.path.clone()),
        config,
        format: cli.format,
    };
    match cli.command {
        Command::Canon(args) => cmd_canon(&ctx, args),
        Command::Anchor(args) => cmd_anchor(&ctx, args),
        Command::Append(args) => cmd_append(&ctx, args),
        Command::Log(args) => cmd_log(&ctx, args),
        Command::Show(args) => cmd_show(&ctx, args),
        Command::Ancestors(args) => cmd_ancestors(&ctx, args),
        Command::Lca(args) => cmd_lca(&ctx, args),
        Command::Analyze(args) => cmd_analyze(&ctx, args),
        Command::Resolve(args) => cmd_resolve(&ctx, args),
        Command::Demo(args) => demo::run(args.scenario, ctx.format),
    }
}

/// Read a literal argument, `@path`, or `-` for stdin.
fn read_input(arg: &str) -> anyhow::Result<String> {
    if arg == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else if let Some(path) = arg.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
    } else {
        Ok(arg.to_owned())
    }
}

fn parse_payload(arg: &str) -> anyhow::Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(&read_input(arg)?).context("payload is not valid JSON")?;
    Ok(Value::try_from(json)?)
}

/// Accept a full commit id or a unique prefix of one.
fn resolve_commit<S: LineageStore>(store: &S, arg: &str) -> anyhow::Result<CommitId> {
    let exact = CommitId::from(arg);
    if store.exists(&exact) {
        return Ok(exact);
    }
    let matches: Vec<&CommitId> = store
        .all_commits()
        .into_iter()
        .map(|c| &c.id)
        .filter(|id| id.as_str().starts_with(arg))
        .collect();
    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(anyhow!("unknown commit: {arg}")),
        _ => Err(anyhow!("ambiguous commit prefix {arg} ({} matches)", matches.len())),
    }
}

fn cmd_canon(ctx: &Session, args: CanonArgs) -> anyhow::Result<()> {
    let canonical = canonicalize(&parse_payload(&args.payload)?)?;
    if ctx.json() {
        print_json(&json!({ "canonical": canonical }))
    } else {
        println!("{canonical}");
        Ok(())
    }
}

fn cmd_anchor(ctx: &Session, args: AnchorArgs) -> anyhow::Result<()> {
    let identity = ctx.identity(&args.identity);
    let payload = parse_payload(&args.payload)?;
    let anchor = IdentityAnchor::create(
        identity.kind,
        identity.namespace,
        identity.scope,
        &payload,
    )?;
    let collision = match &args.observed {
        Some(observed) => detect_collision(&anchor, &payload, &parse_payload(observed)?),
        None => None,
    };

    if ctx.json() {
        let mut out = json!({ "anchor": anchor });
        if args.observed.is_some() {
            out["collision"] = json!(collision.as_ref().map(|c| c.to_string()));
        }
        return print_json(&out);
    }

    println!("{} {}", "Anchor".bold(), anchor.id().yellow());
    println!("  Short:     {}", anchor.short(10));
    println!("  Kind:      {}", anchor.kind());
    println!("  Namespace: {}", anchor.namespace());
    println!("  Scope:     {}", anchor.scope());
    println!("  Version:   {}", anchor.version());
    if args.observed.is_some() {
        match collision {
            Some(reason) => println!("{} {}", "✗ collision:".red().bold(), reason),
            None => println!("{} observed payload reconstructs the anchor", "✓".green()),
        }
    }
    Ok(())
}

fn cmd_append(ctx: &Session, args: AppendArgs) -> anyhow::Result<()> {
    let mut store = ctx.open_store()?;
    let operation: Operation = args.op.parse().map_err(|e: String| anyhow!(e))?;
    let identity = ctx.identity(&args.identity);
    let payload = parse_payload(&args.payload)?;
    let subject = match args.subject {
        Some(id) => Subject::new(id, identity.kind, identity.namespace, identity.scope),
        None => Subject::from(&IdentityAnchor::create(
            identity.kind,
            identity.namespace,
            identity.scope,
            &payload,
        )?),
    };
    let parents = args
        .parents
        .iter()
        .map(|p| resolve_commit(&store, p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let commit = store.append(
        CommitRequest::new(operation, subject, payload)
            .with_parents(parents)
            .with_note(args.note),
    )?;

    if ctx.json() {
        print_json(&commit_json(&commit))
    } else {
        println!("{} Appended {}", "✓".green().bold(), commit.id.as_str().yellow());
        print_commit_line(&commit);
        Ok(())
    }
}

fn cmd_log(ctx: &Session, args: LogArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let all = store.all_commits();
    let skip = args.limit.map_or(0, |n| all.len().saturating_sub(n));
    let shown = &all[skip..];

    if ctx.json() {
        return print_json(&json!(shown.iter().map(|c| commit_json(c)).collect::<Vec<_>>()));
    }
    if shown.is_empty() {
        println!("No commits.");
    }
    for commit in shown {
        if args.oneline {
            print_commit_line(commit);
        } else {
            print_commit_detail(commit);
            println!();
        }
    }
    Ok(())
}

fn cmd_show(ctx: &Session, args: ShowArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let commit = store.get(&resolve_commit(&store, &args.commit)?)?;
    if ctx.json() {
        let mut out = commit_json(commit);
        out["children"] = json!(store.children_of(&commit.id));
        print_json(&out)
    } else {
        print_commit_detail(commit);
        let children = store.children_of(&commit.id);
        if !children.is_empty() {
            let children: Vec<&str> = children.iter().map(|c| c.short()).collect();
            println!("  Children:  {}", children.join(" "));
        }
        Ok(())
    }
}

fn cmd_ancestors(ctx: &Session, args: AncestorsArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let id = resolve_commit(&store, &args.commit)?;
    let ancestors = store.ancestors_of(&id)?;
    if ctx.json() {
        return print_json(&json!({ "commit": id, "ancestors": ancestors }));
    }
    println!("{} ancestors of {}", ancestors.len(), id.as_str().yellow());
    for commit in store.all_commits() {
        if ancestors.contains(&commit.id) {
            print_commit_line(commit);
        }
    }
    Ok(())
}

fn cmd_lca(ctx: &Session, args: LcaArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let left = resolve_commit(&store, &args.left)?;
    let right = resolve_commit(&store, &args.right)?;
    let candidates = store.lca_candidates(&left, &right)?;
    let latest = store
        .all_commits()
        .into_iter()
        .filter(|c| candidates.contains(&c.id))
        .last()
        .map(|c| c.id.clone());

    if ctx.json() {
        return print_json(&json!({ "candidates": candidates, "most_recent": latest }));
    }
    if candidates.is_empty() {
        println!("No common ancestors.");
        return Ok(());
    }
    for id in &candidates {
        let marker = if Some(id) == latest.as_ref() { "*".green().bold() } else { " ".normal() };
        println!("{marker} {}", id);
    }
    Ok(())
}

fn cmd_analyze(ctx: &Session, args: AnalyzeArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let left = resolve_commit(&store, &args.left)?;
    let right = resolve_commit(&store, &args.right)?;
    let decision = analyze(&store, &left, &right)?;
    if ctx.json() {
        print_json(&serde_json::to_value(&decision)?)
    } else {
        print_decision(&decision);
        Ok(())
    }
}

fn cmd_resolve(ctx: &Session, args: ResolveArgs) -> anyhow::Result<()> {
    let mut store = ctx.open_store()?;
    let left = resolve_commit(&store, &args.left)?;
    let right = resolve_commit(&store, &args.right)?;
    let decision = analyze(&store, &left, &right)?;

    let mut resolutions: BTreeMap<String, Value> = if args.accept_proposals {
        decision.proposed_payloads(&store)?
    } else {
        BTreeMap::new()
    };
    if let Some(arg) = &args.resolutions {
        let explicit: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&read_input(arg)?).context("resolutions must be a JSON object")?;
        for (subject, payload) in explicit {
            resolutions.insert(subject, Value::try_from(payload)?);
        }
    }

    let unresolved: Vec<&str> = decision
        .conflicts()
        .iter()
        .map(|c| c.subject_id.as_str())
        .filter(|s| !resolutions.contains_key(*s))
        .collect();
    if !unresolved.is_empty() {
        bail!(
            "{} conflict(s) have no resolution: {}",
            unresolved.len(),
            unresolved.join(", ")
        );
    }
    if resolutions.is_empty() {
        bail!("nothing to commit; pass --resolutions or --accept-proposals");
    }

    let identity = ctx.identity(&args.identity);
    let identity = MergeIdentity::new(identity.kind, identity.namespace, identity.scope);
    let created = commit_merge(
        &mut store,
        (&left, &right),
        &decision,
        &resolutions,
        &identity,
        &args.note,
    )?;

    if ctx.json() {
        return print_json(&json!(created.iter().map(commit_json).collect::<Vec<_>>()));
    }
    println!("{} Created {} merge commit(s)", "✓".green().bold(), created.len());
    for commit in &created {
        print_commit_line(commit);
    }
    Ok(())
}

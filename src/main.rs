use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use regroup_lib::commands::{exit_guard, AppContext};
use regroup_lib::config::AppConfig;
use regroup_lib::core::session::ReviewSession;
use regroup_lib::core::view::PageView;
use regroup_lib::core::Proposal;
use std::path::PathBuf;

/// Merge targets are narrowed by a name filter past this many choices.
const MERGE_FILTER_THRESHOLD: usize = 10;

#[derive(Parser, Debug)]
#[command(
    name = "regroup",
    version,
    about = "Review proposed groupings of project file versions"
)]
struct Cli {
    /// Data directory (default: $REGROUP_HOME or <Documents>/Regroup)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Database file name inside the data directory
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scanned file records
    Files {
        #[command(subcommand)]
        command: FilesCmd,
    },

    /// Review a proposal export interactively
    Review {
        /// JSON export from the grouping backend
        #[arg(value_name = "PROPOSALS")]
        proposals: PathBuf,
        /// Approve every high-confidence group and exit
        #[arg(long)]
        approve_high: bool,
    },

    /// Confirmed groups
    Groups {
        #[command(subcommand)]
        command: GroupsCmd,
    },
}

#[derive(Subcommand, Debug)]
enum FilesCmd {
    /// Import file records from a JSON array
    Import {
        #[arg(value_name = "JSON")]
        path: PathBuf,
    },
    /// List imported file records
    List,
}

#[derive(Subcommand, Debug)]
enum GroupsCmd {
    /// List confirmed groups
    List,
    /// Delete every confirmed group
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.data_dir.as_deref()).context("Failed to load config")?;
    if let Some(db) = cli.db {
        config.database_file = db;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let ctx = AppContext::open(config)?;

    match cli.command {
        Commands::Files { command } => match command {
            FilesCmd::Import { path } => {
                let count = ctx.import_files(&path)?;
                println!("Imported {} file record(s).", count);
            }
            FilesCmd::List => {
                let files = ctx.list_files()?;
                if files.is_empty() {
                    println!("No file records.");
                }
                for file in files {
                    let bpm = file
                        .bpm
                        .map(|b| format!("{:.0} BPM", b))
                        .unwrap_or_else(|| "\u{2014}".to_string());
                    println!("{}  {}  {}", file.hash, bpm, file.path);
                }
            }
        },

        Commands::Review {
            proposals,
            approve_high,
        } => {
            if approve_high {
                let outcome = ctx.approve_high_once(&proposals).await?;
                println!(
                    "Approved {} high-confidence group(s); {} left for review.",
                    outcome.confirmed, outcome.remaining
                );
            } else {
                let mut session = ctx.open_session(&proposals).await;
                review_loop(&ctx, &mut session).await?;
            }
        }

        Commands::Groups { command } => match command {
            GroupsCmd::List => {
                let groups = ctx.list_groups()?;
                if groups.is_empty() {
                    println!("No confirmed groups.");
                }
                for group in groups {
                    println!(
                        "{} ({} file(s), {} ignored)",
                        group.canonical_name,
                        group.files.len(),
                        group.files.len() - group.active_count()
                    );
                    for file in &group.files {
                        let marker = if file.is_ignored { " [ignored]" } else { "" };
                        println!("   {}{}", file.hash, marker);
                    }
                }
            }
            GroupsCmd::Reset { yes } => {
                let go = yes
                    || Confirm::new()
                        .with_prompt("Delete every confirmed group?")
                        .default(false)
                        .interact()?;
                if go {
                    let removed = ctx.reset_groups()?;
                    println!("Removed {} confirmed group(s).", removed);
                }
            }
        },
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Next,
    Previous,
    Merge,
    Split,
    Assign,
    Ignore,
    Unignore,
    Rename,
    ApproveHigh,
    ConfirmAll,
    Quit,
}

impl Action {
    fn label(&self, session: &ReviewSession) -> String {
        match self {
            Action::Next => "Next page".to_string(),
            Action::Previous => "Previous page".to_string(),
            Action::Merge => "Merge a group into another".to_string(),
            Action::Split => "Split files out of a group".to_string(),
            Action::Assign => "Assign an ungrouped file".to_string(),
            Action::Ignore => "Ignore a file".to_string(),
            Action::Unignore => "Un-ignore a file".to_string(),
            Action::Rename => "Rename a group".to_string(),
            Action::ApproveHigh => format!(
                "Approve all high-confidence ({})",
                session.high_confidence_count()
            ),
            Action::ConfirmAll => "Confirm all".to_string(),
            Action::Quit => "Quit".to_string(),
        }
    }
}

fn available_actions(session: &ReviewSession) -> Vec<Action> {
    let view = session.page_view();
    let store = session.store();
    let mut actions = Vec::new();

    if view.has_next() {
        actions.push(Action::Next);
    }
    if view.has_previous() {
        actions.push(Action::Previous);
    }
    if store.grouped_count() >= 2 {
        actions.push(Action::Merge);
    }
    if store.grouped().any(|g| g.len() >= 2) {
        actions.push(Action::Split);
    }
    if !store.ungrouped_files().is_empty() && store.grouped_count() > 0 {
        actions.push(Action::Assign);
    }
    if store.groups().iter().any(|g| g.file_hashes.iter().any(|h| !store.is_ignored(h))) {
        actions.push(Action::Ignore);
    }
    if store.ignored_count() > 0 {
        actions.push(Action::Unignore);
    }
    if store.grouped_count() > 0 {
        actions.push(Action::Rename);
    }
    if session.high_confidence_count() > 0 {
        actions.push(Action::ApproveHigh);
    }
    if !store.is_empty() {
        actions.push(Action::ConfirmAll);
    }
    actions.push(Action::Quit);
    actions
}

async fn review_loop(ctx: &AppContext, session: &mut ReviewSession) -> Result<()> {
    let sink = ctx.sink();

    loop {
        render(session);

        if let Some(err) = session.last_error() {
            eprintln!("\n{}", err);
            session.dismiss_error();
        }

        let actions = available_actions(session);
        let labels: Vec<String> = actions.iter().map(|a| a.label(session)).collect();
        let choice = Select::new()
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[choice] {
            Action::Next => session.next_page(),
            Action::Previous => session.prev_page(),
            Action::Merge => merge(session)?,
            Action::Split => split(session)?,
            Action::Assign => assign(session)?,
            Action::Ignore => ignore(session)?,
            Action::Unignore => unignore(session)?,
            Action::Rename => rename(session)?,
            Action::ApproveHigh => {
                if let Ok(count) = session.approve_high_confidence(&sink).await {
                    println!("Approved {} group(s).", count);
                }
            }
            Action::ConfirmAll => {
                if let Ok(count) = session.confirm_all(&sink).await {
                    println!("Confirmed {} group(s). Review complete.", count);
                    return Ok(());
                }
            }
            Action::Quit => {
                let leave = exit_guard(session, || {
                    Ok(Confirm::new()
                        .with_prompt("Discard unsaved edits?")
                        .default(false)
                        .interact()?)
                })?;
                if leave {
                    return Ok(());
                }
            }
        }
    }
}

fn render(session: &ReviewSession) {
    let view: PageView<'_> = session.page_view();
    let store = session.store();

    println!();
    if view.total_grouped == 0 {
        println!("No groups to review.");
    } else {
        println!("{}  ({})", view.counter_label(), view.page_label());
    }

    for card in &view.groups {
        let muted = if card.fully_ignored { "  [all ignored]" } else { "" };
        println!("\n{}{}", card.header_label(view.total_grouped), muted);
        println!("  {}", card.group.canonical_name);
        for file in &card.files {
            let marker = if file.ignored { "x" } else { " " };
            println!(
                "   [{}] {:<40} {:>5}  {}",
                marker,
                file.name(),
                file.bpm_label(),
                file.date_label()
            );
        }
    }

    let loose = store.ungrouped_files();
    if !loose.is_empty() {
        println!("\nUngrouped ({})", loose.len());
        for file in &loose {
            let marker = if file.row.ignored { "x" } else { " " };
            println!("   [{}] {}", marker, file.row.name());
        }
    }

    if store.ignored_count() > 0 {
        println!("\nIgnored files: {}", store.ignored_count());
    }
}

fn pick_group<'a>(prompt: &str, groups: &[&'a Proposal]) -> Result<Option<&'a Proposal>> {
    if groups.is_empty() {
        println!("No groups match.");
        return Ok(None);
    }
    let labels: Vec<String> = groups
        .iter()
        .map(|g| format!("{} ({} file(s))", g.canonical_name, g.len()))
        .collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(choice.map(|i| groups[i]))
}

fn merge(session: &mut ReviewSession) -> Result<()> {
    let store = session.store();
    let sources: Vec<&Proposal> = store.grouped().collect();
    let Some(source) = pick_group("Merge which group", &sources)? else {
        return Ok(());
    };
    let source_id = source.id.clone();

    let mut filter = None;
    if store.merge_targets(&source_id, None).len() > MERGE_FILTER_THRESHOLD {
        let text: String = Input::new()
            .with_prompt("Filter targets by name")
            .allow_empty(true)
            .interact_text()?;
        filter = Some(text);
    }
    let targets = store.merge_targets(&source_id, filter.as_deref());
    let Some(target) = pick_group("Into", &targets)? else {
        return Ok(());
    };
    let target_id = target.id.clone();

    session.merge(&source_id, &target_id);
    Ok(())
}

fn split(session: &mut ReviewSession) -> Result<()> {
    let store = session.store();
    let candidates: Vec<&Proposal> = store.grouped().filter(|g| g.len() >= 2).collect();
    let Some(group) = pick_group("Split which group", &candidates)? else {
        return Ok(());
    };
    let group_id = group.id.clone();
    let hashes = group.file_hashes.clone();
    let labels: Vec<String> = hashes
        .iter()
        .map(|h| store.file_detail(h).map(|d| d.file_name()).unwrap_or_else(|| h.clone()))
        .collect();

    let picked = MultiSelect::new()
        .with_prompt("Files to move into a new group (space to toggle)")
        .items(&labels)
        .interact()?;

    if !session.begin_split(&group_id) {
        return Ok(());
    }
    for index in picked {
        session.toggle_split_file(&hashes[index]);
    }
    if session.confirm_split().is_none() {
        println!("Pick at least one file and leave at least one behind.");
    }
    Ok(())
}

fn assign(session: &mut ReviewSession) -> Result<()> {
    let store = session.store();
    let loose = store.ungrouped_files();
    let labels: Vec<String> = loose.iter().map(|f| f.row.name()).collect();
    let Some(index) = Select::new()
        .with_prompt("Assign which file")
        .items(&labels)
        .default(0)
        .interact_opt()?
    else {
        return Ok(());
    };
    let hash = loose[index].row.hash.to_string();
    let bucket_id = loose[index].bucket_id.to_string();

    let targets = store.assign_targets();
    let Some(target) = pick_group("To group", &targets)? else {
        return Ok(());
    };
    let target_id = target.id.clone();

    session.assign_ungrouped(&hash, &bucket_id, &target_id);
    Ok(())
}

fn ignore(session: &mut ReviewSession) -> Result<()> {
    let store = session.store();
    let active: Vec<(String, String)> = store
        .groups()
        .iter()
        .flat_map(|g| {
            g.file_hashes.iter().filter(move |h| !store.is_ignored(h)).map(move |h| {
                let name = store.file_detail(h).map(|d| d.file_name()).unwrap_or_else(|| h.clone());
                (h.clone(), format!("{}  ({})", name, g.canonical_name))
            })
        })
        .collect();
    let labels: Vec<&str> = active.iter().map(|(_, label)| label.as_str()).collect();

    if let Some(index) = Select::new()
        .with_prompt("Ignore which file")
        .items(&labels)
        .default(0)
        .interact_opt()?
    {
        let hash = active[index].0.clone();
        session.ignore(&hash);
    }
    Ok(())
}

fn unignore(session: &mut ReviewSession) -> Result<()> {
    let store = session.store();
    let ignored: Vec<(String, String)> = store
        .ignored_files()
        .iter()
        .map(|row| (row.hash.to_string(), row.name()))
        .collect();
    let labels: Vec<&str> = ignored.iter().map(|(_, name)| name.as_str()).collect();

    if let Some(index) = Select::new()
        .with_prompt("Un-ignore which file")
        .items(&labels)
        .default(0)
        .interact_opt()?
    {
        let hash = ignored[index].0.clone();
        session.unignore(&hash);
    }
    Ok(())
}

fn rename(session: &mut ReviewSession) -> Result<()> {
    let store = session.store();
    let groups: Vec<&Proposal> = store.grouped().collect();
    let Some(group) = pick_group("Rename which group", &groups)? else {
        return Ok(());
    };
    let group_id = group.id.clone();
    let current = group.canonical_name.clone();

    let name: String = Input::new()
        .with_prompt("New name")
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()?;
    session.rename(&group_id, &name);
    Ok(())
}

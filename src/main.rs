//! todo-sync - personal task tracker mirrored to Discord.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use todo_sync::app::{Mirror, Workspace};
use todo_sync::report::{exceeds_message_limit, MESSAGE_LIMIT};
use todo_sync::sync::{CurlTransport, MessageId, PresetIds, PromptIdSource, Role};
use todo_sync::{ClearTarget, Paths, Result, Task, TaskId, Transition};

#[derive(Parser)]
#[command(name = "todo-sync")]
#[command(version)]
#[command(about = "Personal task tracker mirrored to two Discord webhook messages", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding todo.json (defaults to current directory)
    #[arg(short, long, global = true, env = "TODO_SYNC_DIR", default_value = ".")]
    dir: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not mirror changes to Discord
    #[arg(long, global = true)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new pending task
    Add {
        /// Task description
        name: String,

        /// Where in the code the task lives, e.g. src/main.rs:42
        #[arg(default_value = "")]
        code_pointer: String,
    },

    /// Mark a task as done
    Tick {
        /// Task ID
        id: TaskId,
    },

    /// Mark a task as pending again
    Untick {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },

    /// Replace the name and code pointer of a task
    Edit {
        /// Task ID
        id: TaskId,

        /// New task description
        name: String,

        /// New code pointer
        #[arg(default_value = "")]
        code_pointer: String,
    },

    /// Show a single task
    View {
        /// Task ID
        id: TaskId,
    },

    /// Show all tasks and refresh the mirror
    List,

    /// Remove tasks in bulk: all, pending, or done
    Clear {
        /// Which tasks to remove
        target: ClearTarget,
    },

    /// Create both Discord messages and remember their IDs
    Setup {
        /// Discord webhook URL
        endpoint: String,

        /// ID of the new PENDING message (prompted for if omitted)
        #[arg(long, value_name = "ID")]
        pending_id: Option<MessageId>,

        /// ID of the new DONE message (prompted for if omitted)
        #[arg(long, value_name = "ID")]
        done_id: Option<MessageId>,
    },

    /// Push the current task list to both messages
    Sync,

    /// Start a fresh DONE message when the current one is full
    CreateDoneMessage {
        /// ID of the new DONE message (prompted for if omitted)
        #[arg(long, value_name = "ID")]
        message_id: Option<MessageId>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "todo_sync=debug,info"
    } else {
        "todo_sync=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths::new(&cli.dir);
    let mut workspace = Workspace::open(paths, CurlTransport::new())?.with_sync(!cli.no_sync);

    match cli.command {
        Commands::Add { name, code_pointer } => {
            let applied = workspace.add(&name, &code_pointer).await?;
            println!("{} Added task {}: {}", "✓".green(), applied.value, name);
            report_mirror(&applied.mirror);
        }

        Commands::Tick { id } => {
            let applied = workspace.tick(id).await?;
            match applied.value {
                Transition::Changed => println!("{} Task {} marked as done", "✓".green(), id),
                Transition::Unchanged => {
                    println!("{} Task {} is already done", "•".yellow(), id);
                }
            }
            report_mirror(&applied.mirror);
        }

        Commands::Untick { id } => {
            let applied = workspace.untick(id).await?;
            match applied.value {
                Transition::Changed => println!("{} Task {} marked as pending", "✓".green(), id),
                Transition::Unchanged => {
                    println!("{} Task {} is already pending", "•".yellow(), id);
                }
            }
            report_mirror(&applied.mirror);
        }

        Commands::Delete { id } => {
            let applied = workspace.delete(id).await?;
            println!(
                "{} Deleted task {}: {}",
                "✓".green(),
                id,
                applied.value.name
            );
            report_mirror(&applied.mirror);
        }

        Commands::Edit {
            id,
            name,
            code_pointer,
        } => {
            let applied = workspace.edit(id, &name, &code_pointer).await?;
            println!("{} Updated task {}", "✓".green(), id);
            print_task(&applied.value);
            report_mirror(&applied.mirror);
        }

        Commands::View { id } => {
            print_task(workspace.view(id)?);
        }

        Commands::List => {
            let applied = workspace.list().await?;
            print!("{}", applied.value.to_text());
            for role in Role::ALL {
                if exceeds_message_limit(applied.value.section(role)) {
                    println!(
                        "{} {} list is over the {} character message limit; see {}",
                        "!".yellow(),
                        role,
                        MESSAGE_LIMIT,
                        "todo-sync create-done-message".cyan()
                    );
                }
            }
            report_mirror(&applied.mirror);
        }

        Commands::Clear { target } => {
            let applied = workspace.clear(target).await?;
            println!(
                "{} Removed {} {} task(s)",
                "✓".green(),
                applied.value,
                target
            );
            report_mirror(&applied.mirror);
        }

        Commands::Setup {
            endpoint,
            pending_id,
            done_id,
        } => {
            let mut ids = PresetIds::new(PromptIdSource::stdio())
                .with(Role::Pending, pending_id)
                .with(Role::Done, done_id);
            workspace.setup(&endpoint, &mut ids).await?;
            println!(
                "{} Remote mirror configured; settings saved to {}",
                "✓".green(),
                workspace.paths().remote_config().display()
            );
            report_shadowed(workspace.env_overrides());
        }

        Commands::Sync => {
            let summary = workspace.sync().await?;
            for (role, message_id) in &summary.edited {
                println!("{} Updated {} message {}", "✓".green(), role, message_id);
            }
        }

        Commands::CreateDoneMessage { message_id } => {
            let mut ids =
                PresetIds::new(PromptIdSource::stdio()).with(Role::Done, message_id);
            let retired = workspace.create_done_message(&mut ids).await?;
            println!("{} New DONE message created", "✓".green());
            if let Some(retired) = retired {
                println!(
                    "  Message {} is no longer updated and can be deleted",
                    retired
                );
            }
            println!("  Run {} to refresh both messages", "todo-sync sync".cyan());
            report_shadowed(workspace.env_overrides());
        }
    }

    Ok(())
}

fn report_shadowed(vars: &[&str]) {
    for var in vars {
        println!(
            "{} {} is set in the environment and overrides the saved value",
            "!".yellow(),
            var
        );
    }
}

fn print_task(task: &Task) {
    println!("{}", "─".repeat(40));
    println!("{:<14} {}", "ID:".bold(), task.id);
    println!("{:<14} {}", "Task:".bold(), task.name);
    println!("{:<14} {}", "Code Pointer:".bold(), task.code_pointer);
    println!("{:<14} {}", "Status:".bold(), task.status.label());
}

fn report_mirror(mirror: &Mirror) {
    match mirror {
        Mirror::Synced(summary) => {
            println!(
                "{} Synced {} Discord message(s)",
                "✓".green(),
                summary.edited.len()
            );
        }
        Mirror::Unconfigured => {
            println!(
                "{} Discord mirror not configured (run {})",
                "•".dimmed(),
                "todo-sync setup <webhook-url>".cyan()
            );
        }
        Mirror::Disabled | Mirror::Unchanged => {}
    }
}

// SPDX-License-Identifier: MIT

use anyhow::Context;
use cadre::adk::model::openai::OpenAIModel;
use cadre::adk::model::Model;
use cadre::config::Settings;
use cadre::graph::{CompiledGraph, GraphEvent, RunOptions, TeamState};
use cadre::memory::{FileLearningStore, LearningStore};
use cadre::run::start_run_with;
use cadre::teams::{coding_team, flat_team, hierarchical, research_team, TeamLoader};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML settings file overlaid on the environment
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a task through the hierarchical graph
    Run {
        /// The task to accomplish
        #[arg(short, long)]
        task: String,

        /// Save a reflection when the task fails
        #[arg(long)]
        reflection: bool,

        /// Save a skill when the task succeeds
        #[arg(long)]
        skill_learning: bool,

        /// Rejections tolerated before the plan proceeds (0 = never give up)
        #[arg(long)]
        max_critique_rounds: Option<u32>,

        /// Abort after this many node invocations
        #[arg(long)]
        step_limit: Option<usize>,
    },
    /// Run a task through a team declared in YAML
    Team {
        /// Path to the team definition
        #[arg(short, long)]
        file: PathBuf,

        /// The task to accomplish
        #[arg(short, long)]
        task: String,

        #[arg(long)]
        step_limit: Option<usize>,
    },
    /// Print the topology of a built-in graph or a YAML team
    Graph {
        #[arg(value_enum, default_value = "hierarchical")]
        which: BuiltIn,

        /// Describe this YAML team instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BuiltIn {
    Hierarchical,
    Flat,
    Research,
    Coding,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref())?;

    let model: Arc<dyn Model> = Arc::new(OpenAIModel::from_settings(&settings)?);
    log::info!(
        "Using model {} at {}",
        settings.model_name,
        settings.base_url
    );

    match args.command {
        Commands::Run {
            task,
            reflection,
            skill_learning,
            max_critique_rounds,
            step_limit,
        } => {
            settings.reflection_enabled |= reflection;
            settings.skill_learning_enabled |= skill_learning;
            if let Some(rounds) = max_critique_rounds {
                settings.max_critique_rounds = (rounds > 0).then_some(rounds);
            }
            if step_limit.is_some() {
                settings.step_limit = step_limit;
            }

            let graph = hierarchical(
                model.clone(),
                learning_store(&settings, model),
                &settings.hierarchical_config(),
            )?;
            execute(&graph, &task, &settings).await?;
        }
        Commands::Team {
            file,
            task,
            step_limit,
        } => {
            if step_limit.is_some() {
                settings.step_limit = step_limit;
            }
            let definition = TeamLoader::load_team(&file)
                .with_context(|| format!("loading team {}", file.display()))?;
            let graph = definition.build(model)?;
            execute(&graph, &task, &settings).await?;
        }
        Commands::Graph { which, file } => {
            let graph = match file {
                Some(file) => TeamLoader::load_team(&file)?.build(model)?,
                None => match which {
                    BuiltIn::Hierarchical => hierarchical(
                        model.clone(),
                        learning_store(&settings, model),
                        &settings.hierarchical_config(),
                    )?,
                    BuiltIn::Flat => flat_team(model)?,
                    BuiltIn::Research => research_team(model)?,
                    BuiltIn::Coding => coding_team(model)?,
                },
            };
            print!("{}", graph.describe());
        }
    }

    Ok(())
}

fn learning_store(settings: &Settings, model: Arc<dyn Model>) -> Arc<dyn LearningStore> {
    Arc::new(FileLearningStore::new(&settings.data_dir).with_analyzer(model))
}

async fn execute(graph: &CompiledGraph, task: &str, settings: &Settings) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current step");
            on_interrupt.cancel();
        }
    });

    let (tx, rx) = mpsc::channel(256);
    let printer = tokio::spawn(print_events(rx));

    let mut options = RunOptions::new().with_cancel(cancel).with_events(tx);
    options.step_limit = settings.step_limit;

    let result = start_run_with(graph, task, settings.toggles(), &options).await;
    drop(options);
    let _ = printer.await;

    match result {
        Ok(state) => {
            print_summary(&state);
            Ok(())
        }
        Err(failure) => {
            print_summary(&failure.state);
            Err(failure.into())
        }
    }
}

async fn print_events(mut rx: mpsc::Receiver<GraphEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            GraphEvent::NodeStarted { node, depth, .. } => {
                println!("{}> {}", "  ".repeat(depth), node);
            }
            GraphEvent::Routed { from, to, depth, .. } => {
                println!("{}  {} -> {}", "  ".repeat(depth), from, to);
            }
            GraphEvent::Failed { node, error, depth, .. } => {
                println!("{}! {} failed: {}", "  ".repeat(depth), node, error);
            }
            GraphEvent::NodeCompleted { .. } | GraphEvent::Finished { .. } => {}
        }
    }
}

fn print_summary(state: &TeamState) {
    println!();
    if let Some(last) = state.last_message() {
        let speaker = last.name.as_deref().unwrap_or(last.role.as_str());
        println!("{}: {}", speaker, last.content);
    }
    println!(
        "task_success: {}",
        state
            .task_success
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    for (key, value) in &state.outputs {
        println!("{}: {}", key, value);
    }
}

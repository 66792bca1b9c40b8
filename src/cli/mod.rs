// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains a solver on sentence files
//   2. `score` — loads a checkpoint and scores sentences
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ScoreArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "deep-qa",
    version = "0.1.0",
    about = "Train sentence solvers over background knowledge, then score new sentences."
)]
pub struct Cli {
    /// The subcommand to run (train or score)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::Train(args) => self.run_train(args.clone()),
            Commands::Score(args) => self.run_score(args.clone()),
        }
    }

    /// Handles the `train` subcommand.
    /// Converts CLI args into a TrainConfig and hands off to Layer 2.
    fn run_train(&self, args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on '{}'", args.train_file);

        // Convert CLI args → application config (separates presentation from domain)
        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoint saved.");
        Ok(())
    }

    /// Handles the `score` subcommand.
    /// Loads the solver from checkpoint and prints one verdict per line.
    fn run_score(&self, args: ScoreArgs) -> Result<()> {
        use crate::application::score_use_case::ScoreUseCase;

        let use_case = ScoreUseCase::new(args.checkpoint_dir.clone())?;

        // One-off sentence mode.
        if let Some(sentence) = &args.sentence {
            let verdict = use_case.score_sentence(sentence, &args.background)?;
            println!(
                "{}  p(true)={:.3}  {sentence}",
                if verdict.label { "true " } else { "false" },
                verdict.true_probability,
            );
            return Ok(());
        }

        // File mode (clap guarantees input_file is present here).
        let input_file = args
            .input_file
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("either --sentence or --input-file is required"))?;
        let results = use_case.score_file(input_file, args.background_file.as_deref())?;

        let mut true_count = 0usize;
        for (text, verdict) in &results {
            let label = if verdict.label { "true " } else { "false" };
            if verdict.label {
                true_count += 1;
            }
            println!("{label}  p(true)={:.3}  {text}", verdict.true_probability);
        }
        println!(
            "\nScored {} sentences: {} true, {} false.",
            results.len(),
            true_count,
            results.len() - true_count
        );
        Ok(())
    }
}

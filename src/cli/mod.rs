// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`     — fits the model on the activity log
//   2. `recommend` — prints a user's top-K tracks
//   3. `evaluate`  — prints offline quality metrics

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, RecommendArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "tunerec",
    version = "0.1.0",
    about = "Sequential music recommender: train on listening activity, then serve top-K tracks."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Recommend(args) => Self::run_recommend(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on activity in: {}", args.activity);

        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Snapshot saved.");
        Ok(())
    }

    fn run_recommend(args: RecommendArgs) -> Result<()> {
        use crate::application::recommend_use_case::RecommendUseCase;

        let use_case = RecommendUseCase::new(args.into());
        use_case.execute()
    }

    fn run_evaluate(args: EvaluateArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        let use_case = EvaluateUseCase::new(args.into());
        use_case.execute()
    }
}

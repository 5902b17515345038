//! Decision Engine — offline simulation of the template-selection loop.
//!
//! Builds the bandit policy from configuration, runs the interaction loop
//! over a synthetic customer base and prints the learned per-arm statistics.

mod simulation;

use clap::Parser;
use decision_agents::{InteractionLoop, InteractionProcessor, RetryPolicy};
use decision_core::{BanditAlgorithm, EngineConfig};
use decision_outreach::OutreachRanker;
use decision_rl_engine::{build_policy, ArmStatistics, RewardTransform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use simulation::{synthetic_customers, SimulatedJudge, TemplateGenerator};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "decision-engine")]
#[command(about = "Online template selection with contextual bandits")]
#[command(version)]
struct Cli {
    /// Config file layered beneath DECISION_ENGINE__* variables
    #[arg(long, env = "DECISION_ENGINE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of iterations to run
    #[arg(long, default_value_t = 10)]
    iterations: u32,

    /// Size of the synthetic customer base
    #[arg(long, default_value_t = 200)]
    customers: usize,

    /// Bandit algorithm (overrides config)
    #[arg(long, value_parser = parse_algorithm)]
    algorithm: Option<BanditAlgorithm>,

    /// Seed for the policy and the simulation (overrides config)
    #[arg(long, env = "DECISION_ENGINE__POLICY__SEED")]
    seed: Option<u64>,

    /// Non-vocal customers contacted per iteration (overrides config)
    #[arg(long)]
    outreach_capacity: Option<usize>,

    /// Share one global policy state instead of per-context state
    #[arg(long, default_value_t = false)]
    global: bool,

    /// Satisfaction noise of the simulated judge, 0-10 scale
    #[arg(long, default_value_t = 1.0)]
    judge_noise: f64,
}

fn parse_algorithm(value: &str) -> Result<BanditAlgorithm, String> {
    match value {
        "thompson" | "thompson_sampling" => Ok(BanditAlgorithm::ThompsonSampling),
        "epsilon" | "epsilon_greedy" => Ok(BanditAlgorithm::EpsilonGreedy),
        other => Err(format!("unknown algorithm '{other}'")),
    }
}

#[derive(Serialize)]
struct IterationSummary {
    iteration: u32,
    completed: usize,
    failed: usize,
    mean_reward: f64,
}

#[derive(Serialize)]
struct RunSummary {
    algorithm: BanditAlgorithm,
    contextual: bool,
    iterations: Vec<IterationSummary>,
    global: Vec<ArmStatistics>,
    contexts: BTreeMap<String, Vec<ArmStatistics>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "decision_engine=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Decision Engine starting up");

    let mut config = EngineConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });

    if let Some(algorithm) = cli.algorithm {
        config.policy.algorithm = algorithm;
    }
    if let Some(seed) = cli.seed {
        config.policy.seed = Some(seed);
    }
    if let Some(capacity) = cli.outreach_capacity {
        config.orchestrator.outreach_capacity = capacity;
    }
    if cli.global {
        config.orchestrator.contextual = false;
    }
    config.validate()?;

    info!(
        algorithm = ?config.policy.algorithm,
        arms = config.policy.arms.len(),
        contextual = config.orchestrator.contextual,
        outreach_capacity = config.orchestrator.outreach_capacity,
        "Configuration loaded"
    );

    let policy = build_policy(&config.policy)?;
    let ranker = OutreachRanker::from_config(&config.ranking)?;
    let reward = RewardTransform::from_config(&config.reward)?;

    let mut rng = match config.policy.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let customers = synthetic_customers(cli.customers, &mut rng);
    let judge_seed = config.policy.seed.map(|s| s.wrapping_add(1));

    let processor = InteractionProcessor::new(
        policy.clone(),
        TemplateGenerator,
        SimulatedJudge::new(judge_seed, cli.judge_noise),
        RetryPolicy::from_config(&config.orchestrator),
        config.orchestrator.contextual,
    )
    .with_reward(reward);
    let interaction_loop =
        InteractionLoop::from_processor(processor, ranker, config.orchestrator.clone())?;

    let reports = interaction_loop.run(&customers, cli.iterations).await?;

    let summary = RunSummary {
        algorithm: policy.algorithm(),
        contextual: config.orchestrator.contextual,
        iterations: reports
            .iter()
            .map(|r| IterationSummary {
                iteration: r.iteration,
                completed: r.logs.len(),
                failed: r.failures.len(),
                mean_reward: r.mean_reward(),
            })
            .collect(),
        global: policy.get_statistics(None),
        contexts: policy
            .list_contexts()
            .into_iter()
            .map(|key| (key.to_string(), policy.get_statistics(Some(key))))
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(iterations = reports.len(), "Decision Engine finished");
    Ok(())
}

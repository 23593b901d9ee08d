//! Arbor inverse kinematics CLI.
//!
//! Provides three modes of operation:
//! - `solve`: Load a rig file, solve every effector and print the residuals
//! - `inspect`: Print how a rig decomposes into chains
//! - `info`: Print workspace crate versions

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use arbor_core::{AlgorithmConfig, ConfigError};
use arbor_ik::{ChainId, ChainTree, FABRIK_NAME, FabrikSolver, IkError};
use arbor_skeleton::{BoneId, Skeleton, SkeletonError, Subtree};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Tree-shaped FABRIK inverse kinematics.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a rig and print each effector's tip position and residual.
    Solve {
        /// Rig description (TOML).
        #[arg(short, long)]
        rig: PathBuf,

        /// Algorithm configuration (TOML). Defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bone to solve from. Defaults to every root that has effectors.
        #[arg(long)]
        root: Option<String>,

        /// Override the number of forward sweeps.
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Override the convergence tolerance.
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Stop as soon as every effector is within tolerance.
        #[arg(long)]
        stop_on_convergence: bool,
    },

    /// Print the chain decomposition of a rig.
    Inspect {
        /// Rig description (TOML).
        #[arg(short, long)]
        rig: PathBuf,

        /// Bone to decompose from. Defaults to every root that has effectors.
        #[arg(long)]
        root: Option<String>,
    },

    /// Print crate information.
    Info,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ik(#[from] IkError),
    #[error("rig has no bones carrying effectors")]
    NothingToSolve,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Subtrees to solve: the named bone, or every root with effectors below it.
fn select_subtrees(skeleton: &Skeleton, root: Option<&str>) -> Result<Vec<Subtree>, CliError> {
    let roots: Vec<BoneId> = match root {
        Some(name) => vec![skeleton.bone_id(name)?],
        None => skeleton.roots().collect(),
    };
    let subtrees: Vec<Subtree> = roots
        .into_iter()
        .map(|id| Subtree::from_effectors(skeleton, id))
        .filter(|subtree| subtree.marked().next().is_some())
        .collect();
    if subtrees.is_empty() {
        return Err(CliError::NothingToSolve);
    }
    Ok(subtrees)
}

fn load_config(
    path: Option<&Path>,
    iterations: Option<u32>,
    tolerance: Option<f64>,
    stop_on_convergence: bool,
) -> Result<AlgorithmConfig, CliError> {
    let mut config = match path {
        Some(path) => AlgorithmConfig::from_file(path)?,
        None => AlgorithmConfig::default(),
    };
    if let Some(iterations) = iterations {
        config.max_iterations = iterations;
    }
    if let Some(tolerance) = tolerance {
        config.tolerance = tolerance;
    }
    config.stop_on_convergence |= stop_on_convergence;
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// solve
// ---------------------------------------------------------------------------

fn run_solve(rig: &Path, config: &AlgorithmConfig, root: Option<&str>) -> Result<(), CliError> {
    let mut skeleton = arbor_skeleton::parse_file(rig)?;
    let subtrees = select_subtrees(&skeleton, root)?;

    for subtree in &subtrees {
        let mut solver = FabrikSolver::new(&skeleton, subtree, config.clone())?;
        let result = solver.solve(&mut skeleton);

        println!(
            "subtree {}: {} effector(s), {} sweep(s), converged={}",
            skeleton.bone(subtree.root()).name(),
            solver.num_effectors(),
            result.iterations,
            result.converged
        );
        solver.visit_effectors(&skeleton, |id, bone| {
            let tail = skeleton.global_tail(id);
            let residual = bone
                .effector
                .as_ref()
                .map_or(0.0, |eff| (tail - eff.target_position).norm());
            println!(
                "  {:<16} tip=({:+.4}, {:+.4}, {:+.4})  residual={residual:.6}",
                bone.name(),
                tail.x,
                tail.y,
                tail.z
            );
        });
        solver.deinit();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

fn print_chain(tree: &ChainTree, skeleton: &Skeleton, chain: ChainId, depth: usize) {
    let names: Vec<&str> = tree
        .bones(chain)
        .iter()
        .map(|&id| skeleton.bone(id).name())
        .collect();
    let kind = if tree.is_leaf(chain) { "effector" } else { "branch" };
    println!(
        "{:indent$}chain {}: {} [{kind}]",
        "",
        chain.0,
        names.join(" -> "),
        indent = depth * 2 + 2
    );
    for &child in tree.children(chain) {
        print_chain(tree, skeleton, child, depth + 1);
    }
}

fn run_inspect(rig: &Path, root: Option<&str>) -> Result<(), CliError> {
    let skeleton = arbor_skeleton::parse_file(rig)?;
    let subtrees = select_subtrees(&skeleton, root)?;

    for subtree in &subtrees {
        let solver = FabrikSolver::new(&skeleton, subtree, AlgorithmConfig::default())?;
        let tree = solver.chain_tree();
        println!(
            "subtree {}: {} chain(s), {} bone(s), {} effector(s)",
            skeleton.bone(subtree.root()).name(),
            tree.chain_count(),
            tree.bone_count(),
            solver.num_effectors()
        );
        print_chain(tree, &skeleton, ChainId::ROOT, 0);

        let mut order = Vec::new();
        solver.visit_bones(&skeleton, |_, bone| order.push(bone.name().to_string()));
        println!("  solve order: {}", order.join(", "));

        let mut tips = Vec::new();
        solver.visit_effectors(&skeleton, |_, bone| tips.push(bone.name().to_string()));
        println!("  effectors:   {}", tips.join(", "));
        solver.deinit();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// info
// ---------------------------------------------------------------------------

fn run_info() {
    println!("arbor v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  arbor-core     {}", env!("CARGO_PKG_VERSION"));
    println!("  arbor-skeleton {}", env!("CARGO_PKG_VERSION"));
    println!("  arbor-ik       {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("solvers: {FABRIK_NAME}");
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve {
            rig,
            config,
            root,
            iterations,
            tolerance,
            stop_on_convergence,
        } => load_config(config.as_deref(), iterations, tolerance, stop_on_convergence)
            .and_then(|config| run_solve(&rig, &config, root.as_deref())),
        Commands::Inspect { rig, root } => run_inspect(&rig, root.as_deref()),
        Commands::Info => {
            run_info();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

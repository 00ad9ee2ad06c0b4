//! CLI command implementations

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Subcommand;
use undertow_core::{
    ActorNetwork, ConvergenceDetector, ConvergenceStatus, Cost, EdgeKey, LinkCostMutator, Network,
    NodeId, Topology, UndertowConfig,
};
use undertow_sim::SimulationDriver;

use crate::console::{ConsoleObserver, render_matrix, render_table};
use crate::topology_file::load_topology;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the periodic simulation with random link-cost changes
    Run {
        /// Topology file, one `RouterA RouterB cost` per line; built-in sample if omitted
        topology: Option<PathBuf>,
        /// Seed for link and cost selection
        #[arg(long)]
        seed: Option<u64>,
        /// Simulated duration in seconds
        #[arg(long)]
        duration: Option<u64>,
        /// Seconds between exchange ticks
        #[arg(long)]
        exchange_interval: Option<u64>,
        /// Seconds between link-cost changes
        #[arg(long)]
        mutation_interval: Option<u64>,
        /// Wall-clock pause after each tick, in milliseconds
        #[arg(long)]
        tick_delay_ms: Option<u64>,
        /// Smallest cost a changed link may get
        #[arg(long)]
        min_cost: Option<u32>,
        /// Largest cost a changed link may get
        #[arg(long)]
        max_cost: Option<u32>,
        /// Print every round and route change
        #[arg(short, long)]
        verbose: bool,
        /// Also write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Converge a topology once and print every routing table
    Converge {
        /// Topology file; built-in sample if omitted
        topology: Option<PathBuf>,
        /// Round bound for each convergence run
        #[arg(long, default_value = "50")]
        max_rounds: usize,
        /// Change one link after converging, then reconverge
        #[arg(long, num_args = 3, value_names = ["A", "B", "COST"])]
        change: Option<Vec<String>>,
        /// Run every router as its own task
        #[arg(long)]
        actors: bool,
        /// Print every round and route change
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print shortest paths from one router, computed without the protocol
    Paths {
        /// Topology file; built-in sample if omitted
        topology: Option<PathBuf>,
        /// Source router
        #[arg(long)]
        from: String,
    },
    /// Print topology statistics
    Stats {
        /// Topology file; built-in sample if omitted
        topology: Option<PathBuf>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the error of the command that failed
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            topology,
            seed,
            duration,
            exchange_interval,
            mutation_interval,
            tick_delay_ms,
            min_cost,
            max_cost,
            verbose,
            json,
        } => {
            let mut config = UndertowConfig::from_env();
            let simulation = &mut config.simulation;
            if seed.is_some() {
                simulation.seed = seed;
            }
            if let Some(secs) = duration {
                simulation.duration = Duration::from_secs(secs);
            }
            if let Some(secs) = exchange_interval {
                simulation.exchange_interval = Duration::from_secs(secs);
            }
            if let Some(secs) = mutation_interval {
                simulation.mutation_interval = Duration::from_secs(secs);
            }
            if let Some(ms) = tick_delay_ms {
                simulation.tick_delay = Duration::from_millis(ms);
            }
            if let Some(cost) = min_cost {
                config.mutation.min_cost = cost;
            }
            if let Some(cost) = max_cost {
                config.mutation.max_cost = cost;
            }

            run_simulation(topology.as_deref(), config, verbose, json.as_deref()).await
        }
        Commands::Converge {
            topology,
            max_rounds,
            change,
            actors,
            verbose,
        } => {
            let change = change.as_deref().map(parse_change).transpose()?;
            if actors {
                converge_actors(topology.as_deref(), max_rounds, change, verbose).await
            } else {
                converge_once(topology.as_deref(), max_rounds, change, verbose).await
            }
        }
        Commands::Paths { topology, from } => show_paths(topology.as_deref(), &from).await,
        Commands::Stats { topology } => show_stats(topology.as_deref()).await,
    }
}

/// Run the periodic simulation and print its report
///
/// Ctrl-C stops the run at the next tick; the report is still printed.
///
/// # Errors
/// - Topology file cannot be loaded
/// - Configuration is invalid
/// - JSON report cannot be written
pub async fn run_simulation(
    topology_path: Option<&Path>,
    config: UndertowConfig,
    verbose: bool,
    json: Option<&Path>,
) -> anyhow::Result<()> {
    let topology = load_topology(topology_path).await?;
    let mut driver = SimulationDriver::new(&topology, config, ConsoleObserver::new(verbose))?;

    println!(
        "Simulating {} routers, {} links (seed {})",
        topology.nodes().len(),
        topology.edge_count(),
        driver.seed()
    );

    let cancel = driver.cancellation_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let (driver, report) = tokio::task::spawn_blocking(move || {
        let report = driver.run();
        (driver, report)
    })
    .await
    .context("simulation task panicked")?;
    let report = report?;

    println!();
    print!("{}", report.summary());
    println!();
    for (router, entry) in &report.routers {
        println!("{}", render_table(router, &entry.table));
    }
    if let Ok(matrix) = driver.network().all_pairs_shortest_cost() {
        println!("All-pairs shortest cost");
        print!("{}", render_matrix(&matrix));
    }

    if let Some(path) = json {
        tokio::fs::write(path, report.to_json()?)
            .await
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Converge a topology, optionally change one link and reconverge
///
/// # Errors
/// - Topology file cannot be loaded
/// - The requested link change is rejected
pub async fn converge_once(
    topology_path: Option<&Path>,
    max_rounds: usize,
    change: Option<(EdgeKey, Cost)>,
    verbose: bool,
) -> anyhow::Result<()> {
    let topology = load_topology(topology_path).await?;
    let mut network = Network::from_topology(&topology);
    let mut observer = ConsoleObserver::new(verbose);
    let detector = ConvergenceDetector::new(max_rounds);

    report_status(detector.run(&mut network, &mut observer));

    if let Some((edge, cost)) = change {
        let mutator = LinkCostMutator::new(UndertowConfig::from_env().mutation.cost_range()?);
        mutator.mutate(&mut network, &edge, cost, &mut observer)?;
        report_status(detector.run(&mut network, &mut observer));
    }

    for node in network.node_ids() {
        println!("{}", render_table(node, network.routing_table(node)?));
    }
    println!(
        "{} rounds, {} messages",
        network.rounds(),
        network.total_messages()
    );

    Ok(())
}

/// Same as [`converge_once`] with one task per router
///
/// # Errors
/// - Topology file cannot be loaded
/// - The requested link change is rejected
/// - A router task stopped unexpectedly
pub async fn converge_actors(
    topology_path: Option<&Path>,
    max_rounds: usize,
    change: Option<(EdgeKey, Cost)>,
    verbose: bool,
) -> anyhow::Result<()> {
    let topology = load_topology(topology_path).await?;
    let range = UndertowConfig::from_env().mutation.cost_range()?;
    let mut network = ActorNetwork::spawn(&topology).with_cost_range(range);
    let mut observer = ConsoleObserver::new(verbose);

    report_status(network.converge(max_rounds, &mut observer).await?);

    if let Some((edge, cost)) = change {
        network.set_link_cost(&edge, cost, &mut observer).await?;
        report_status(network.converge(max_rounds, &mut observer).await?);
    }

    let nodes: Vec<NodeId> = network.node_ids().cloned().collect();
    for node in &nodes {
        println!("{}", render_table(node, &network.routing_table(node).await?));
    }
    println!(
        "{} rounds, {} messages",
        network.rounds(),
        network.total_messages()
    );

    network.shutdown().await;
    Ok(())
}

/// Print Dijkstra shortest paths from one router
///
/// # Errors
/// - Topology file cannot be loaded
/// - `from` is not a router of the topology
pub async fn show_paths(topology_path: Option<&Path>, from: &str) -> anyhow::Result<()> {
    let topology = load_topology(topology_path).await?;
    let source = NodeId::from(from);
    if !topology.nodes().contains(&source) {
        bail!("router {from} is not part of the topology");
    }

    let paths = topology.shortest_paths(&source);
    println!("Shortest paths from {source}");
    for dest in topology.nodes() {
        let route = paths
            .path_to(dest)
            .map(|hops| {
                hops.iter()
                    .map(NodeId::as_str)
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
            .unwrap_or_else(|| "unreachable".to_string());
        println!("  {:6} {:>6}  {}", dest.as_str(), paths.cost_to(dest).to_string(), route);
    }

    Ok(())
}

/// Print topology statistics
///
/// # Errors
/// - Topology file cannot be loaded
pub async fn show_stats(topology_path: Option<&Path>) -> anyhow::Result<()> {
    let topology = load_topology(topology_path).await?;
    print_stats(&topology);
    Ok(())
}

fn print_stats(topology: &Topology) {
    let stats = topology.stats();
    println!("Routers:          {}", stats.node_count);
    println!("Links:            {}", stats.edge_count);
    println!("Average degree:   {:.2}", stats.average_degree);
    println!("Hop diameter:     {}", stats.hop_diameter);
    println!("Connected:        {}", stats.connected);
    println!("Round bound:      {}", stats.convergence_round_bound());
}

fn report_status(status: ConvergenceStatus) {
    if !status.is_converged() {
        tracing::warn!("Tables may still be settling after {} rounds", status.rounds());
    }
}

fn parse_change(args: &[String]) -> anyhow::Result<(EdgeKey, Cost)> {
    let [a, b, cost] = args else {
        bail!("--change takes exactly three values: A B COST");
    };
    let cost: u32 = cost
        .parse()
        .with_context(|| format!("invalid cost {cost:?}"))?;
    Ok((
        EdgeKey::new(NodeId::from(a.as_str()), NodeId::from(b.as_str())),
        Cost::new(cost),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_change() {
        let args = ["C".to_string(), "B".to_string(), "8".to_string()];
        let (edge, cost) = parse_change(&args).unwrap();
        assert_eq!(edge, EdgeKey::new(NodeId::from("B"), NodeId::from("C")));
        assert_eq!(cost, Cost::new(8));

        let args = ["B".to_string(), "C".to_string(), "eight".to_string()];
        assert!(parse_change(&args).is_err());
    }

    #[tokio::test]
    async fn test_converge_sample_with_change() {
        let change = Some((EdgeKey::new(NodeId::from("B"), NodeId::from("C")), Cost::new(8)));
        converge_once(None, 50, change.clone(), false).await.unwrap();
        converge_actors(None, 50, change, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_paths_rejects_unknown_router() {
        assert!(show_paths(None, "A").await.is_ok());
        assert!(show_paths(None, "Z").await.is_err());
    }
}

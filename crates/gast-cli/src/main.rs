use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gast_attention::AttentionMask;
use gast_clifford::algebra::Sign;
use gast_clifford::CliffordAlgebra;
use gast_core::Result;
use gast_data::{mock_batch, random_edges, MockConfig};
use gast_model::{GastConfig, MultivectorSelfAttention, NBodyTransformer};
use gast_nn::init::seeded_rng;
use gast_nn::Module;

#[derive(Parser)]
#[command(
    name = "gast",
    about = "Geometric algebra graph transformer CLI",
    long_about = "Inspect Clifford algebras and attention masks, and run the N-body\nequivariant graph transformer on synthetic batches.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the blades and Cayley table of Cl(p,q)
    Info {
        #[arg(long, default_value = "3")]
        p: usize,
        #[arg(long, default_value = "0")]
        q: usize,
    },
    /// Build the attention mask of a random graph and print its counts
    Mask {
        #[arg(long, default_value = "5")]
        nodes: usize,
        #[arg(long, default_value = "8")]
        edges: usize,
        /// Number of graphs (all share the topology)
        #[arg(long, default_value = "1")]
        batch: usize,
        /// Collapse (i, j) and (j, i) before building the mask
        #[arg(long)]
        unique_edges: bool,
        /// Let edges attend to edges sharing an endpoint
        #[arg(long)]
        edge_to_edge: bool,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Run the model on a synthetic batch and report the MSE
    Forward {
        /// JSON model config (defaults to the 5-body preset)
        #[arg(long)]
        config: Option<String>,
        #[arg(long, default_value = "4")]
        batch: usize,
        /// Seed for the synthetic batch
        #[arg(long, default_value = "7")]
        seed: u64,
    },
    /// Time multivector self-attention on synthetic graphs
    Bench {
        #[arg(long, default_value = "10")]
        iters: usize,
        /// Graphs per batch (comma-separated)
        #[arg(long, default_value = "1,4,16,64")]
        batches: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Info { p, q } => cmd_info(p, q),
        Commands::Mask { nodes, edges, batch, unique_edges, edge_to_edge, seed } => {
            cmd_mask(nodes, edges, batch, unique_edges, edge_to_edge, seed)
        }
        Commands::Forward { config, batch, seed } => cmd_forward(config.as_deref(), batch, seed),
        Commands::Bench { iters, batches } => cmd_bench(iters, &batches),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_info(p: usize, q: usize) -> Result<()> {
    if p + q == 0 || p + q > 6 {
        return Err(gast_core::GastError::InvalidConfig(format!(
            "Cl({},{}) needs 1..=6 basis vectors",
            p, q
        )));
    }
    let alg = CliffordAlgebra::new(p, q);
    println!("=== Cl({},{}) ===", p, q);
    println!("Basis vectors: {}  Blades: {}  Grades: {}\n", alg.n, alg.dim, alg.num_grades());

    for grade in 0..alg.num_grades() {
        let names: Vec<String> = alg.blades_of_grade(grade).into_iter().map(|b| alg.blade_name(b)).collect();
        println!("  grade {}: {}", grade, names.join(" "));
    }

    println!("\nCayley table");
    let width = alg.n + 3;
    print!("{:>width$}", "");
    for j in 0..alg.dim {
        print!("{:>width$}", alg.blade_name(j));
    }
    println!();
    for i in 0..alg.dim {
        print!("{:>width$}", alg.blade_name(i));
        for j in 0..alg.dim {
            let entry = alg.cayley[i][j];
            let cell = match entry.sign {
                Sign::Zero => "0".to_string(),
                Sign::Pos => alg.blade_name(entry.blade),
                Sign::Neg => format!("-{}", alg.blade_name(entry.blade)),
            };
            print!("{:>width$}", cell);
        }
        println!();
    }
    Ok(())
}

fn cmd_mask(
    nodes: usize,
    edges: usize,
    batch: usize,
    unique_edges: bool,
    edge_to_edge: bool,
    seed: u64,
) -> Result<()> {
    let mock = MockConfig {
        num_nodes: nodes,
        num_edges: edges,
        distinct_edges: !unique_edges,
        ..MockConfig::default()
    };
    let mut rng = seeded_rng(seed);
    let mut graph = random_edges(&mock, &mut rng)?;
    if unique_edges {
        graph = gast_model::edges::first_occurrences(&graph).into_iter().map(|k| graph[k]).collect();
    }
    let mask = AttentionMask::repeated(nodes, &graph, batch, edge_to_edge)?;

    println!("=== Attention Mask ===");
    println!("Edges: {:?}", graph);
    println!(
        "Graphs: {}  Tokens per graph: {} ({} nodes + {} edges)\n",
        mask.batch_size(),
        mask.tokens_per_graph(),
        mask.num_nodes(),
        mask.num_edges()
    );

    let counts = mask.counts(0);
    println!("{:<14} {:>8}", "Kind", "Allowed");
    println!("{}", "-".repeat(23));
    println!("{:<14} {:>8}", "node -> node", counts.node_node);
    println!("{:<14} {:>8}", "node -> edge", counts.node_edge);
    println!("{:<14} {:>8}", "edge -> node", counts.edge_node);
    println!("{:<14} {:>8}", "edge -> edge", counts.edge_edge);
    println!("{:<14} {:>8}\n", "total", counts.total());

    let t = mask.tokens_per_graph();
    for i in 0..t {
        let row: String = (0..t)
            .map(|j| if mask.is_permitted(0, i, j) { '#' } else { '.' })
            .collect();
        let kind = if i < nodes { 'n' } else { 'e' };
        println!("  {}{:<3} {}", kind, i, row);
    }
    Ok(())
}

fn cmd_forward(config_path: Option<&str>, batch_size: usize, seed: u64) -> Result<()> {
    let config = match config_path {
        Some(path) => GastConfig::from_json_file(path)?,
        None => GastConfig::nbody(),
    };
    let model = NBodyTransformer::new(config.clone())?;

    let mock = MockConfig {
        num_nodes: config.num_nodes,
        num_edges: config.num_edges,
        edge_attr_dim: config.edge_attr_dim,
        // dedup must leave every graph with the same edge count
        distinct_edges: config.unique_edges,
        shared_topology: false,
    };
    let batch = mock_batch(&mock, batch_size, &mut seeded_rng(seed))?;

    let start = Instant::now();
    let eval = model.evaluate(&batch)?;
    let elapsed = start.elapsed();

    tracing::info!("prediction {:?}, target {:?}", eval.prediction.dims(), eval.target.dims());
    println!("=== Forward ===");
    println!("Config:     {}", config.to_json()?);
    println!("Parameters: {}", model.num_parameters());
    println!("Graphs:     {}", batch.batch_size());
    println!("Prediction: {:?} ({} NaN)", eval.prediction.dims(), eval.prediction.count_nan());
    println!("MSE:        {:.6}", eval.loss);
    println!("Time:       {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}

fn cmd_bench(iters: usize, batches_str: &str) -> Result<()> {
    let batches: Vec<usize> = batches_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let config = GastConfig::nbody();
    let alg = Arc::new(CliffordAlgebra::new(config.p, config.q));
    let mut rng = seeded_rng(0);
    let attn = MultivectorSelfAttention::new(
        Arc::clone(&alg),
        config.channels,
        config.num_heads,
        config.norm_eps,
        &mut rng,
    );
    let mock = MockConfig { num_nodes: config.num_nodes, num_edges: config.num_edges, ..MockConfig::default() };
    let graph = random_edges(&mock, &mut rng)?;

    println!("=== Multivector Self-Attention Benchmark ===");
    println!(
        "Cl({},{}), C={}, H={}, T={}\n",
        config.p,
        config.q,
        config.channels,
        config.num_heads,
        config.tokens_per_graph()
    );
    println!("{:<10} {:>10} {:>14} {:>14}", "Graphs", "Tokens", "Forward (ms)", "Graphs/s");
    println!("{}", "-".repeat(51));

    for &b in &batches {
        let mask = AttentionMask::repeated(config.num_nodes, &graph, b, false)?;
        let x = gast_core::Tensor::randn(&[b * mask.tokens_per_graph(), config.channels, alg.dim], &mut rng);

        // Warmup
        attn.forward(&x, &mask, b)?;
        let secs = time_it(iters, || attn.forward(&x, &mask, b).map(|_| ()))?;

        println!(
            "{:<10} {:>10} {:>12.3}ms {:>14.1}",
            b,
            b * mask.tokens_per_graph(),
            secs * 1000.0,
            b as f64 / secs
        );
    }
    Ok(())
}

fn time_it(iters: usize, mut f: impl FnMut() -> Result<()>) -> Result<f64> {
    let iters = iters.max(1);
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_secs_f64() / iters as f64)
}

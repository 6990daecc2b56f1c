use clap::{Args, Parser, Subcommand, ValueEnum};
use phylogen::config::ModelConfig;
use phylogen::generators::{Coalescent, Gtr, Hky, JukesCantor, PhyloCtmc};
use phylogen::graph::{GraphicalModel, Sampler, ValueId};
use phylogen::Result;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Simulate coalescent trees and alignments from a generative phylogenetic model
#[derive(Parser, Debug)]
#[command(name = "phylogen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sample one tree and alignment, print both
    Simulate {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Resample the model repeatedly, print one Newick tree per replicate
    Resample {
        #[command(flatten)]
        model: ModelArgs,

        /// Number of replicates
        #[arg(short, long, default_value_t = 10)]
        replicates: usize,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Number of taxa
    #[arg(short = 'n', long, default_value_t = 10)]
    taxa: i64,

    /// Constant effective population size
    #[arg(short, long, default_value_t = 1.0)]
    theta: f64,

    /// Number of sites
    #[arg(short = 'L', long, default_value_t = 100)]
    sites: i64,

    /// Substitution model
    #[arg(short, long, value_enum, default_value_t = SubstitutionModel::Jc)]
    model: SubstitutionModel,

    /// Transition/transversion ratio (hky)
    #[arg(long, default_value_t = 2.0)]
    kappa: f64,

    /// Base frequencies A,C,G,T (hky, gtr)
    #[arg(long, value_delimiter = ',', default_values_t = [0.25, 0.25, 0.25, 0.25])]
    freq: Vec<f64>,

    /// Exchangeabilities AC,AG,AT,CG,CT,GT (gtr)
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0])]
    rates: Vec<f64>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Keep single-child nodes in the Newick output
    #[arg(long)]
    single_child: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SubstitutionModel {
    Jc,
    Hky,
    Gtr,
}

/// Handles of the values the commands print.
struct Outputs {
    tree: ValueId,
    alignment: ValueId,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Simulate { model: args } => {
            let (model, outputs) = build_model(&args)?;
            if let Some(tree) = model.payload(outputs.tree).as_tree() {
                println!("{}", tree.to_newick(args.single_child));
            }
            if let Some(alignment) = model.payload(outputs.alignment).as_alignment() {
                print!("{}", alignment);
            }
        }
        Commands::Resample { model: args, replicates } => {
            let (mut model, outputs) = build_model(&args)?;
            let mut sampler = Sampler::new(&mut model);
            sampler.sample_replicates(replicates, None, |replicate, model| {
                if let Some(tree) = model.payload(outputs.tree).as_tree() {
                    println!("{}\t{}", replicate, tree.to_newick(args.single_child));
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}

/// Builds `psi ~ Coalescent(theta, n)`, `Q = model(...)`, `D ~ PhyloCTMC(psi, Q, L)`.
fn build_model(args: &ModelArgs) -> Result<(GraphicalModel, Outputs)> {
    let mut config = ModelConfig::default();
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let mut model = GraphicalModel::with_config(config);

    let theta = model.constant(Some("theta"), args.theta);
    let n = model.constant(Some("n"), args.taxa);
    let tree = model.sample(Some("psi"), Coalescent, &[("theta", theta), ("n", n)])?;

    let q = match args.model {
        SubstitutionModel::Jc => model.apply(Some("Q"), JukesCantor, &[])?,
        SubstitutionModel::Hky => {
            let kappa = model.constant(Some("kappa"), args.kappa);
            let freq = model.constant(Some("freq"), args.freq.clone());
            model.apply(Some("Q"), Hky, &[("kappa", kappa), ("freq", freq)])?
        }
        SubstitutionModel::Gtr => {
            let rates = model.constant(Some("rates"), args.rates.clone());
            let freq = model.constant(Some("freq"), args.freq.clone());
            model.apply(Some("Q"), Gtr, &[("rates", rates), ("freq", freq)])?
        }
    };

    let length = model.constant(Some("L"), args.sites);
    let alignment = model.sample(Some("D"), PhyloCtmc, &[("tree", tree), ("Q", q), ("L", length)])?;
    debug!(values = model.value_count(), generators = model.generator_count(), "built model");

    Ok((model, Outputs { tree, alignment }))
}

use clap::{App, Arg};
use pahmm::dictionary::Alphabet;
use pahmm::model::{
    DiscreteGamma, EmpiricalAminoAcid, Gtr, Hky85, NegativeBinomialGapModel, ReversibleModel,
};
use pahmm::{
    distances_and_tree, Algorithm, DistanceConfig, PahmmError, PairStatus, PairwiseDistanceDriver,
    Sequences,
};
use std::io::Write;
#[macro_use]
extern crate log;

fn app() -> App<'static, 'static> {
    App::new("pahmm")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Sequences(FASTA)->Pairwise divergence times(DISTMAT) and BioNJ tree(NEWICK)")
        .setting(clap::AppSettings::ArgRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Debug mode"),
        )
        .arg(
            Arg::with_name("in")
                .long("in")
                .short("i")
                .value_name("FASTA")
                .takes_value(true)
                .required(true)
                .help("Input sequences. Gaps are removed, so an alignment is fine."),
        )
        .arg(
            Arg::with_name("model")
                .long("model")
                .takes_value(true)
                .default_value(&"HKY")
                .possible_values(&["HKY", "GTR", "AA"])
                .help("Substitution model."),
        )
        .arg(
            Arg::with_name("hky_params")
                .long("hky-params")
                .value_name("KAPPA")
                .takes_value(true)
                .default_value(&"2.0")
                .help("Transition/transversion ratio of HKY85."),
        )
        .arg(
            Arg::with_name("gtr_params")
                .long("gtr-params")
                .value_names(&["a", "b", "c", "d", "e"])
                .takes_value(true)
                .number_of_values(5)
                .help("Rates TC, TA, TG, CA, CG of GTR. AG is one."),
        )
        .arg(
            Arg::with_name("aa_matrix")
                .long("aa-matrix")
                .value_name("DAT")
                .takes_value(true)
                .help("Empirical amino acid matrix in PAML format. [default: LG]"),
        )
        .arg(
            Arg::with_name("rate_cat")
                .long("rate-cat")
                .value_name("K")
                .takes_value(true)
                .default_value(&"4")
                .help("Number of discrete Gamma rate categories. 1 disables rate variation."),
        )
        .arg(
            Arg::with_name("alpha")
                .long("alpha")
                .takes_value(true)
                .default_value(&"0.5")
                .help("Shape of the Gamma distribution of rates."),
        )
        .arg(
            Arg::with_name("indel_params")
                .long("indel-params")
                .value_names(&["LAMBDA", "EPSILON"])
                .takes_value(true)
                .number_of_values(2)
                .help("Indel rate and gap extension probability. [default: 0.05 0.5]"),
        )
        .arg(
            Arg::with_name("algorithm")
                .long("algorithm")
                .takes_value(true)
                .possible_values(&["forward", "viterbi"])
                .help("Objective of the time search. [default: forward]"),
        )
        .arg(
            Arg::with_name("alphabet")
                .long("alphabet")
                .takes_value(true)
                .default_value(&"auto")
                .possible_values(&["auto", "nuc", "aa"])
                .help("Alphabet of the input."),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("JSON")
                .takes_value(true)
                .help("Tunables of the banding and the optimiser."),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .takes_value(true)
                .default_value(&"1")
                .help("Number of threads"),
        )
        .arg(
            Arg::with_name("out")
                .long("out")
                .short("o")
                .value_name("PREFIX")
                .takes_value(true)
                .default_value(&"pahmm")
                .help("Writes PREFIX.distmat and PREFIX.tree."),
        )
}

fn parse_values<const N: usize>(
    matches: &clap::ArgMatches,
    name: &str,
    default: [f64; N],
) -> Result<[f64; N], PahmmError> {
    let values = match matches.values_of(name) {
        Some(values) => values,
        None => return Ok(default),
    };
    let mut parsed = default;
    for (slot, value) in parsed.iter_mut().zip(values) {
        *slot = value
            .parse()
            .map_err(|_| PahmmError::InvalidParameter(format!("{}: cannot parse {}", name, value)))?;
    }
    Ok(parsed)
}

fn substitution_model(
    matches: &clap::ArgMatches,
    seqs: &Sequences,
) -> Result<ReversibleModel, PahmmError> {
    let model = matches.value_of("model").unwrap_or("HKY");
    let nucleotide = seqs.dictionary().alphabet() == Alphabet::Nucleotide;
    let model = match (model, nucleotide) {
        ("HKY", true) => {
            let [kappa] = parse_values(matches, "hky_params", [2.0])?;
            Hky85::new(kappa)?.build(&seqs.equilibrium_frequencies())?
        }
        ("GTR", true) => {
            let rates = parse_values(matches, "gtr_params", [1.0; 5])?;
            Gtr::new(rates)?.build(&seqs.equilibrium_frequencies())?
        }
        ("AA", false) => match matches.value_of("aa_matrix") {
            Some(path) => EmpiricalAminoAcid::read(path)?.build(None)?,
            None => EmpiricalAminoAcid::lg().build(None)?,
        },
        (model, _) => {
            return Err(PahmmError::InvalidInput(format!(
                "model {} does not fit {:?} sequences",
                model,
                seqs.dictionary().alphabet()
            )))
        }
    };
    let [alpha] = parse_values(matches, "alpha", [0.5])?;
    let categories: usize = matches
        .value_of("rate_cat")
        .unwrap_or("4")
        .parse()
        .map_err(|_| PahmmError::InvalidParameter("rate-cat must be a count".to_string()))?;
    Ok(model.with_gamma(DiscreteGamma::new(alpha, categories)?))
}

fn alphabet(matches: &clap::ArgMatches) -> Option<Alphabet> {
    match matches.value_of("alphabet") {
        Some("nuc") => Some(Alphabet::Nucleotide),
        Some("aa") => Some(Alphabet::AminoAcid),
        _ => None,
    }
}

fn main() -> Result<(), PahmmError> {
    let matches = app().get_matches();
    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let threads: usize = matches
        .value_of("threads")
        .and_then(|x| x.parse().ok())
        .unwrap_or(1);
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        debug!("{:?}", why);
    }
    let mut config = match matches.value_of("config") {
        Some(path) => DistanceConfig::read(path)?,
        None => DistanceConfig::default(),
    };
    if let Some(algorithm) = matches.value_of("algorithm") {
        config.algorithm = algorithm
            .parse::<Algorithm>()
            .map_err(PahmmError::InvalidParameter)?;
    }
    let input = matches.value_of("in").unwrap_or("");
    let seqs = pahmm::read_sequences(input, alphabet(&matches))?;
    info!(
        "{} sequences, {:?}",
        seqs.len(),
        seqs.dictionary().alphabet()
    );
    let subst = substitution_model(&matches, &seqs)?;
    let [lambda, epsilon] = parse_values(&matches, "indel_params", [0.05, 0.5])?;
    let indel = NegativeBinomialGapModel::new(lambda, epsilon)?;
    let driver = PairwiseDistanceDriver::new(&subst, &indel, config);
    debug!("Start");
    let (estimate, tree) = distances_and_tree(&seqs, &driver)?;
    for pair in estimate.pairs.iter() {
        info!(
            "{}\t{}\t{:.6}\t{:.4}\t{:.4}\t{:?}",
            seqs.name(pair.i),
            seqs.name(pair.j),
            pair.time,
            pair.log_likelihood,
            pair.guide_distance,
            pair.status
        );
    }
    let degenerate = estimate
        .pairs
        .iter()
        .filter(|p| p.status == PairStatus::Degenerate)
        .count();
    if estimate.failed_pairs() > 0 {
        warn!(
            "{} of {} pairs failed ({} degenerate)",
            estimate.failed_pairs(),
            estimate.pairs.len(),
            degenerate
        );
    }
    let prefix = matches.value_of("out").unwrap_or("pahmm");
    {
        let mut wtr = std::fs::File::create(format!("{}.distmat", prefix)).map(std::io::BufWriter::new)?;
        estimate.matrix.write_lower_triangle(seqs.names(), &mut wtr)?;
    }
    {
        let mut wtr = std::fs::File::create(format!("{}.tree", prefix)).map(std::io::BufWriter::new)?;
        writeln!(&mut wtr, "{}", tree.newick)?;
        writeln!(&mut wtr, "{}", tree.length)?;
    }
    info!("Tree length {:.6}", tree.length);
    let gamma = subst.gamma();
    info!(
        "Gamma rate categories {}, alpha {}, rates {:?}",
        gamma.categories(),
        gamma.alpha(),
        gamma.rates()
    );
    Ok(())
}

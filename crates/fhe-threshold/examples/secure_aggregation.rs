// Secure aggregation with a threshold comparison, using the `fhe-threshold`
// crate.
//
// The parties run the key ceremony, encrypt their contributions under the
// joint public key, and sum them homomorphically. The sum is compared against
// a public threshold under encryption, and the comparison is decrypted by the
// parties. The lead party crashes before decryption; its partial decryption
// is recovered from the shares of its key.

mod util;

use std::{collections::BTreeSet, env, error::Error, process::exit};

use console::style;
use fhe_threshold::{
    CkksConfig, ComparisonConfig, Domain, PartyId, SessionConfig, ThresholdConfig,
    ThresholdSession, Verdict,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{distributions::Uniform, prelude::Distribution, thread_rng};
use tracing_subscriber::EnvFilter;
use util::timeit::timeit;

fn print_notice_and_exit(error: Option<String>) -> ! {
    println!(
        "{} Secure aggregation with a threshold comparison",
        style("  overview:").magenta().bold()
    );
    println!(
        "{} secure_aggregation [-h] [--help] [--num_parties=<value>] [--threshold=<value>]",
        style("     usage:").magenta().bold()
    );
    println!(
        "{} {} must be at least 2, and 1 <= {} <= {} - 1",
        style("constraints:").magenta().bold(),
        style("num_parties").blue(),
        style("threshold").blue(),
        style("num_parties").blue(),
    );
    if let Some(error) = error {
        println!("{} {}", style("     error:").red().bold(), error);
    }
    exit(0);
}

fn parse_arg(arg: &str, name: &str) -> usize {
    let parts: Vec<&str> = arg.rsplit('=').collect();
    match (parts.len(), parts[0].parse::<usize>()) {
        (2, Ok(value)) => value,
        _ => print_notice_and_exit(Some(format!("Invalid `--{name}` argument"))),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .compact()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.contains(&"-h".to_string()) || args.contains(&"--help".to_string()) {
        print_notice_and_exit(None)
    }

    let mut num_parties = 5;
    let mut threshold = 3;
    for arg in &args {
        if arg.starts_with("--num_parties") {
            num_parties = parse_arg(arg, "num_parties")
        } else if arg.starts_with("--threshold") {
            threshold = parse_arg(arg, "threshold")
        } else {
            print_notice_and_exit(Some(format!("Unrecognized argument: {arg}")))
        }
    }
    // The lead crashes, so the others must still form a quorum.
    if num_parties < 2 || threshold == 0 || threshold >= num_parties {
        print_notice_and_exit(Some("Invalid number of parties or threshold".to_string()))
    }

    let config = SessionConfig {
        committee: ThresholdConfig::new(num_parties, threshold)?,
        share_lead_key: true,
        comparison: ComparisonConfig {
            threshold: 138.0,
            domain: Domain::new(0.0, 150.0),
            degree: 27,
            margin: 1.0,
        },
        ckks: CkksConfig {
            degree: 2048,
            moduli_sizes: vec![60, 40, 40, 40, 40, 40, 40, 40, 40],
            smudging_bits: None,
        },
        noise_bound: None,
    };

    println!("# Secure aggregation");
    println!("\tnum_parties = {num_parties}");
    println!("\tthreshold = {threshold}");
    println!(
        "\tcomparison = max({}, x) on [{}, {}], degree {}",
        config.comparison.threshold,
        config.comparison.domain.lower,
        config.comparison.domain.upper,
        config.comparison.degree
    );

    let mut rng = thread_rng();
    let session = timeit!(
        "Key ceremony",
        ThresholdSession::from_config(config.clone(), &mut rng)?
    );

    // Contributions are small enough for their sum to stay in the domain.
    let dist = Uniform::new_inclusive(0u32, 150 / num_parties as u32);
    let contributions = dist
        .sample_iter(&mut thread_rng())
        .take(num_parties)
        .map(f64::from)
        .collect::<Vec<_>>();
    let expected = contributions.iter().sum::<f64>();

    let aggregation = session.aggregation();
    let pb = ProgressBar::new(num_parties as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Encrypting contributions");
    let ciphertexts = timeit!("Contribution encryption", {
        let mut ciphertexts = Vec::with_capacity(num_parties);
        for (i, value) in contributions.iter().enumerate() {
            let ct = aggregation.encode_and_encrypt(&[*value], &mut rng)?;
            ciphertexts.push((PartyId::new(i + 1), ct));
            pb.inc(1);
        }
        ciphertexts
    });
    pb.finish_with_message("Contributions encrypted");

    let everyone = config.committee.party_ids().collect::<BTreeSet<_>>();
    let aggregate = timeit!(
        "Aggregation",
        aggregation.combine(&ciphertexts, &everyone)?
    );
    let comparison = &config.comparison;
    let result = timeit!(
        "Threshold comparison",
        session.evaluator().evaluate_threshold(
            &aggregate,
            comparison.threshold,
            comparison.domain,
            comparison.degree
        )?
    );

    println!(
        "\n{} party {} does not respond",
        style("fault:").yellow().bold(),
        PartyId::LEAD
    );
    let values = timeit!("Threshold decryption", {
        session
            .coordinator(result)
            .decrypt(session.parties().filter(|p| p.id() != PartyId::LEAD), &mut rng)?
    });
    let recovered = values.first().copied().ok_or("no decrypted value")?;
    let verdict = Verdict::new(recovered, comparison.threshold, comparison.margin);
    let clear = Verdict::new(
        expected.max(comparison.threshold),
        comparison.threshold,
        comparison.margin,
    );

    println!("\n# Result");
    println!("\tsum of contributions = {expected}");
    println!("\tdecrypted max(threshold, sum) = {recovered:.4}");
    println!(
        "\tsum above {} = {} (in the clear: {clear})",
        comparison.threshold,
        style(verdict).green().bold()
    );
    Ok(())
}

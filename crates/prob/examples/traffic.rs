//! Traffic: Exact and Approximate Inference on a Small Network
//!
//! Run with: cargo run -p bayes-prob --example traffic
//! Set RUST_LOG=bayes_prob=debug to see the inference logs.
//!
//! This example demonstrates:
//! - Building and validating a network from tables
//! - Point queries on the full joint
//! - Posterior marginals by variable elimination
//! - Forward sampling and rejection sampling against the exact answer

use bayes_prob::{
    Evidence, Frequencies, Inference, InferenceConfig, Network, QueryMethod, Result, Variable,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

fn build() -> Result<Network> {
    let mut net = Network::new();
    net.add_variable(Variable::new("Weather", ["sunny", "rain", "snow"])?)?;
    net.add_variable(Variable::new("Accident", ["yes", "no"])?)?;
    net.add_variable(Variable::new("Jam", ["yes", "no"])?)?;
    net.add_variable(Variable::new("Meeting", ["held", "cancelled"])?)?;

    net.add_edge("Weather", "Accident")?;
    net.add_edge("Weather", "Jam")?;
    net.add_edge("Accident", "Jam")?;
    net.add_edge("Jam", "Meeting")?;

    net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]])?;
    net.attach_table(
        "Accident",
        &["Weather"],
        vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
    )?;
    net.attach_table(
        "Jam",
        &["Accident", "Weather"],
        vec![
            vec![0.6, 0.8, 0.9, 0.2, 0.5, 0.7],
            vec![0.4, 0.2, 0.1, 0.8, 0.5, 0.3],
        ],
    )?;
    net.attach_table("Meeting", &["Jam"], vec![vec![0.4, 0.9], vec![0.6, 0.1]])?;
    Ok(net)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Traffic: Exact and Approximate Inference ===\n");

    // -------------------------------------------------------------------------
    // 1. The Network
    // -------------------------------------------------------------------------
    println!("1. The Network");
    println!("--------------");
    println!();
    println!("   Weather");
    println!("   ↓     ↘");
    println!("Accident → Jam → Meeting");
    println!();

    let config = InferenceConfig::default().with_seed(7).with_workers(4);
    let net = config.validate_network(build()?)?;
    let order: Vec<&str> = net.order().iter().map(|&id| net.var(id).name()).collect();
    println!("Topological order: {:?}", order);
    println!();

    // -------------------------------------------------------------------------
    // 2. Point Queries
    // -------------------------------------------------------------------------
    println!("2. Point Queries");
    println!("----------------");
    println!();

    let point = Evidence::new()
        .with("Weather", "rain")
        .with("Accident", "yes")
        .with("Jam", "no")
        .with("Meeting", "cancelled");
    println!(
        "P(rain, accident, no jam, cancelled) = {:.4}",
        net.joint_probability(&point)?
    );
    println!();

    // -------------------------------------------------------------------------
    // 3. Exact Posteriors
    // -------------------------------------------------------------------------
    println!("3. Exact Posteriors (variable elimination)");
    println!("------------------------------------------");
    println!();

    let inference = Inference::new(&net).with_config(config)?;
    let accident = Evidence::new().with("Accident", "yes");
    let meeting = inference.query_exact(&["Meeting"], &accident)?;
    println!("P(Meeting | Accident = yes):\n{}", meeting);

    let late = Evidence::new().with("Meeting", "cancelled");
    let weather = inference.query_exact(&["Weather"], &late)?;
    println!("P(Weather | Meeting = cancelled):\n{}", weather);
    println!(
        "P(Meeting = cancelled) = {:.4}",
        inference.evidence_probability(&late)?
    );
    println!();

    // -------------------------------------------------------------------------
    // 4. Sampling
    // -------------------------------------------------------------------------
    println!("4. Sampling");
    println!("-----------");
    println!();

    let samples = inference.query_forward_parallel(20_000);
    let freq = Frequencies::from_samples(&net, &["Weather"], &samples)?;
    println!("Forward samples, P(Weather) ≈ {}", freq.to_factor()?);

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let one = inference.query_forward(1, &mut rng);
    println!("One draw: {:?}", one[0].to_labels(&net));
    println!();

    let budget = inference.rejection_budget(10_000);
    let answer = inference.query(&["Meeting"], &accident, QueryMethod::Rejection(budget))?;
    match answer.approximate().and_then(|e| e.posterior()) {
        Some(posterior) => {
            println!(
                "Rejection sampling: {} accepted of {} drawn (ratio {:.3})",
                posterior.accepted,
                posterior.attempted,
                posterior.acceptance_ratio()
            );
            println!(
                "P(Meeting = held | Accident = yes) ≈ {:.4} (exact {:.4})",
                posterior.probability(&[0]),
                meeting.values()[0]
            );
        }
        None => println!("Rejection sampling accepted nothing"),
    }

    Ok(())
}

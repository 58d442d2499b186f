//! Royal Family: Who Carries the Gene?
//!
//! Run with: cargo run -p bayes-heredity --example royal_family
//! Pass a JSON file of model parameters as the first argument to override
//! the defaults, e.g. `{"mutation": 0.05}`.
//!
//! Builds a three-generation family, observes who shows the trait, and
//! prints each person's posterior gene count and trait probability.

use bayes_heredity::{FamilyTree, HeredityError, HeredityParams, Prediction};
use tracing_subscriber::EnvFilter;

const SHOWS_TRAIT: [&str; 4] = ["Charles", "Philippa", "Archie", "Louis"];

fn royals(params: HeredityParams) -> Result<FamilyTree, HeredityError> {
    let mut family = FamilyTree::with_params(params)?;
    family
        .founder("Charles")?
        .founder("Diana")?
        .founder("Michael")?
        .founder("Carole")?
        .founder("Meghan")?
        .child("Harry", "Charles", "Diana")?
        .child("William", "Charles", "Diana")?
        .child("Katherine", "Michael", "Carole")?
        .child("Philippa", "Michael", "Carole")?
        .child("Archie", "Harry", "Meghan")?
        .child("Liliet", "Harry", "Meghan")?
        .child("George", "William", "Katherine")?
        .child("Charlotte", "William", "Katherine")?
        .child("Louis", "William", "Katherine")?;
    Ok(family)
}

fn print_table(predictions: &[Prediction]) {
    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>8}",
        "person", "2 genes", "1 gene", "0 genes", "trait"
    );
    for p in predictions {
        println!(
            "{:<10} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            p.person, p.genes[0], p.genes[1], p.genes[2], p.trait_yes
        );
    }
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let params = match std::env::args().nth(1) {
        Some(path) => HeredityParams::from_json(&std::fs::read_to_string(path)?)?,
        None => HeredityParams::default(),
    };

    println!("=== Royal Family: Who Carries the Gene? ===\n");

    let family = royals(params)?;
    let net = family.build()?;
    println!("{} people, {} variables\n", family.len(), net.len());

    let observations: Vec<(&str, bool)> = family
        .people()
        .map(|p| (p, SHOWS_TRAIT.contains(&p)))
        .collect();
    let evidence = family.trait_evidence(&observations)?;

    println!("Traits observed for everyone:");
    print_table(&family.predict(&net, &evidence)?);

    let mut evidence = evidence;
    for (var, state) in family.gene_evidence(&[("Meghan", 0)])?.iter() {
        evidence.insert(var, state);
    }
    println!("...and Meghan is known to carry no copies:");
    print_table(&family.predict(&net, &evidence)?);

    Ok(())
}

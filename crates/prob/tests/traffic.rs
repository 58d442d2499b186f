//! # Traffic Network Tests
//!
//! End-to-end scenarios on two small networks:
//! - A 3-node chain Weather → Accident → Commute
//! - The 4-node meeting network, where Weather and Accident both feed a
//!   traffic Jam that decides whether a Meeting is held
//!
//! Exact answers are checked against hand-computed values; structural checks
//! make sure malformed networks never reach inference.

use bayes_prob::{
    ArgumentError, EliminationHeuristic, ErrorKind, Evidence, Inference, Network, NumericError,
    PgmError, StructuralError, TabularCpd, ValidatedNetwork, Variable, VariableElimination,
    PROB_TOLERANCE,
};

fn weather() -> Variable {
    Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap()
}

fn yes_no(name: &str) -> Variable {
    Variable::new(name, ["yes", "no"]).unwrap()
}

fn chain() -> Network {
    let mut net = Network::new();
    net.add_variable(weather()).unwrap();
    net.add_variable(yes_no("Accident")).unwrap();
    net.add_variable(Variable::new("Commute", ["late", "on_time"]).unwrap())
        .unwrap();
    net.add_edge("Weather", "Accident").unwrap();
    net.add_edge("Accident", "Commute").unwrap();
    net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]])
        .unwrap();
    net.attach_table(
        "Accident",
        &["Weather"],
        vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
    )
    .unwrap();
    net.attach_table(
        "Commute",
        &["Accident"],
        vec![vec![0.8, 0.1], vec![0.2, 0.9]],
    )
    .unwrap();
    net
}

fn meeting() -> ValidatedNetwork {
    let mut net = Network::new();
    net.add_variable(weather()).unwrap();
    net.add_variable(yes_no("Accident")).unwrap();
    net.add_variable(yes_no("Jam")).unwrap();
    net.add_variable(Variable::new("Meeting", ["held", "cancelled"]).unwrap())
        .unwrap();

    net.add_edge("Weather", "Accident").unwrap();
    net.add_edge("Weather", "Jam").unwrap();
    net.add_edge("Accident", "Jam").unwrap();
    net.add_edge("Jam", "Meeting").unwrap();

    net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]])
        .unwrap();
    net.attach_table(
        "Accident",
        &["Weather"],
        vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
    )
    .unwrap();
    // Columns: (yes, sunny), (yes, rain), (yes, snow), (no, sunny), ...
    net.attach_table(
        "Jam",
        &["Accident", "Weather"],
        vec![
            vec![0.6, 0.8, 0.9, 0.2, 0.5, 0.7],
            vec![0.4, 0.2, 0.1, 0.8, 0.5, 0.3],
        ],
    )
    .unwrap();
    net.attach_table("Meeting", &["Jam"], vec![vec![0.4, 0.9], vec![0.6, 0.1]])
        .unwrap();
    net.validate().unwrap()
}

// ============================================================================
// Exact Queries
// ============================================================================

#[test]
fn test_accident_given_rain_is_exact() {
    let net = chain().validate().unwrap();
    let p = Inference::new(&net)
        .query_exact(&["Accident"], &Evidence::new().with("Weather", "rain"))
        .unwrap();

    assert_eq!(p.names(), vec!["Accident"]);
    assert!((p.value_of(&[("Accident", "yes")]).unwrap() - 0.2).abs() < PROB_TOLERANCE);
    assert!((p.value_of(&[("Accident", "no")]).unwrap() - 0.8).abs() < PROB_TOLERANCE);
}

#[test]
fn test_meeting_given_accident() {
    let net = meeting();
    let p = Inference::new(&net)
        .query_exact(&["Meeting"], &Evidence::new().with("Accident", "yes"))
        .unwrap();

    // P(Jam=yes | Accident=yes) = (0.07·0.6 + 0.04·0.8 + 0.04·0.9) / 0.15
    // P(held) = 0.4 · P(jam) + 0.9 · P(no jam) = 0.08 / 0.15
    assert!((p.values()[0] - 0.08 / 0.15).abs() < PROB_TOLERANCE);
}

#[test]
fn test_full_joint_point_query() {
    let net = meeting();
    let joint = Inference::new(&net)
        .query_exact(&["Weather", "Accident", "Jam", "Meeting"], &Evidence::new())
        .unwrap();

    let p = joint
        .value_of(&[
            ("Weather", "rain"),
            ("Accident", "yes"),
            ("Jam", "no"),
            ("Meeting", "cancelled"),
        ])
        .unwrap();
    let expected = 0.2 * 0.2 * 0.2 * 0.1;
    assert!((p - expected).abs() < PROB_TOLERANCE);

    // The same number straight from the CPDs.
    let assignment = Evidence::from([
        ("Weather", "rain"),
        ("Accident", "yes"),
        ("Jam", "no"),
        ("Meeting", "cancelled"),
    ]);
    assert!((net.joint_probability(&assignment).unwrap() - expected).abs() < PROB_TOLERANCE);
    assert!((joint.sum() - 1.0).abs() < PROB_TOLERANCE);
}

#[test]
fn test_results_are_distributions() {
    let net = meeting();
    let inference = Inference::new(&net);
    let cases: Vec<(Vec<&str>, Evidence)> = vec![
        (vec!["Weather"], Evidence::new().with("Meeting", "cancelled")),
        (vec!["Accident", "Jam"], Evidence::new().with("Weather", "snow")),
        (
            vec!["Accident"],
            Evidence::new().with("Jam", "yes").with("Meeting", "held"),
        ),
        (vec!["Meeting", "Weather"], Evidence::new()),
    ];

    for (q, e) in cases {
        let p = inference.query_exact(&q, &e).unwrap();
        assert_eq!(p.names(), q);
        assert!(p.values().iter().all(|&v| v >= 0.0));
        assert!((p.sum() - 1.0).abs() < PROB_TOLERANCE, "{:?} | {:?}", q, e);
    }
}

#[test]
fn test_jam_raises_accident_belief() {
    let net = meeting();
    let inference = Inference::new(&net);
    let jam = Evidence::new().with("Jam", "yes");
    let jam_and_snow = jam.clone().with("Weather", "snow");

    let p_jam = inference.query_exact(&["Accident"], &jam).unwrap().values()[0];
    let p_both = inference
        .query_exact(&["Accident"], &jam_and_snow)
        .unwrap()
        .values()[0];
    let p_prior = inference
        .query_exact(&["Accident"], &Evidence::new())
        .unwrap()
        .values()[0];

    // A jam makes an accident more likely than its prior.
    assert!(p_jam > p_prior);
    // Snow raises the accident prior too, so both effects combine.
    assert!(p_both > p_jam);
}

// ============================================================================
// Elimination Order
// ============================================================================

#[test]
fn test_elimination_order_invariance() {
    let net = meeting();
    let ve = VariableElimination::new(&net);
    let evidence = Evidence::new().with("Meeting", "cancelled");

    let reference = ve
        .query_with_order(&["Weather"], &evidence, &["Accident", "Jam"])
        .unwrap();
    let reversed = ve
        .query_with_order(&["Weather"], &evidence, &["Jam", "Accident"])
        .unwrap();
    assert!(reversed.approx_eq(&reference, PROB_TOLERANCE));

    for h in [
        EliminationHeuristic::MinFill,
        EliminationHeuristic::MinDegree,
        EliminationHeuristic::Topological,
    ] {
        let p = VariableElimination::new(&net)
            .with_heuristic(h)
            .query(&["Weather"], &evidence)
            .unwrap();
        assert!(p.approx_eq(&reference, PROB_TOLERANCE), "{:?}", h);
    }
}

#[test]
fn test_evidence_probability_matches_joint() {
    let net = meeting();
    let inference = Inference::new(&net);
    let e = Evidence::new().with("Accident", "yes").with("Meeting", "held");

    // P(A=yes, M=held) = P(A=yes) · P(M=held | A=yes)
    let expected = 0.15 * (0.08 / 0.15);
    assert!((inference.evidence_probability(&e).unwrap() - expected).abs() < PROB_TOLERANCE);
}

// ============================================================================
// Argument Errors
// ============================================================================

#[test]
fn test_argument_errors_are_recoverable() {
    let net = meeting();
    let inference = Inference::new(&net);

    let bad = [
        inference.query_exact(&[], &Evidence::new()),
        inference.query_exact(&["Traffic"], &Evidence::new()),
        inference.query_exact(&["Jam"], &Evidence::new().with("Weather", "fog")),
        inference.query_exact(&["Jam"], &Evidence::new().with("Jam", "yes")),
        inference.query_exact(&["Jam", "Jam"], &Evidence::new()),
    ];
    for result in bad {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    // The same engine still answers a corrected query.
    assert!(inference.query_exact(&["Jam"], &Evidence::new()).is_ok());
}

#[test]
fn test_impossible_evidence_is_numeric() {
    let mut net = Network::new();
    net.add_variable(yes_no("Power")).unwrap();
    net.add_variable(yes_no("Lights")).unwrap();
    net.add_edge("Power", "Lights").unwrap();
    net.attach_table("Power", &[], vec![vec![0.0], vec![1.0]])
        .unwrap();
    net.attach_table("Lights", &["Power"], vec![vec![0.9, 0.0], vec![0.1, 1.0]])
        .unwrap();
    let net = net.validate().unwrap();

    let err = Inference::new(&net)
        .query_exact(&["Power"], &Evidence::new().with("Lights", "yes"))
        .unwrap_err();
    assert_eq!(err, PgmError::Numeric(NumericError::ZeroMass));
    assert_eq!(err.kind(), ErrorKind::NumericInconsistency);
}

// ============================================================================
// Structural Validation
// ============================================================================

#[test]
fn test_cpd_omitting_declared_parent_fails_check() {
    let mut net = Network::new();
    net.add_variable(weather()).unwrap();
    net.add_variable(yes_no("Accident")).unwrap();
    net.add_variable(yes_no("Jam")).unwrap();
    net.add_edge("Weather", "Accident").unwrap();
    net.add_edge("Weather", "Jam").unwrap();
    net.add_edge("Accident", "Jam").unwrap();
    net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]])
        .unwrap();
    net.attach_table(
        "Accident",
        &["Weather"],
        vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
    )
    .unwrap();
    // Jam's table ignores Weather.
    net.attach_table("Jam", &["Accident"], vec![vec![0.7, 0.3], vec![0.3, 0.7]])
        .unwrap();

    let err = net.check().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(matches!(
        err,
        PgmError::Structural(StructuralError::ScopeMismatch { ref variable, .. }) if variable == "Jam"
    ));
    assert!(net.validate().is_err());
}

#[test]
fn test_parent_order_in_table_is_free() {
    // Same Jam table with parents listed Weather-first.
    let mut net = Network::new();
    net.add_variable(weather()).unwrap();
    net.add_variable(yes_no("Accident")).unwrap();
    net.add_variable(yes_no("Jam")).unwrap();
    net.add_edge("Weather", "Accident").unwrap();
    net.add_edge("Weather", "Jam").unwrap();
    net.add_edge("Accident", "Jam").unwrap();
    net.attach_cpd(TabularCpd::prior(weather(), vec![0.7, 0.2, 0.1]).unwrap());
    net.attach_table(
        "Accident",
        &["Weather"],
        vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
    )
    .unwrap();
    // Columns: (sunny, yes), (sunny, no), (rain, yes), ...
    net.attach_table(
        "Jam",
        &["Weather", "Accident"],
        vec![
            vec![0.6, 0.2, 0.8, 0.5, 0.9, 0.7],
            vec![0.4, 0.8, 0.2, 0.5, 0.1, 0.3],
        ],
    )
    .unwrap();
    let net = net.validate().unwrap();

    let reference = meeting();
    let e = Evidence::new().with("Accident", "yes");
    let a = Inference::new(&net).query_exact(&["Jam"], &e).unwrap();
    let b = Inference::new(&reference).query_exact(&["Jam"], &e).unwrap();
    assert!(a.approx_eq(&b, PROB_TOLERANCE));
}

#[test]
fn test_cycle_fails_check() {
    let mut net = chain();
    net.add_edge("Commute", "Weather").unwrap();
    assert!(matches!(
        net.check(),
        Err(PgmError::Structural(StructuralError::Cycle { .. }))
    ));
}

#[test]
fn test_unnormalized_cpd_fails_check() {
    let mut net = Network::new();
    net.add_variable(weather()).unwrap();
    net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.2]])
        .unwrap();
    let err = net.check().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericInconsistency);
}

#[test]
fn test_unknown_names_in_construction() {
    let mut net = chain();
    assert!(matches!(
        net.add_edge("Weather", "Traffic"),
        Err(PgmError::InvalidArgument(ArgumentError::UnknownVariable(_)))
    ));
    assert!(net
        .attach_table("Traffic", &[], vec![vec![1.0]])
        .is_err());
}

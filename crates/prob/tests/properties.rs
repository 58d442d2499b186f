//! Property tests for factor algebra, elimination-order invariance, and exact
//! inference against brute-force enumeration on random DAGs.

use bayes_prob::{
    ArgumentError, EliminationHeuristic, Evidence, Factor, Network, PgmError, TabularCpd,
    ValidatedNetwork, Variable, VariableElimination,
};
use proptest::prelude::*;

/// Cardinality of `V0..V3`; fixed so any two generated factors agree on domains.
const CARDS: [usize; 4] = [2, 3, 2, 3];

const TOL: f64 = 1e-9;

fn var(i: usize) -> Variable {
    Variable::with_cardinality(format!("V{}", i), CARDS[i]).unwrap()
}

fn factor_strategy() -> impl Strategy<Value = Factor> {
    prop::sample::subsequence(vec![0usize, 1, 2, 3], 1..=3)
        .prop_flat_map(|ids| {
            let size: usize = ids.iter().map(|&i| CARDS[i]).product();
            (Just(ids), prop::collection::vec(0.01f64..10.0, size))
        })
        .prop_map(|(ids, values)| {
            let scope = ids.iter().map(|&i| var(i)).collect();
            Factor::new(scope, values).unwrap()
        })
}

/// Binary chain X0 → X1 → ... → X(n-1) with random columns.
fn chain(n: usize, ps: &[f64]) -> ValidatedNetwork {
    let mut net = Network::new();
    for i in 0..n {
        net.add_variable(Variable::with_cardinality(format!("X{}", i), 2).unwrap())
            .unwrap();
    }
    net.attach_table("X0", &[], vec![vec![ps[0]], vec![1.0 - ps[0]]])
        .unwrap();
    for i in 1..n {
        let child = format!("X{}", i);
        let parent = format!("X{}", i - 1);
        net.add_edge(&parent, &child).unwrap();
        let (a, b) = (ps[2 * i - 1], ps[2 * i]);
        net.attach_table(&child, &[parent.as_str()], vec![vec![a, b], vec![1.0 - a, 1.0 - b]])
            .unwrap();
    }
    net.validate().unwrap()
}

fn chain_strategy() -> impl Strategy<Value = (usize, ValidatedNetwork)> {
    (3usize..=5).prop_flat_map(|n| {
        prop::collection::vec(0.05f64..0.95, 2 * n - 1).prop_map(move |ps| (n, chain(n, &ps)))
    })
}

/// Random DAG over `N0..N(n-1)`: `cards[i]` states per node, `edges` masks the
/// pairs `(j, i)` with `j < i` in row order, and CPD columns are drawn from
/// `weights` and normalized.
fn dag(cards: &[usize], edges: &[bool], weights: &[f64]) -> ValidatedNetwork {
    let vars: Vec<Variable> = cards
        .iter()
        .enumerate()
        .map(|(i, &c)| Variable::with_cardinality(format!("N{}", i), c).unwrap())
        .collect();

    let mut net = Network::new();
    for v in &vars {
        net.add_variable(v.clone()).unwrap();
    }

    let mut edge = edges.iter();
    let mut offset = 0;
    for (i, child) in vars.iter().enumerate() {
        let parents: Vec<Variable> = (0..i)
            .filter(|_| *edge.next().unwrap())
            .map(|j| vars[j].clone())
            .collect();
        for p in &parents {
            net.add_edge(p.name(), child.name()).unwrap();
        }
        let card = child.cardinality();
        let cpd = TabularCpd::from_fn(child.clone(), parents, |_| {
            let column: Vec<f64> = (0..card)
                .map(|k| weights[(offset + k) % weights.len()])
                .collect();
            offset += card;
            let total: f64 = column.iter().sum();
            column.into_iter().map(|w| w / total).collect()
        })
        .unwrap();
        net.attach_cpd(cpd);
    }
    net.validate().unwrap()
}

/// `(cards, edges, weights, roles, states)` for [`dag`] plus a query split:
/// role 0 is queried, role 1 observed at `states[i] % cards[i]`, role 2 hidden.
type DagCase = (Vec<usize>, Vec<bool>, Vec<f64>, Vec<usize>, Vec<usize>);

fn dag_case() -> impl Strategy<Value = DagCase> {
    (3usize..=5).prop_flat_map(|n| {
        (
            prop::collection::vec(2usize..=3, n),
            prop::collection::vec(any::<bool>(), n * (n - 1) / 2),
            prop::collection::vec(0.05f64..1.0, 32),
            prop::collection::vec(0usize..3, n),
            prop::collection::vec(0usize..3, n),
        )
    })
}

/// P(query | evidence) by summing the joint over every full assignment.
fn enumerate(net: &ValidatedNetwork, query: &[&str], evidence: &Evidence) -> Vec<f64> {
    let vars = net.variables();
    let cards: Vec<usize> = vars.iter().map(Variable::cardinality).collect();
    let query_ids: Vec<usize> = query.iter().map(|q| net.id(q).unwrap().index()).collect();
    let query_size: usize = query_ids.iter().map(|&i| cards[i]).product();

    let mut totals = vec![0.0; query_size];
    let mut states = vec![0usize; cards.len()];
    for idx in 0..cards.iter().product::<usize>() {
        let mut rest = idx;
        for i in (0..cards.len()).rev() {
            states[i] = rest % cards[i];
            rest /= cards[i];
        }
        let full: Evidence = vars
            .iter()
            .zip(&states)
            .map(|(v, s)| (v.name().to_string(), s.to_string()))
            .collect();
        if evidence.iter().any(|(k, s)| full.get(k) != Some(s)) {
            continue;
        }

        let slot = query_ids
            .iter()
            .fold(0, |acc, &i| acc * cards[i] + states[i]);
        totals[slot] += net.joint_probability(&full).unwrap();
    }

    let z: f64 = totals.iter().sum();
    totals.into_iter().map(|p| p / z).collect()
}

proptest! {
    #[test]
    fn test_marginalizing_everything_yields_the_sum(f in factor_strategy()) {
        let names = f.names();
        let total = f.marginalize_all(&names).unwrap();
        prop_assert!(total.is_scalar());
        prop_assert!((total.values()[0] - f.sum()).abs() < TOL * f.sum().max(1.0));
    }

    #[test]
    fn test_normalize_sums_to_one(f in factor_strategy()) {
        let p = f.normalize().unwrap();
        prop_assert!((p.sum() - 1.0).abs() < TOL);
        prop_assert!(p.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_multiply_commutes_up_to_scope_order(a in factor_strategy(), b in factor_strategy()) {
        let ab = a.multiply(&b).unwrap();
        let ba = b.multiply(&a).unwrap();
        let names = ab.names();
        let ba = ba.reorder(&names).unwrap();
        prop_assert!(ab.approx_eq(&ba, TOL * 100.0));
        prop_assert!(ab.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_cpd_columns_marginalize_to_one(weights in prop::collection::vec(0.01f64..10.0, 12)) {
        let child = Variable::with_cardinality("C", 3).unwrap();
        let parents = vec![var(0), var(2)];
        let cpd = TabularCpd::from_fn(child, parents, |s| {
            let column = &weights[(s[0] * 2 + s[1]) * 3..][..3];
            let total: f64 = column.iter().sum();
            column.iter().map(|w| w / total).collect()
        })
        .unwrap();
        prop_assert!(cpd.check_normalized(TOL).is_ok());

        let per_parent = cpd.factor().marginalize("C").unwrap();
        prop_assert_eq!(per_parent.len(), 4);
        prop_assert!(per_parent.values().iter().all(|v| (v - 1.0).abs() < TOL));
    }

    #[test]
    fn test_reduce_is_idempotent(f in factor_strategy(), state in 0usize..2) {
        let name = f.scope()[0].name().to_string();
        let once = f.reduce_index(&name, state).unwrap();
        let twice = once.reduce_index(&name, state).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert!(!once.contains(&name));

        let other = 1 - state;
        let err = once.reduce_index(&name, other).unwrap_err();
        let is_already_reduced = matches!(
            err,
            PgmError::InvalidArgument(ArgumentError::AlreadyReduced { .. })
        );
        prop_assert!(is_already_reduced);
    }

    #[test]
    fn test_reduce_on_absent_variable_is_rejected(f in factor_strategy()) {
        let missing = (0..4).map(|i| format!("V{}", i)).find(|n| !f.contains(n));
        if let Some(name) = missing {
            let is_not_in_scope = matches!(
                f.reduce(&name, "0"),
                Err(PgmError::InvalidArgument(ArgumentError::NotInScope(_)))
            );
            prop_assert!(is_not_in_scope);
        }
    }

    #[test]
    fn test_elimination_order_does_not_change_the_answer((n, net) in chain_strategy()) {
        let last = format!("X{}", n - 1);
        let last = last.as_str();
        let evidence = Evidence::new().with("X0", "1");
        let middle: Vec<String> = (1..n - 1).map(|i| format!("X{}", i)).collect();
        let forward: Vec<&str> = middle.iter().map(String::as_str).collect();
        let backward: Vec<&str> = forward.iter().rev().copied().collect();

        let ve = VariableElimination::new(&net);
        let reference = ve.query_with_order(&[last], &evidence, &forward).unwrap();
        let reversed = ve.query_with_order(&[last], &evidence, &backward).unwrap();
        prop_assert!(reversed.approx_eq(&reference, TOL));

        for h in [
            EliminationHeuristic::MinFill,
            EliminationHeuristic::MinDegree,
            EliminationHeuristic::Topological,
        ] {
            let p = VariableElimination::new(&net)
                .with_heuristic(h)
                .query(&[last], &evidence)
                .unwrap();
            prop_assert!(p.approx_eq(&reference, TOL));
            prop_assert!((p.sum() - 1.0).abs() < TOL);
        }
    }

    #[test]
    fn test_random_dag_queries_match_enumeration(
        (cards, edges, weights, roles, states) in dag_case()
    ) {
        let net = dag(&cards, &edges, &weights);
        let names: Vec<String> = (0..cards.len()).map(|i| format!("N{}", i)).collect();

        let query: Vec<&str> = (0..cards.len())
            .filter(|&i| roles[i] == 0)
            .map(|i| names[i].as_str())
            .collect();
        prop_assume!(!query.is_empty());

        let mut evidence = Evidence::new();
        for i in (0..cards.len()).filter(|&i| roles[i] == 1) {
            evidence.insert(names[i].as_str(), (states[i] % cards[i]).to_string());
        }

        let expected = enumerate(&net, &query, &evidence);
        for h in [
            EliminationHeuristic::MinFill,
            EliminationHeuristic::MinDegree,
            EliminationHeuristic::Topological,
        ] {
            let p = VariableElimination::new(&net)
                .with_heuristic(h)
                .query(&query, &evidence)
                .unwrap();
            prop_assert_eq!(p.names(), query.clone());
            prop_assert!((p.sum() - 1.0).abs() < TOL);
            prop_assert!(p.values().iter().all(|&v| v >= 0.0));
            prop_assert_eq!(p.values().len(), expected.len());
            for (got, want) in p.values().iter().zip(&expected) {
                prop_assert!((got - want).abs() < TOL, "{:?}: {} vs {}", h, got, want);
            }
        }
    }
}

use phylogen::ModelError;
use phylogen::config::{EmptyGroupPolicy, ModelConfig};
use phylogen::generators::coalescent::simulate_coalescent;
use phylogen::generators::population::{
    ConstantPopulation, ExponentialPopulation, PopulationFunction, SvsPopulationFunction,
};
use phylogen::generators::subsample::{combine_two_array, leaf_list, sample_names, subsample_tree};
use phylogen::generators::substitution::rate_matrix;
use phylogen::generators::{
    Coalescent, ConstantPopFunc, ExponentialPopFunc, Gtr, Hky, JukesCantor, SubsampledTree, SubstituteClade,
    SvsFunction,
};
use phylogen::graph::{GraphicalModel, Payload};
use phylogen::newick::parse_str;
use phylogen::random::RandomSource;
use phylogen::tree::CLADE_LEAF_PREFIX;
use rstest::rstest;
use std::sync::Arc;

const EPS: f64 = 1e-9;

fn seeded_model(seed: u64) -> GraphicalModel {
    GraphicalModel::with_config(ModelConfig::default().with_seed(seed))
}

fn names(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn sixteen_taxon_tree(seed: u64) -> phylogen::tree::TimeTree {
    let taxa: Vec<String> = (0..16).map(|i| i.to_string()).collect();
    let population = ConstantPopulation::new(1.0).unwrap();
    simulate_coalescent(&taxa, &population, &mut RandomSource::seeded(seed)).unwrap()
}

/// Checks rows sum to zero and the expected rate `-Σ πᵢ Qᵢᵢ` equals `mean_rate`.
fn assert_scaled_rate_matrix(q: &[Vec<f64>], freq: &[f64], mean_rate: f64) {
    for row in q {
        assert!(row.iter().sum::<f64>().abs() < EPS);
    }
    let total: f64 = (0..q.len()).map(|i| -freq[i] * q[i][i]).sum();
    assert!((total - mean_rate).abs() < EPS, "mean rate {}", total);
}

// ============= Population Function Tests =============

#[test]
fn test_constant_population() {
    let f = ConstantPopulation::new(2.0).unwrap();
    assert_eq!(f.theta(5.0), 2.0);
    assert_eq!(f.intensity(4.0), 2.0);
    assert_eq!(f.inverse_intensity(2.0), 4.0);
    assert!(ConstantPopulation::new(0.0).is_err());
}

#[rstest]
#[case(0.5)]
#[case(0.0)]
#[case(-0.2)]
fn test_exponential_population_inverts_intensity(#[case] growth_rate: f64) {
    let f = ExponentialPopulation::new(10.0, growth_rate).unwrap();
    for t in [0.0, 0.3, 1.0, 2.5] {
        let x = f.intensity(t);
        assert!((f.inverse_intensity(x) - t).abs() < 1e-9);
    }
    assert_eq!(f.theta(0.0), 10.0);
}

#[test]
fn test_declining_population_intensity_is_bounded() {
    // Total intensity of θ(t) = 10 e^(0.5 t) is 1/(10 * 0.5) = 0.2
    let f = ExponentialPopulation::new(10.0, -0.5).unwrap();
    assert_eq!(f.inverse_intensity(0.25), f64::INFINITY);
}

#[test]
fn test_svs_delegates_to_selected_model() {
    let constant: Arc<dyn PopulationFunction> = Arc::new(ConstantPopulation::new(3.0).unwrap());
    let exponential: Arc<dyn PopulationFunction> = Arc::new(ExponentialPopulation::new(10.0, 0.5).unwrap());
    let models = vec![constant, Arc::clone(&exponential)];

    let svs = SvsPopulationFunction::select(1, &models).unwrap();
    assert_eq!(svs.indicator(), 1);
    assert_eq!(svs.selection_indicator(), Some(1));
    assert!(Arc::ptr_eq(svs.model(), &exponential));
    assert_eq!(svs.name(), "exponential");
    for t in [0.0, 1.0, 4.0] {
        assert_eq!(svs.theta(t), exponential.theta(t));
        assert_eq!(svs.intensity(t), exponential.intensity(t));
    }
    assert_eq!(svs.inverse_intensity(0.3), exponential.inverse_intensity(0.3));
}

#[rstest]
#[case(-1)]
#[case(2)]
fn test_svs_indicator_out_of_range(#[case] indicator: i64) {
    let models: Vec<Arc<dyn PopulationFunction>> = vec![
        Arc::new(ConstantPopulation::new(1.0).unwrap()),
        Arc::new(ConstantPopulation::new(2.0).unwrap()),
    ];
    let error = SvsPopulationFunction::select(indicator, &models).unwrap_err();
    assert_eq!(
        error,
        ModelError::InvalidArgument(format!("Invalid modelIndex value {}: must be in [0, 2)", indicator))
    );
}

#[test]
fn test_svs_function_in_model() {
    let mut model = seeded_model(1);
    let theta = model.constant(None, 3.0);
    let theta0 = model.constant(None, 10.0);
    let growth_rate = model.constant(None, 0.1);
    let constant = model.apply(None, ConstantPopFunc, &[("theta", theta)]).unwrap();
    let exponential = model
        .apply(None, ExponentialPopFunc, &[("theta0", theta0), ("growthRate", growth_rate)])
        .unwrap();

    let functions: Vec<Arc<dyn PopulationFunction>> = vec![
        Arc::clone(model.payload(constant).as_population_function().unwrap()),
        Arc::clone(model.payload(exponential).as_population_function().unwrap()),
    ];
    let models = model.constant(Some("models"), functions);
    let indicator = model.constant(Some("indicator"), 0);
    let selected = model
        .apply(Some("popFunc"), SvsFunction, &[("indicator", indicator), ("models", models)])
        .unwrap();

    let function = model.payload(selected).as_population_function().unwrap();
    assert_eq!(function.selection_indicator(), Some(0));
    assert_eq!(function.theta(2.0), 3.0);

    let bad = model.constant(None, 5);
    let result = model.apply(None, SvsFunction, &[("indicator", bad), ("models", models)]);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

// ============= Coalescent Tests =============

#[test]
fn test_coalescent_tree_shape() {
    let tree = sixteen_taxon_tree(3);

    assert!(tree.is_valid());
    assert_eq!(tree.leaf_count(), 16);
    assert_eq!(tree.node_count(), 31);
    assert!(tree.is_ultrametric());
    assert!(tree.root_age() > 0.0);
    for (i, leaf) in tree.leaves().iter().enumerate() {
        assert_eq!(leaf.leaf_index(), Some(i));
        assert_eq!(leaf.id(), Some(i.to_string().as_str()));
    }
}

#[test]
fn test_coalescent_with_taxa_names() {
    let mut model = seeded_model(2);
    let theta = model.constant(None, 1.0);
    let taxa = model.constant(None, names(&["kea", "kaka", "kakapo"]));
    let psi = model.sample(None, Coalescent, &[("theta", theta), ("taxa", taxa)]).unwrap();

    let tree = model.payload(psi).as_tree().unwrap();
    assert_eq!(tree.taxa_names(), vec!["kea", "kaka", "kakapo"]);
}

#[test]
fn test_coalescent_with_population_function() {
    let mut model = seeded_model(4);
    let theta0 = model.constant(None, 5.0);
    let growth_rate = model.constant(None, 1.0);
    let function = model
        .apply(None, ExponentialPopFunc, &[("theta0", theta0), ("growthRate", growth_rate)])
        .unwrap();
    let n = model.constant(None, 10);
    let psi = model.sample(None, Coalescent, &[("popFunc", function), ("n", n)]).unwrap();

    let tree = model.payload(psi).as_tree().unwrap();
    assert_eq!(tree.leaf_count(), 10);
    assert!(tree.is_ultrametric());
}

#[test]
fn test_coalescent_single_taxon() {
    let taxa = names(&["solo"]);
    let tree = simulate_coalescent(&taxa, &ConstantPopulation::new(1.0).unwrap(), &mut RandomSource::seeded(1)).unwrap();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.root_age(), 0.0);
}

#[rstest]
#[case::both_sizes(true, true)]
#[case::no_size(false, false)]
fn test_coalescent_needs_exactly_one_size(#[case] with_theta: bool, #[case] with_function: bool) {
    let mut model = seeded_model(1);
    let theta = model.constant(None, 1.0);
    let function = model.apply(None, ConstantPopFunc, &[("theta", theta)]).unwrap();
    let n = model.constant(None, 4);

    let mut args = vec![("n", n)];
    if with_theta {
        args.push(("theta", theta));
    }
    if with_function {
        args.push(("popFunc", function));
    }
    let result = model.sample(None, Coalescent, &args);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_coalescent_n_and_taxa_mismatch() {
    let mut model = seeded_model(1);
    let theta = model.constant(None, 1.0);
    let n = model.constant(None, 4);
    let taxa = model.constant(None, names(&["A", "B"]));
    let result = model.sample(None, Coalescent, &[("theta", theta), ("n", n), ("taxa", taxa)]);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_coalescent_duplicate_taxa() {
    let taxa = names(&["A", "B", "A"]);
    let result = simulate_coalescent(&taxa, &ConstantPopulation::new(1.0).unwrap(), &mut RandomSource::seeded(1));
    assert!(result.is_err());
}

// ============= Substitution Model Tests =============

#[test]
fn test_jukes_cantor() {
    let mut model = seeded_model(1);
    let q = model.apply(None, JukesCantor, &[]).unwrap();
    let q = model.payload(q).as_number_matrix().unwrap();

    assert_scaled_rate_matrix(q, &[0.25; 4], 1.0);
    assert!((q[0][1] - 1.0 / 3.0).abs() < EPS);
    assert!((q[2][3] - 1.0 / 3.0).abs() < EPS);
}

#[test]
fn test_hky() {
    let freq = vec![0.1, 0.2, 0.3, 0.4];
    let mut model = seeded_model(1);
    let kappa = model.constant(None, 4.0);
    let freq_value = model.constant(None, freq.clone());
    let mean_rate = model.constant(None, 2.0);
    let q = model
        .apply(None, Hky, &[("kappa", kappa), ("freq", freq_value), ("meanRate", mean_rate)])
        .unwrap();
    let q = model.payload(q).as_number_matrix().unwrap();

    assert_scaled_rate_matrix(q, &freq, 2.0);
    // A -> G is a transition, A -> C a transversion
    assert!((q[0][2] / freq[2] - 4.0 * q[0][1] / freq[1]).abs() < EPS);
    // Reversibility
    assert!((freq[0] * q[0][3] - freq[3] * q[3][0]).abs() < EPS);
}

#[test]
fn test_gtr() {
    let freq = vec![0.25, 0.25, 0.25, 0.25];
    let rates = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut model = seeded_model(1);
    let rates_value = model.constant(None, rates.clone());
    let freq_value = model.constant(None, freq.clone());
    let q = model.apply(None, Gtr, &[("rates", rates_value), ("freq", freq_value)]).unwrap();
    let q = model.payload(q).as_number_matrix().unwrap();

    assert_scaled_rate_matrix(q, &freq, 1.0);
    // Equal frequencies: off-diagonals are proportional to the exchangeabilities
    let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
    for (k, &(i, j)) in pairs.iter().enumerate() {
        assert!((q[i][j] / q[0][1] - rates[k]).abs() < EPS);
        assert!((q[j][i] - q[i][j]).abs() < EPS);
    }
}

#[rstest]
#[case(vec![1.0, 1.0, 1.0, 1.0, 1.0], vec![0.25; 4])]
#[case(vec![1.0, -1.0, 1.0, 1.0, 1.0, 1.0], vec![0.25; 4])]
#[case(vec![1.0; 6], vec![0.5, 0.5, 0.5, 0.5])]
#[case(vec![1.0; 6], vec![0.5, 0.5])]
fn test_gtr_invalid_arguments(#[case] rates: Vec<f64>, #[case] freq: Vec<f64>) {
    let mut model = seeded_model(1);
    let rates = model.constant(None, rates);
    let freq = model.constant(None, freq);
    let result = model.apply(None, Gtr, &[("rates", rates), ("freq", freq)]);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_rate_matrix_rejects_zero_rates() {
    assert!(rate_matrix(|_, _| 0.0, &[0.25; 4], 1.0).is_err());
    assert!(rate_matrix(|_, _| 1.0, &[0.25; 4], 0.0).is_err());
}

// ============= Subsampling Tests =============

#[test]
fn test_combine_two_array() {
    let combined = combine_two_array(&names(&["1", "2"]), &names(&["3", "4"]));
    assert_eq!(combined, names(&["1", "2", "3", "4"]));
}

#[test]
fn test_leaf_list_skips_unknown_names() {
    let tree = sixteen_taxon_tree(1);
    assert_eq!(leaf_list(&tree, &["17", "5", "1"]), names(&["1", "5"]));
}

#[test]
fn test_sample_names_distinct() {
    let pool = names(&["a", "b", "c", "d", "e"]);
    let mut rng = RandomSource::seeded(8);
    let mut sampled = sample_names(&pool, 5, &mut rng);
    sampled.sort();
    assert_eq!(sampled, pool);
    assert!(sample_names(&pool, 0, &mut rng).is_empty());
}

#[test]
fn test_subsampled_tree_groups() {
    let tree = sixteen_taxon_tree(5);
    let tumour = names(&["2", "3", "4", "6"]);
    let normal = names(&["1", "5", "14", "12", "15"]);

    let mut model = seeded_model(6);
    let tree_value = model.constant(Some("fullTree"), tree);
    let taxa = model.constant(Some("taxa"), vec![tumour.clone(), normal.clone()]);
    let fractions = model.constant(Some("fractions"), vec![0.5, 0.4]);
    let subsampled = model
        .sample(
            Some("subTree"),
            SubsampledTree,
            &[("tree", tree_value), ("taxa", taxa), ("sampleFraction", fractions)],
        )
        .unwrap();

    let subsampled = model.payload(subsampled).as_tree().unwrap();
    assert!(subsampled.is_valid());
    // round(0.5 * 4) tumour and round(0.4 * 5) normal taxa
    let kept = subsampled.taxa_names();
    assert_eq!(kept.len(), 4);
    assert_eq!(kept.iter().filter(|id| tumour.contains(id)).count(), 2);
    assert_eq!(kept.iter().filter(|id| normal.contains(id)).count(), 2);
    assert_eq!(subsampled.single_child_node_count(), 0);
}

#[rstest]
#[case(EmptyGroupPolicy::Allow, true)]
#[case(EmptyGroupPolicy::Reject, false)]
fn test_subsample_empty_group_policy(#[case] policy: EmptyGroupPolicy, #[case] succeeds: bool) {
    let tree = sixteen_taxon_tree(5);
    let groups = vec![names(&["2", "3", "4", "6"]), names(&["1"])];
    let mut rng = RandomSource::seeded(1);

    // round(0.4 * 1) = 0
    let result = subsample_tree(&tree, &groups, &[0.5, 0.4], policy, &mut rng);
    assert_eq!(result.is_ok(), succeeds);
    if let Ok(subsampled) = result {
        assert_eq!(subsampled.leaf_count(), 2);
    }
}

#[rstest]
#[case(vec![0.5], "length mismatch")]
#[case(vec![0.5, 1.5], "fraction above one")]
#[case(vec![0.0, 0.0], "nothing retained")]
fn test_subsample_invalid_arguments(#[case] fractions: Vec<f64>, #[case] _reason: &str) {
    let tree = sixteen_taxon_tree(5);
    let groups = vec![names(&["2", "3"]), names(&["1", "5"])];
    let mut rng = RandomSource::seeded(1);

    let result = subsample_tree(&tree, &groups, &fractions, EmptyGroupPolicy::Allow, &mut rng);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

// ============= Clade Substitution Tests =============

#[test]
fn test_substitute_clade() {
    let base = parse_str("((A:1,B:1):1,C:2);").unwrap();
    let clade = parse_str("(X:0.5,Y:0.5);").unwrap();
    let c = base.leaf_by_id("C").unwrap().index();

    let mut model = seeded_model(1);
    let base_tree = model.constant(Some("baseTree"), base);
    let clade_tree = model.constant(Some("cladeTree"), clade);
    let node = model.constant(None, c as i64);
    let time = model.constant(None, 1.5);
    let label = model.constant(None, "donor");
    let substituted = model
        .apply(
            Some("newTree"),
            SubstituteClade,
            &[
                ("baseTree", base_tree),
                ("cladeTree", clade_tree),
                ("node", node),
                ("time", time),
                ("nodeLabel", label),
            ],
        )
        .unwrap();

    let tree = model.payload(substituted).as_tree().unwrap();
    assert!(tree.is_valid());
    assert_eq!(tree.leaf_count(), 4);
    assert!(tree.leaf_by_id("C").is_none());
    let x = tree.leaf_by_id(&format!("{}X", CLADE_LEAF_PREFIX)).unwrap();
    assert!((x.age() - 1.0).abs() < EPS);
    let donor = tree.parent_of(x.index()).unwrap();
    assert_eq!(donor.id(), Some("donor"));
    assert!((donor.age() - 1.5).abs() < EPS);

    // The base tree value is untouched
    assert!(model.payload(base_tree).as_tree().unwrap().leaf_by_id("C").is_some());
}

#[rstest]
#[case(-1)]
#[case(99)]
fn test_substitute_clade_node_out_of_range(#[case] node: i64) {
    let mut model = seeded_model(1);
    let base_tree = model.constant(None, parse_str("((A:1,B:1):1,C:2);").unwrap());
    let clade_tree = model.constant(None, parse_str("(X:0.5,Y:0.5);").unwrap());
    let node = model.constant(None, node);
    let time = model.constant(None, 1.5);
    let label = model.constant(None, "donor");

    let result = model.apply(
        None,
        SubstituteClade,
        &[
            ("baseTree", base_tree),
            ("cladeTree", clade_tree),
            ("node", node),
            ("time", time),
            ("nodeLabel", label),
        ],
    );
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_payload_from_tree_keeps_newick() {
    let tree = parse_str("((A:1,B:1):1,C:2);").unwrap();
    let payload = Payload::from(tree.clone());
    assert_eq!(payload.to_string(), tree.to_newick(true));
}

#[test]
fn test_tree_payload_equality() {
    let tree = parse_str("((A:1,B:1)ab:1,C:2);").unwrap();
    let payload = Payload::from(tree.clone());
    assert_eq!(payload, Payload::from(tree.clone()));

    // Internal labels and metadata take part in equality
    let mut relabelled = tree.clone();
    let ab = relabelled.leaf_by_id("A").unwrap().parent().unwrap();
    relabelled.node_mut(ab).set_id("xy");
    assert_ne!(payload, Payload::from(relabelled));

    let mut annotated = tree.clone();
    let c = annotated.leaf_by_id("C").unwrap().index();
    annotated.node_mut(c).set_metadata("group", "normal");
    assert_ne!(payload, Payload::from(annotated));

    // Trees without a root compare without writing Newick
    let mut unrooted = phylogen::tree::TimeTree::new();
    unrooted.add_leaf("A", 0.0);
    assert_eq!(Payload::from(unrooted.clone()), Payload::from(unrooted));
}

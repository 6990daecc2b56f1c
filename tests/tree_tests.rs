use phylogen::ModelError;
use phylogen::tree::{CLADE_LEAF_PREFIX, MetaValue, Taxa, TimeTree, different_taxa_names};
use rstest::rstest;

/// ((A:1,B:1):1,C:2);
fn three_taxon_tree() -> TimeTree {
    let mut tree = TimeTree::new();
    let a = tree.add_leaf("A", 0.0);
    let b = tree.add_leaf("B", 0.0);
    let c = tree.add_leaf("C", 0.0);
    let ab = tree.add_internal(1.0, &[a, b]);
    let root = tree.add_internal(2.0, &[ab, c]);
    tree.set_root(root, true);
    tree
}

/// (((A:1,B:1):1,C:2):2,(D:3,E:3):1);
fn five_taxon_tree() -> TimeTree {
    let mut tree = TimeTree::new();
    let a = tree.add_leaf("A", 0.0);
    let b = tree.add_leaf("B", 0.0);
    let c = tree.add_leaf("C", 0.0);
    let d = tree.add_leaf("D", 0.0);
    let e = tree.add_leaf("E", 0.0);
    let ab = tree.add_internal(1.0, &[a, b]);
    let abc = tree.add_internal(2.0, &[ab, c]);
    let de = tree.add_internal(3.0, &[d, e]);
    let root = tree.add_internal(4.0, &[abc, de]);
    tree.set_root(root, true);
    tree
}

fn leaf_ids(tree: &TimeTree) -> Vec<String> {
    tree.leaves().iter().map(|n| n.id().unwrap().to_string()).collect()
}

// ============= Construction and Indexing Tests =============

#[test]
fn test_building_tree() {
    let tree = three_taxon_tree();

    assert!(tree.is_valid());
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.node_count(), 5);
    assert_eq!(tree.branch_count(), 4);

    let root = tree.root();
    assert!(root.is_root());
    assert_eq!(root.index(), 4);
    assert_eq!(root.age(), 2.0);

    let b = tree.leaf_by_id("B").unwrap();
    assert!(b.is_leaf());
    assert_eq!(b.leaf_index(), Some(1));
    assert_eq!(tree.parent_of(b.index()).unwrap().index(), 3);
    assert_eq!(tree.branch_length(b.index()), 1.0);
}

#[test]
fn test_set_root_canonical_indices() {
    let tree = five_taxon_tree();
    let n = tree.num_leaves();

    for (i, node) in tree.nodes().iter().enumerate() {
        assert_eq!(node.index(), i);
        assert_eq!(tree.node_by_index(i).index(), i);
        assert_eq!(node.is_leaf(), i < n);
    }
    assert_eq!(tree.root().index(), tree.node_count() - 1);
}

#[test]
fn test_set_root_internal_nodes_in_post_order() {
    let tree = five_taxon_tree();
    let ages: Vec<f64> = tree.internal_nodes().iter().map(|n| n.age()).collect();
    assert_eq!(ages, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_set_root_keeps_preset_leaf_indices() {
    let mut tree = TimeTree::new();
    let a = tree.add_indexed_leaf("A", 0.0, 2);
    let b = tree.add_indexed_leaf("B", 0.0, 0);
    let c = tree.add_indexed_leaf("C", 0.0, 1);
    let ab = tree.add_internal(1.0, &[a, b]);
    let root = tree.add_internal(2.0, &[ab, c]);
    tree.set_root(root, false);

    assert!(tree.is_valid());
    assert_eq!(leaf_ids(&tree), vec!["B", "C", "A"]);
}

#[test]
fn test_set_root_reindex_overrides_preset_leaf_indices() {
    let mut tree = TimeTree::new();
    let a = tree.add_indexed_leaf("A", 0.0, 1);
    let b = tree.add_indexed_leaf("B", 0.0, 0);
    let root = tree.add_internal(1.0, &[a, b]);
    tree.set_root(root, true);

    assert_eq!(leaf_ids(&tree), vec!["A", "B"]);
}

#[test]
fn test_copy_preserves_leaf_indices() {
    let tree = five_taxon_tree();
    let mut copy = tree.clone();
    copy.node_mut(0).set_id("Z");

    assert_eq!(leaf_ids(&tree), vec!["A", "B", "C", "D", "E"]);
    assert_eq!(copy.leaves()[1].id(), Some("B"));
    assert_eq!(copy.leaves()[0].id(), Some("Z"));
}

#[test]
fn test_pre_and_post_order() {
    let tree = three_taxon_tree();
    let pre: Vec<usize> = tree.pre_order_iter().map(|n| n.index()).collect();
    let post: Vec<usize> = tree.post_order_iter().map(|n| n.index()).collect();

    assert_eq!(pre, vec![4, 3, 0, 1, 2]);
    assert_eq!(post, vec![0, 1, 3, 2, 4]);
}

#[test]
fn test_leaves_below() {
    let tree = five_taxon_tree();
    let de = tree.parent_of(tree.leaf_by_id("D").unwrap().index()).unwrap().index();
    let below: Vec<&str> = tree
        .leaves_below(de)
        .into_iter()
        .map(|i| tree[i].id().unwrap())
        .collect();
    assert_eq!(below, vec!["D", "E"]);
}

#[test]
#[should_panic]
fn test_root_panics_on_empty_tree() {
    let tree = TimeTree::new();
    tree.root();
}

#[test]
#[should_panic]
fn test_add_child_older_than_parent_panics() {
    let mut tree = TimeTree::new();
    let a = tree.add_leaf("A", 3.0);
    tree.add_internal(1.0, &[a]);
}

#[test]
#[should_panic]
fn test_stale_node_list_panics() {
    let mut tree = three_taxon_tree();
    let d = tree.add_leaf("D", 0.0);
    tree.add_child(tree.root_index(), d);
    tree.leaves();
}

#[test]
#[should_panic]
fn test_duplicate_leaf_index_panics() {
    let mut tree = TimeTree::new();
    let a = tree.add_indexed_leaf("A", 0.0, 0);
    let b = tree.add_indexed_leaf("B", 0.0, 0);
    let root = tree.add_internal(1.0, &[a, b]);
    tree.set_root(root, false);
}

#[test]
#[should_panic]
fn test_set_root_on_removed_node_panics() {
    let mut tree = three_taxon_tree();
    tree.remove_leaf(0);
    tree.set_root(0, true);
}

// ============= Metrics Tests =============

#[test]
fn test_metrics() {
    let tree = five_taxon_tree();

    assert_eq!(tree.tree_length(), 1.0 + 1.0 + 2.0 + 3.0 + 3.0 + 1.0 + 2.0 + 1.0);
    assert_eq!(tree.root_age(), 4.0);
    assert_eq!(tree.extant_count(), 5);
    assert_eq!(tree.leaf_count(), 5);
    assert_eq!(tree.direct_ancestor_count(), 0);
    assert!(tree.is_ultrametric());
    assert!(!tree.has_origin());
}

#[test]
fn test_ultrametric_requires_extant_leaves() {
    // Leaves share an age, but none is extant
    let mut tree = TimeTree::new();
    let a = tree.add_leaf("A", 1.0);
    let b = tree.add_leaf("B", 1.0);
    let root = tree.add_internal(2.0, &[a, b]);
    tree.set_root(root, true);

    assert!(tree.is_valid());
    assert_eq!(tree.extant_count(), 0);
    assert!(!tree.is_ultrametric());
}

#[test]
fn test_direct_ancestors() {
    // Sampled ancestor S on a zero-length branch and a single-child node above B
    let mut tree = TimeTree::new();
    let a = tree.add_leaf("A", 0.0);
    let s = tree.add_leaf("S", 1.0);
    let b = tree.add_leaf("B", 0.5);
    let ancestor = tree.add_internal(1.5, &[b]);
    let sa = tree.add_internal(1.0, &[a, s]);
    let root = tree.add_internal(2.0, &[sa, ancestor]);
    tree.set_root(root, true);

    assert!(tree.is_valid());
    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.leaf_count(), 2);
    assert_eq!(tree.extant_count(), 1);
    assert_eq!(tree.single_child_node_count(), 1);
    assert_eq!(tree.direct_ancestor_count(), 2);
    assert!(tree.is_direct_ancestor(tree.leaf_by_id("S").unwrap().index()));
    assert!(!tree.is_ultrametric());
}

#[test]
fn test_has_origin() {
    let mut tree = TimeTree::new();
    let a = tree.add_leaf("A", 0.0);
    let b = tree.add_leaf("B", 0.0);
    let mrca = tree.add_internal(1.0, &[a, b]);
    let origin = tree.add_internal(3.0, &[mrca]);
    tree.set_root(origin, true);

    assert!(tree.has_origin());
    assert_eq!(tree.root_age(), 3.0);
}

#[rstest]
#[case(10.0, 4.0)]
#[case(3.5, 3.0)]
#[case(1.0, 1.0)]
#[case(0.0, 0.0)]
fn test_oldest_node(#[case] max_age: f64, #[case] expected: f64) {
    let tree = five_taxon_tree();
    assert_eq!(tree.oldest_node(max_age).unwrap().age(), expected);
}

#[test]
fn test_oldest_node_first_wins_ties() {
    let tree = five_taxon_tree();
    assert_eq!(tree.oldest_node(0.0).unwrap().index(), 0);
    assert!(tree.oldest_node(-1.0).is_none());
}

// ============= Pruning Tests =============

#[rstest]
#[case(&["A", "C"], "(A:2,C:2):0.0;")]
#[case(&["A", "B"], "(A:1,B:1):0.0;")]
#[case(&["A", "B", "C"], "((A:1,B:1):1,C:2):0.0;")]
#[case(&["C"], "C:0.0;")]
fn test_retain_leaves(#[case] keep: &[&str], #[case] expected: &str) {
    let mut tree = three_taxon_tree();
    tree.retain_leaves(keep.iter().copied()).unwrap();

    assert!(tree.is_valid());
    assert_eq!(tree.leaf_count(), keep.len());
    assert_eq!(tree.to_newick(true), expected);
}

#[test]
fn test_retain_leaves_five_taxa() {
    let mut tree = five_taxon_tree();
    tree.retain_leaves(["B", "C", "E"]).unwrap();

    assert!(tree.is_valid());
    assert_eq!(leaf_ids(&tree), vec!["B", "C", "E"]);
    assert_eq!(tree.to_newick(true), "((B:1,C:2):2,E:4):0.0;");
    assert_eq!(tree.root_age(), 4.0);
}

#[test]
fn test_retain_leaves_root_replaced_by_child() {
    let mut tree = five_taxon_tree();
    tree.retain_leaves(["D", "E"]).unwrap();

    assert_eq!(tree.root_age(), 3.0);
    assert_eq!(tree.to_newick(true), "(D:3,E:3):0.0;");
}

#[test]
fn test_retain_no_leaf_fails() {
    let mut tree = three_taxon_tree();
    let result = tree.retain_leaves(["X"]);
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

// ============= Clade Grafting Tests =============

#[test]
fn test_graft_clade() {
    let mut base = five_taxon_tree();
    let c = base.leaf_by_id("C").unwrap().index();

    let mut clade = TimeTree::new();
    let x = clade.add_leaf("X", 0.0);
    let y = clade.add_leaf("Y", 0.0);
    let root = clade.add_internal(0.5, &[x, y]);
    clade.set_root(root, true);

    base.graft_clade(c, &clade, 1.5, "donor").unwrap();

    assert!(base.is_valid());
    assert_eq!(base.num_leaves(), 6);
    let x = base.leaf_by_id(&format!("{}X", CLADE_LEAF_PREFIX)).unwrap();
    assert_eq!(x.age(), 1.0);
    let donor = base.parent_of(x.index()).unwrap();
    assert_eq!(donor.id(), Some("donor"));
    assert_eq!(donor.age(), 1.5);
    assert_eq!(base.branch_length(donor.index()), 0.5);
    assert!(base.leaf_by_id("C").is_none());
}

#[rstest]
#[case(0.0)]
#[case(2.0)]
#[case(2.5)]
fn test_graft_clade_time_outside_branch_fails(#[case] time: f64) {
    let mut base = five_taxon_tree();
    let c = base.leaf_by_id("C").unwrap().index();
    let clade = three_taxon_tree();

    let result = base.graft_clade(c, &clade, time, "donor");
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_graft_clade_too_tall_fails() {
    let mut base = five_taxon_tree();
    let c = base.leaf_by_id("C").unwrap().index();
    let clade = three_taxon_tree();

    // Donor height 2 does not fit below time 1.5
    let result = base.graft_clade(c, &clade, 1.5, "donor");
    assert!(result.is_err());
}

#[test]
fn test_graft_clade_at_root_fails() {
    let mut base = five_taxon_tree();
    let root = base.root_index();
    let clade = three_taxon_tree();
    assert!(base.graft_clade(root, &clade, 5.0, "donor").is_err());
}

// ============= Metadata and Taxa Tests =============

#[test]
fn test_metadata() {
    let mut tree = three_taxon_tree();
    tree.node_mut(0).set_metadata("rate", 0.5);
    tree.node_mut(0).set_metadata("group", "tumour");

    let a = &tree[0];
    assert_eq!(a.get_metadata("rate"), Some(&MetaValue::Float(0.5)));
    assert_eq!(a.get_metadata("group").unwrap().to_string(), "tumour");
    assert_eq!(a.metadata().len(), 2);
}

#[test]
fn test_meta_value_parse() {
    assert_eq!(MetaValue::parse("3"), MetaValue::Int(3));
    assert_eq!(MetaValue::parse("0.25"), MetaValue::Float(0.25));
    assert_eq!(MetaValue::parse("kea"), MetaValue::Text("kea".to_string()));
}

#[test]
fn test_taxa_names() {
    let tree = five_taxon_tree();
    assert_eq!(tree.taxa_names(), vec!["A", "B", "C", "D", "E"]);

    let bound = TimeTree::with_taxa(Taxa::from_names(["Kea", "Kaka"]));
    assert_eq!(bound.taxa().unwrap().len(), 2);
    assert_eq!(bound.taxa_names(), vec!["Kea", "Kaka"]);
}

#[test]
fn test_different_taxa_names() {
    let all = ["1", "2", "3", "4"];
    let given = ["2", "4"];
    assert_eq!(different_taxa_names(&all, &given), vec!["1", "3"]);
}

#[test]
fn test_display() {
    let tree = three_taxon_tree();
    let text = tree.to_string();
    assert!(text.starts_with("Time tree with 3 leaves (5 nodes total):"));
    assert!(text.contains("Leaf \"C\""));
}

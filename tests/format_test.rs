//! File-level tests for reading and writing tree formats and reports

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use phylotrunk::errors::TreeError;
use phylotrunk::evolution::TraitEvolutionAnalyzer;
use phylotrunk::metadata::{apply_trait_map, load_trait_map};
use phylotrunk::newick::parse_newick;
use phylotrunk::report;
use phylotrunk::trunk::TrunkScorer;
use phylotrunk::util::testing;
use phylotrunk::writer::write_tree_file;
use phylotrunk::{load_tree, score_and_extract, TreeFormat};

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn given_newick_file_when_loading_then_tree_is_validated() {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_file(&temp, "input.nwk", "((a:1,b:1):1,c:2);\n");

    let tree = load_tree(&path, TreeFormat::Newick).unwrap();
    assert_eq!(tree.num_leaves(), 3);
}

#[test]
fn given_nexus_file_when_loading_then_translate_table_is_applied() {
    let temp = TempDir::new().unwrap();
    let path = write_file(
        &temp,
        "input.tree",
        "#NEXUS\n\
         BEGIN TAXA;\n\tDIMENSIONS NTAX=3;\n\tTAXLABELS ciao hello salut;\nEND;\n\
         BEGIN TREES;\n\
         \tTRANSLATE\n\t\t1 ciao,\n\t\t2 hello,\n\t\t3 salut;\n\
         \tTREE kiwi = [&R] ((1[&location=NZ]:1.0,2[&location=NZ]:1.0):0.5,3[&location=AU]:1.5);\n\
         END;\n",
    );

    let tree = load_tree(&path, TreeFormat::Nexus).unwrap();
    assert_eq!(tree.name(), Some("kiwi"));
    let mut labels: Vec<String> = tree.leaves().map(|l| tree.display_name(l)).collect();
    labels.sort();
    assert_eq!(labels, vec!["ciao", "hello", "salut"]);

    let first = tree.leaves().next().unwrap();
    assert_eq!(tree.annotation(first, "location"), Some("NZ"));
}

#[test]
fn given_missing_file_when_loading_then_reports_io_error() {
    let err = load_tree(&PathBuf::from("/nonexistent/tree.nwk"), TreeFormat::Newick).unwrap_err();
    assert!(matches!(err, TreeError::Io(_)));
}

#[test]
fn given_scored_tree_when_writing_and_reloading_then_scores_survive() {
    let temp = TempDir::new().unwrap();
    let mut tree = parse_newick("((a:1,b:1):1,c:2);").unwrap();
    TrunkScorer::new().score(&mut tree);

    let out = temp.path().join("annotated.tree");
    write_tree_file(&out, &tree, TreeFormat::Nexus).unwrap();

    let reloaded = load_tree(&out, TreeFormat::Nexus).unwrap();
    let inner = reloaded
        .leaves()
        .find(|&l| reloaded.display_name(l) == "a")
        .and_then(|a| reloaded.parent(a))
        .unwrap();
    assert_eq!(reloaded.annotation(inner, "trunk"), Some("2"));
}

#[test]
fn given_trait_file_when_applying_then_leaves_carry_values() {
    let temp = TempDir::new().unwrap();
    let traits = write_file(&temp, "traits.tsv", "# taxon\tlocation\na\tEurope\nb\tEurope\nc\tAsia\n");

    let mut tree = parse_newick("((a:1,b:1):1,c:2);").unwrap();
    let values = load_trait_map(&traits).unwrap();
    let applied = apply_trait_map(&mut tree, "location", &values);
    assert_eq!(applied, 3);

    let trunk = score_and_extract(&mut tree);
    let evolution = TraitEvolutionAnalyzer::new(&tree)
        .analyze(&trunk, "location")
        .unwrap();
    assert_eq!(evolution.switches, 0);
    assert_eq!(evolution.runs[0].value, "Europe");
}

#[test]
fn given_analysis_results_when_writing_reports_then_csv_rows_match_trunk() {
    let temp = TempDir::new().unwrap();
    let mut tree = parse_newick(
        "((((d[&location=y]:4)c[&location=y]:3)b[&location=x]:2)a[&location=x]:1);",
    )
    .unwrap();
    let trunk = score_and_extract(&mut tree);
    let evolution = TraitEvolutionAnalyzer::new(&tree)
        .analyze(&trunk, "location")
        .unwrap();

    let switches_csv = temp.path().join("run_switches.csv");
    let summary_csv = temp.path().join("run_summary.csv");
    report::write_switches_csv(&switches_csv, &tree, &trunk, "location").unwrap();
    report::write_summary_csv(&summary_csv, &evolution).unwrap();

    let switches = fs::read_to_string(&switches_csv).unwrap();
    let lines: Vec<&str> = switches.lines().collect();
    assert_eq!(lines[0], "FROM-ID,TO-ID,DURATION,VFROM,VTO,C");
    // one row per trunk edge, exactly one counted switch
    assert_eq!(lines.len(), 1 + trunk.nodes().len() - 1);
    let counted: u32 = lines[1..]
        .iter()
        .map(|l| l.rsplit(',').next().unwrap().parse::<u32>().unwrap())
        .sum();
    assert_eq!(counted, 1);

    let summary = fs::read_to_string(&summary_csv).unwrap();
    let rows: Vec<&str> = summary.lines().collect();
    assert_eq!(rows[0], "VALUE,DURATION");
    assert_eq!(rows.len(), 1 + evolution.runs.len());
    assert!(rows[1].starts_with("x,"));
    assert!(rows[2].starts_with("y,"));
}

#[test]
fn given_extraction_on_unscored_reload_then_same_trunk_leaf() {
    // scores embedded as annotations do not influence a fresh extraction;
    // the counters are recomputed from the topology alone
    let temp = TempDir::new().unwrap();
    let mut tree = parse_newick("((a:1,(b:1,c:1):1):1,d:1);").unwrap();
    let trunk = score_and_extract(&mut tree);
    let out = temp.path().join("annotated.tree");
    write_tree_file(&out, &tree, TreeFormat::Nexus).unwrap();

    let mut reloaded = load_tree(&out, TreeFormat::Nexus).unwrap();
    let trunk_again = score_and_extract(&mut reloaded);
    assert_eq!(
        tree.display_name(trunk.leaf().unwrap()),
        reloaded.display_name(trunk_again.leaf().unwrap())
    );
}

//! End-to-end pipeline scenarios over synthetic working trees.

use codeatlas::core::AnalysisReport;
use codeatlas::errors::AnalysisError;
use codeatlas::{analyze_workspace, AnalysisRequest, CancelFlag};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn analyze_tree(root: &Path) -> Result<AnalysisReport, AnalysisError> {
    let request = AnalysisRequest::new("https://example.com/repo.git");
    analyze_workspace(root, &request, None, &CancelFlag::new())
}

fn file_edges(report: &AnalysisReport) -> Vec<(String, String)> {
    report
        .graphs
        .file
        .edges
        .iter()
        .map(|e| (e.from.clone(), e.to.clone()))
        .collect()
}

fn namespace_edges(report: &AnalysisReport) -> Vec<(String, String)> {
    report
        .graphs
        .namespace
        .edges
        .iter()
        .map(|e| (e.from.clone(), e.to.clone()))
        .collect()
}

fn node<'a>(report: &'a AnalysisReport, id: &str) -> &'a codeatlas::core::GraphNode {
    report
        .graphs
        .file
        .nodes
        .iter()
        .chain(report.graphs.namespace.nodes.iter())
        .find(|n| n.id == id)
        .unwrap_or_else(|| panic!("node {id} missing"))
}

/// Two files, one dependency, no cycles.
#[test]
fn test_tiny_acyclic_project() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(
        dir.path(),
        "src/A.cs",
        "namespace X\n{\n    class A\n    {\n        B b;\n    }\n}\n",
    );
    write(
        dir.path(),
        "src/B.cs",
        "namespace Y\n{\n    class B\n    {\n    }\n}\n",
    );

    let report = analyze_tree(dir.path()).unwrap();

    assert_eq!(
        file_edges(&report),
        vec![("File:src/A.cs".to_string(), "File:src/B.cs".to_string())]
    );
    assert_eq!(
        namespace_edges(&report),
        vec![("Namespace:X".to_string(), "Namespace:Y".to_string())]
    );
    assert!(report.cycles.is_empty());
    assert_eq!(node(&report, "File:src/B.cs").fan_in, 1);
    assert_eq!(node(&report, "File:src/A.cs").fan_out, 1);
    assert_eq!(node(&report, "File:src/B.cs").fan_out, 0);
}

/// Mutual dependency across two files and two namespaces.
#[test]
fn test_two_node_cycle() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/A.cs", "namespace X { class A { B b; } }");
    write(dir.path(), "src/B.cs", "namespace Y { class B { A a; } }");

    let report = analyze_tree(dir.path()).unwrap();

    let edges = file_edges(&report);
    assert!(edges.contains(&("File:src/A.cs".into(), "File:src/B.cs".into())));
    assert!(edges.contains(&("File:src/B.cs".into(), "File:src/A.cs".into())));

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].id, 1);
    assert_eq!(report.cycles[0].size, 2);
    assert_eq!(
        report.cycles[0].sample,
        vec!["File:src/A.cs".to_string(), "File:src/B.cs".to_string()]
    );

    let ns = namespace_edges(&report);
    assert!(ns.contains(&("Namespace:X".into(), "Namespace:Y".into())));
    assert!(ns.contains(&("Namespace:Y".into(), "Namespace:X".into())));
}

/// A three-node ring plus a satellite pointing into it.
#[test]
fn test_three_node_cycle_with_satellite() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/A.cs", "namespace NA { class A { B b; } }");
    write(dir.path(), "src/B.cs", "namespace NB { class B { C c; } }");
    write(dir.path(), "src/C.cs", "namespace NC { class C { A a; } }");
    write(dir.path(), "src/D.cs", "namespace ND { class D { A a; } }");

    let report = analyze_tree(dir.path()).unwrap();

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].id, 1);
    assert_eq!(report.cycles[0].size, 3);
    assert!(!report.cycles[0]
        .sample
        .contains(&"File:src/D.cs".to_string()));
    assert_eq!(node(&report, "File:src/A.cs").fan_in, 2);
}

/// A partial type declared in two files: referencing it links only the
/// first declaring file in enumeration order.
#[test]
fn test_partial_class_links_first_declaring_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/P1.cs", "namespace X { partial class T {} }");
    write(dir.path(), "src/P2.cs", "namespace X { partial class T {} }");
    write(dir.path(), "src/Q.cs", "namespace X { class Q { T t; } }");

    let report = analyze_tree(dir.path()).unwrap();
    let edges = file_edges(&report);
    assert!(edges.contains(&("File:src/Q.cs".into(), "File:src/P1.cs".into())));
    assert!(!edges.contains(&("File:src/Q.cs".into(), "File:src/P2.cs".into())));
}

/// File-scoped namespaces beat later block namespaces.
#[test]
fn test_file_scoped_namespace_is_primary() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(
        dir.path(),
        "src/a.cs",
        "namespace A.B;\nclass C { D d; }\nnamespace Legacy { class L {} }\n",
    );
    write(dir.path(), "src/d.cs", "namespace Other;\nclass D {}\n");

    let report = analyze_tree(dir.path()).unwrap();
    assert!(report
        .graphs
        .namespace
        .nodes
        .iter()
        .any(|n| n.id == "Namespace:A.B" && n.label == "B"));
    assert!(namespace_edges(&report)
        .contains(&("Namespace:A.B".into(), "Namespace:Other".into())));
}

/// Generated files are not documents; references into them emit nothing.
#[test]
fn test_generated_file_exclusion() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "obj/Gen.g.cs", "namespace X { class G {} }");
    write(dir.path(), "src/U.cs", "namespace X { class U { G g; } }");

    let report = analyze_tree(dir.path()).unwrap();
    assert!(report.graphs.file.edges.is_empty());
    assert!(report
        .graphs
        .file
        .nodes
        .iter()
        .all(|n| n.id != "File:obj/Gen.g.cs"));
}

/// A repository with no analyzable manifest reports language evidence.
#[test]
fn test_language_evidence_on_foreign_repo() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "package.json", "{\"name\": \"web\"}");
    write(dir.path(), "src/index.ts", "export const x = 1;");

    let err = analyze_tree(dir.path()).unwrap_err();
    match err {
        AnalysisError::NoSolutionOrProject {
            detected_languages,
            found_files,
        } => {
            assert!(detected_languages.contains(&"JavaScript/TypeScript".to_string()));
            assert!(!found_files.is_empty());
        }
        other => panic!("expected NoSolutionOrProject, got {other:?}"),
    }
}

/// Self-edges come only from use sites, never from the declaration line.
#[test]
fn test_self_edge_discipline() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(
        dir.path(),
        "src/C.cs",
        "namespace X { class C { static void Foo() {} void M() { C.Foo(); } } }",
    );
    write(dir.path(), "src/Plain.cs", "namespace X { class Plain {} }");

    let report = analyze_tree(dir.path()).unwrap();
    let edges = file_edges(&report);
    assert!(edges.contains(&("File:src/C.cs".into(), "File:src/C.cs".into())));
    assert!(!edges.contains(&("File:src/Plain.cs".into(), "File:src/Plain.cs".into())));
    // A lone self-loop is a trivial SCC and is not reported as a cycle.
    assert!(report.cycles.is_empty());
}

/// Comment-only and blank files yield zero LOC and contribute no edges.
#[test]
fn test_comment_only_file_has_no_loc_and_no_edges() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(
        dir.path(),
        "src/Empty.cs",
        "// only a comment\n\n/* block\n   comment */\n",
    );

    let report = analyze_tree(dir.path()).unwrap();
    assert!(report.graphs.file.edges.is_empty());
    assert!(report.graphs.file.nodes.is_empty());
    assert_eq!(report.metrics.counts.edges, 0);
}

/// Re-running over the same tree produces an identical report modulo the
/// generation timestamp.
#[test]
fn test_determinism_over_same_tree() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/A.cs", "namespace X { class A { B b; } }");
    write(dir.path(), "src/B.cs", "namespace Y { class B { A a; } }");
    write(dir.path(), "src/C.cs", "namespace Z { class C { A a; B b; } }");

    let first = analyze_tree(dir.path()).unwrap();
    let second = analyze_tree(dir.path()).unwrap();

    let mut first = serde_json::to_value(&first).unwrap();
    let mut second = serde_json::to_value(&second).unwrap();
    first["meta"]["generatedAt"] = serde_json::Value::Null;
    second["meta"]["generatedAt"] = serde_json::Value::Null;
    assert_eq!(first, second);
}

/// Every edge endpoint appears as a node, and fan counts agree with the
/// edge sets.
#[test]
fn test_graph_invariants() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/A.cs", "namespace X { class A { B b; C c; } }");
    write(dir.path(), "src/B.cs", "namespace X { class B { C c; } }");
    write(dir.path(), "src/C.cs", "namespace Y { class C {} }");

    let report = analyze_tree(dir.path()).unwrap();

    for graph in [&report.graphs.file, &report.graphs.namespace] {
        // Edge sets are deduplicated.
        let mut seen = std::collections::HashSet::new();
        for edge in &graph.edges {
            assert!(seen.insert((edge.from.clone(), edge.to.clone())));
            assert!(graph.nodes.iter().any(|n| n.id == edge.from));
            assert!(graph.nodes.iter().any(|n| n.id == edge.to));
        }
        // Fan metrics agree with the edge list.
        for node in &graph.nodes {
            let fan_in = graph.edges.iter().filter(|e| e.to == node.id).count();
            let fan_out = graph.edges.iter().filter(|e| e.from == node.id).count();
            assert_eq!(node.fan_in, fan_in, "fan_in of {}", node.id);
            assert_eq!(node.fan_out, fan_out, "fan_out of {}", node.id);
        }
        // Node lists are sorted by identifier.
        let ids: Vec<&String> = graph.nodes.iter().map(|n| &n.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    // Namespace lifting: every file edge has a lifted counterpart.
    let ns_of = |id: &str| -> String {
        let rel = id.strip_prefix("File:").unwrap();
        let doc_ns = match rel {
            "src/A.cs" | "src/B.cs" => "X",
            "src/C.cs" => "Y",
            other => panic!("unexpected file {other}"),
        };
        format!("Namespace:{doc_ns}")
    };
    let ns_edges = namespace_edges(&report);
    for (from, to) in file_edges(&report) {
        assert!(ns_edges.contains(&(ns_of(&from), ns_of(&to))));
    }
}

/// Counts block totals both graphs.
#[test]
fn test_counts_block() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/A.cs", "namespace X { class A { B b; } }");
    write(dir.path(), "src/B.cs", "namespace Y { class B {} }");

    let report = analyze_tree(dir.path()).unwrap();
    assert_eq!(report.metrics.counts.file_nodes, 2);
    assert_eq!(report.metrics.counts.namespace_nodes, 2);
    assert_eq!(
        report.metrics.counts.edges,
        report.graphs.file.edges.len() + report.graphs.namespace.edges.len()
    );
}

/// Report JSON uses the documented camelCase field names.
#[test]
fn test_report_wire_shape() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "App.csproj", "<Project/>");
    write(dir.path(), "src/A.cs", "namespace X { class A { B b; } }");
    write(dir.path(), "src/B.cs", "namespace Y { class B {} }");

    let report = analyze_tree(dir.path()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["meta"]["repo"].is_string());
    assert!(json["meta"]["generatedAt"].is_string());
    assert!(json["graphs"]["namespace"]["nodes"].is_array());
    assert!(json["graphs"]["file"]["edges"].is_array());
    assert!(json["metrics"]["counts"]["namespaceNodes"].is_number());
    assert!(json["metrics"]["fanInTop"].is_array());
    assert!(json["metrics"]["fanOutTop"].is_array());
    assert!(json["cycles"].is_array());

    let first_node = &json["graphs"]["file"]["nodes"][0];
    assert!(first_node["id"].is_string());
    assert!(first_node["label"].is_string());
    assert!(first_node["loc"].is_number());
    assert!(first_node["fanIn"].is_number());
    assert!(first_node["fanOut"].is_number());
}

/// Solution selection drives loading when a `.sln` is present.
#[test]
fn test_solution_scoped_loading() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "sub/Sub.sln", "");
    write(dir.path(), "sub/App/App.csproj", "<Project/>");
    write(dir.path(), "sub/App/A.cs", "namespace X { class A { B b; } }");
    write(dir.path(), "sub/App/B.cs", "namespace X { class B {} }");
    // Outside the solution subtree: never loaded.
    write(dir.path(), "elsewhere/Other.csproj", "<Project/>");
    write(dir.path(), "elsewhere/O.cs", "namespace O { class O {} }");

    let report = analyze_tree(dir.path()).unwrap();
    assert!(report
        .graphs
        .file
        .nodes
        .iter()
        .all(|n| n.id.starts_with("File:sub/")));
}

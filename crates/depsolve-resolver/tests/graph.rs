use depsolve_core::{ProjectIdentifier, Requirement, ResolvedDependency, SelectedVersion, SemanticVersion};
use depsolve_resolver::ResolvedDependencyGraph;
use depsolve_util::errors::DepsolveError;

type Graph = ResolvedDependencyGraph<String, String>;

fn p(name: &str) -> ProjectIdentifier<String> {
    ProjectIdentifier::new(name.to_string())
}

fn v(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
}

fn node(name: &str, version: &str) -> ResolvedDependency<String, String> {
    ResolvedDependency::new(p(name), SelectedVersion::new(v(version), format!("{name}-{version}")))
}

/// app -> web -> http -> bytes
///     \-> cli ------^
fn sample() -> Graph {
    let mut g = Graph::new();
    g.add_root(node("app", "1.0.0"), Requirement::Any).unwrap();
    g.add_edge(&p("app"), node("web", "2.1.0"), Requirement::AtLeast(v("2.0.0"))).unwrap();
    g.add_edge(&p("app"), node("cli", "0.4.0"), Requirement::Any).unwrap();
    g.add_edge(&p("web"), node("http", "1.2.0"), Requirement::Any).unwrap();
    g.add_edge(&p("cli"), node("http", "1.2.0"), Requirement::AtLeast(v("1.1.0"))).unwrap();
    g.add_edge(&p("http"), node("bytes", "1.5.0"), Requirement::Any).unwrap();
    g
}

#[test]
fn test_empty_graph() {
    let g = Graph::new();
    assert!(g.is_empty());
    assert_eq!(g.len(), 0);
    assert_eq!(g.depth(), 0);
    assert_eq!(g.count_at_depth(0), 0);
    assert!(g.roots().is_empty());
    assert_eq!(g.to_string(), "Nodes:");
}

#[test]
fn test_one_version_per_project() {
    let g = sample();
    assert_eq!(g.len(), 5);
    let projects: Vec<String> = g
        .resolved_dependencies()
        .iter()
        .map(|d| d.project.to_string())
        .collect();
    assert_eq!(projects, vec!["app", "bytes", "cli", "http", "web"]);
    assert_eq!(g.version_of(&p("http")).unwrap().semantic_version(), Some(&v("1.2.0")));
}

#[test]
fn test_aggregate_requirement_tracks_all_edges() {
    let g = sample();
    assert_eq!(g.requirement_of(&p("http")), Some(Requirement::AtLeast(v("1.1.0"))));
    assert_eq!(g.requirement_of(&p("missing")), None);
    assert_eq!(g.dependencies_of(&p("app")), vec![p("cli"), p("web")]);
    assert!(g.dependencies_of(&p("missing")).is_empty());
}

#[test]
fn test_contradictory_edge_leaves_graph_unchanged() {
    let mut g = sample();
    let before = g.to_string();

    let err = g
        .add_edge(&p("web"), node("bytes", "1.5.0"), Requirement::Exactly(v("1.4.0")))
        .unwrap_err();
    assert!(err.is_conflict(), "got: {err}");
    assert_eq!(g.to_string(), before);
    assert_eq!(g.requirement_of(&p("bytes")), Some(Requirement::Any));
    assert!(g.dependencies_of(&p("web")) == vec![p("http")]);
}

#[test]
fn test_different_version_is_conflict() {
    let mut g = sample();
    let err = g.add_node(node("http", "1.3.0"), Requirement::Any).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Version conflict for http: already selected 1.2.0 (http-1.2.0), cannot also select 1.3.0 (http-1.3.0)"
    );
    assert_eq!(g.version_of(&p("http")).unwrap().semantic_version(), Some(&v("1.2.0")));
}

#[test]
fn test_new_node_must_satisfy_requirement() {
    let mut g = Graph::new();
    let err = g
        .add_root(node("app", "1.0.0"), Requirement::AtLeast(v("2.0.0")))
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(g.is_empty());
}

#[test]
fn test_edge_from_unknown_dependent() {
    let mut g = sample();
    let err = g
        .add_edge(&p("ghost"), node("bytes", "1.5.0"), Requirement::Any)
        .unwrap_err();
    assert!(matches!(err, DepsolveError::UnknownProject { ref project } if project == "ghost"));
    assert_eq!(g.len(), 5);
}

#[test]
fn test_depth_and_counts() {
    let g = sample();
    assert_eq!(g.depth(), 4);
    assert_eq!(g.count_at_depth(0), 1);
    assert_eq!(g.count_at_depth(1), 2);
    assert_eq!(g.count_at_depth(2), 1);
    assert_eq!(g.count_at_depth(3), 1);
    assert_eq!(g.count_at_depth(4), 0);
}

#[test]
fn test_depth_of_long_chain() {
    const LEN: usize = 20_000;
    let mut g = Graph::new();
    g.add_root(node("n0", "1.0.0"), Requirement::Any).unwrap();
    for i in 1..LEN {
        let name = format!("n{i}");
        g.add_edge(&p(&format!("n{}", i - 1)), node(&name, "1.0.0"), Requirement::Any)
            .unwrap();
    }
    assert_eq!(g.depth(), LEN);
    assert_eq!(g.count_at_depth(LEN - 1), 1);
}

#[test]
fn test_roots_default_to_nodes_without_dependents() {
    let mut g = Graph::new();
    g.add_node(node("a", "1.0.0"), Requirement::Any).unwrap();
    g.add_edge(&p("a"), node("b", "1.0.0"), Requirement::Any).unwrap();
    g.add_node(node("c", "1.0.0"), Requirement::Any).unwrap();

    let roots: Vec<String> = g.roots().iter().map(|d| d.project.to_string()).collect();
    assert_eq!(roots, vec!["a", "c"]);
    assert_eq!(g.depth(), 2);
    assert_eq!(g.count_at_depth(0), 2);
}

#[test]
fn test_graph_with_new_roots() {
    let g = sample();
    let web = g.graph_with_new_roots(&[p("web")]).unwrap();

    let projects: Vec<String> = web
        .resolved_dependencies()
        .iter()
        .map(|d| d.project.to_string())
        .collect();
    assert_eq!(projects, vec!["bytes", "http", "web"]);
    assert_eq!(web.roots(), vec![node("web", "2.1.0")]);
    assert_eq!(web.depth(), 3);
    assert_eq!(web.dependencies_of(&p("http")), vec![p("bytes")]);
    assert_eq!(web.requirement_of(&p("web")), g.requirement_of(&p("web")));

    // The source graph is untouched.
    assert_eq!(g.len(), 5);
}

#[test]
fn test_graph_with_unknown_root() {
    let g = sample();
    let err = g.graph_with_new_roots(&[p("web"), p("nope")]).unwrap_err();
    assert!(matches!(err, DepsolveError::UnknownProject { .. }));
}

#[test]
fn test_display_lists_edges() {
    let mut g = Graph::new();
    g.add_root(node("a", "1.0.0"), Requirement::Any).unwrap();
    g.add_edge(&p("a"), node("b", "2.0.0"), Requirement::Any).unwrap();
    assert_eq!(
        g.to_string(),
        "Nodes:\n  a @ 1.0.0 (a-1.0.0) ->\n    b @ 2.0.0 (b-2.0.0)\n  b @ 2.0.0 (b-2.0.0) ->"
    );
}

#[test]
fn test_graph_is_shareable_across_threads() {
    let g = std::sync::Arc::new(sample());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let g = std::sync::Arc::clone(&g);
            std::thread::spawn(move || g.depth())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 4);
    }
}

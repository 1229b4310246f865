use depsolve_core::dependency::{Dependency, DependencyList, ResolvedDependency};
use depsolve_core::project::ProjectIdentifier;
use depsolve_core::requirement::Requirement;
use depsolve_core::selected::SelectedVersion;
use depsolve_core::version::SemanticVersion;

fn v(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
}

#[test]
fn test_dependency_list_preserves_order() {
    let list: DependencyList<String, String> = vec![
        Dependency::new("zlib".to_string(), Requirement::AtLeast(v("1.2.0"))),
        Dependency::new("alpha".to_string(), Requirement::Any),
    ]
    .into_iter()
    .collect();

    let names: Vec<&str> = list.iter().map(|d| d.project.value().as_str()).collect();
    assert_eq!(names, vec!["zlib", "alpha"]);
    assert_eq!(list.len(), 2);
    assert!(!list.is_empty());
}

#[test]
fn test_dependency_list_requirement_for() {
    let mut list = DependencyList::<String, String>::default();
    assert!(list.is_empty());
    list.push(Dependency::new("a".to_string(), Requirement::Exactly(v("1.0.0"))));

    let a = ProjectIdentifier::new("a".to_string());
    let b = ProjectIdentifier::new("b".to_string());
    assert_eq!(list.requirement_for(&a), Some(&Requirement::Exactly(v("1.0.0"))));
    assert_eq!(list.requirement_for(&b), None);
}

#[test]
fn test_dependency_display() {
    let dep: Dependency<String, String> =
        Dependency::new("serde".to_string(), Requirement::AtLeast(v("1.0.100")));
    assert_eq!(dep.to_string(), "serde >=1.0.100");

    let list = DependencyList::new(vec![dep]);
    assert_eq!(list.to_string(), "Dependency list:\nserde >=1.0.100");
}

#[test]
fn test_resolved_dependency_display_and_identity() {
    let resolved = ResolvedDependency::new(
        ProjectIdentifier::new("A".to_string()),
        SelectedVersion::new(v("1.0.0"), "v1.0.0".to_string()),
    );
    assert_eq!(resolved.to_string(), "A @ 1.0.0 (v1.0.0)");

    let same_version_other_tag = ResolvedDependency::new(
        ProjectIdentifier::new("A".to_string()),
        SelectedVersion::new(v("1.0.0"), "release-1".to_string()),
    );
    assert_eq!(resolved, same_version_other_tag);
}

use depsolve_core::requirement::{Requirement, Strictness};
use depsolve_core::selected::SelectedVersion;
use depsolve_core::version::SemanticVersion;

type Req = Requirement<String>;

fn v(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
}

fn sel(s: &str) -> SelectedVersion<String> {
    SelectedVersion::new(v(s), s.to_string())
}

#[test]
fn test_any_accepts_arbitrary_versions() {
    for s in ["0.0.0", "0.0.1-a", "7.8.9+meta", "99.0.0-rc.1"] {
        assert!(Req::Any.satisfied_by(&sel(s)));
    }
}

#[test]
fn test_exactly_equals_semantic_equality() {
    let candidates = ["1.0.0", "1.0.0+b", "1.0.0-rc.1", "1.0.1"];
    for a in candidates {
        for b in candidates {
            assert_eq!(Req::Exactly(v(a)).satisfied_by(&sel(b)), v(a) == v(b), "{a} vs {b}");
        }
    }
}

#[test]
fn test_at_least_monotonic() {
    let req = Req::AtLeast(v("1.0.0"));
    assert!(req.satisfied_by(&sel("1.0.0")));
    assert!(req.satisfied_by(&sel("1.5.0")));
    assert!(req.satisfied_by(&sel("9.0.0")));
    assert!(!req.satisfied_by(&sel("0.99.99")));
}

#[test]
fn test_compatible_with_boundaries() {
    let req = Req::CompatibleWith(v("1.2.0"), Strictness::Strict);
    assert!(req.satisfied_by(&sel("1.9.9")));
    assert!(!req.satisfied_by(&sel("2.0.0")));
    assert!(!req.satisfied_by(&sel("1.1.9")));

    let zero = Req::CompatibleWith(v("0.2.0"), Strictness::Strict);
    assert!(zero.satisfied_by(&sel("0.2.5")));
    assert!(!zero.satisfied_by(&sel("0.3.0")));
}

#[test]
fn test_compound_requires_all() {
    let req = Req::Compound(vec![Req::AtLeast(v("1.0.0")), Req::CompatibleWith(v("1.0.0"), Strictness::Strict)]);
    assert!(req.satisfied_by(&sel("1.4.0")));
    assert!(!req.satisfied_by(&sel("2.0.0")));
}

#[test]
fn test_intersection_matches_conjunction() {
    let requirements = [
        Req::Any,
        Req::AtLeast(v("0.2.0")),
        Req::AtLeast(v("1.1.0")),
        Req::CompatibleWith(v("0.2.1"), Strictness::Strict),
        Req::CompatibleWith(v("1.0.0"), Strictness::Strict),
        Req::CompatibleWith(v("1.2.0"), Strictness::AllowVersionZeroPatches),
        Req::Exactly(v("1.2.3")),
        Req::Exactly(v("0.2.4")),
    ];
    let probes = ["0.1.0", "0.2.0", "0.2.1", "0.2.4", "0.3.0", "1.0.0", "1.1.0", "1.2.3", "1.9.0", "2.0.0"];

    for a in &requirements {
        for b in &requirements {
            let both = a.intersect(b);
            for probe in probes {
                let version = sel(probe);
                let expected = a.satisfied_by(&version) && b.satisfied_by(&version);
                let actual = both.as_ref().is_some_and(|r| r.satisfied_by(&version));
                assert_eq!(actual, expected, "({a}) ∩ ({b}) at {probe}");
            }
        }
    }
}

#[test]
fn test_prioritized_delegates_satisfaction() {
    let req = Req::prioritized(Req::Exactly(v("1.0.0")), 3);
    assert!(req.satisfied_by(&sel("1.0.0")));
    assert!(!req.satisfied_by(&sel("1.0.1")));
    assert_eq!(req.priority(), 3);
    assert_eq!(req.base(), &Req::Exactly(v("1.0.0")));
}

#[test]
fn test_parse_and_display_agree() {
    for (input, rendered) in [
        ("*", "(any version)"),
        (">= 1.0.0", ">=1.0.0"),
        ("~> 2.1.0", "~>2.1.0"),
        ("== 0.0.1", "==0.0.1"),
        ("3.0.0-beta", "==3.0.0-beta"),
    ] {
        let req = Req::parse(input, Strictness::Strict).unwrap();
        assert_eq!(req.to_string(), rendered);
        if input != "*" {
            assert_eq!(Req::parse(rendered, Strictness::Strict).unwrap(), req);
        }
    }
}

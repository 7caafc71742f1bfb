use crate::config::ConfigError;
use crate::ndn::Name;

#[test]
fn parse_and_display_round_trip() {
    let n = Name::parse("/prefix/a/7").expect("name");
    assert_eq!(n.len(), 3);
    assert_eq!(n.components(), &["prefix", "a", "7"]);
    assert_eq!(n.to_string(), "/prefix/a/7");
    assert_eq!(n.seq(), Some(7));

    let root = Name::parse("/").expect("root");
    assert!(root.is_empty());
    assert_eq!(root, Name::root());
    assert_eq!(root.to_string(), "/");

    // 末尾的 '/' 被忽略
    assert_eq!(Name::parse("/prefix/").expect("name"), Name::parse("/prefix").expect("name"));
}

#[test]
fn malformed_names_are_rejected() {
    for bad in ["", "prefix", "//a", "/a//b"] {
        assert!(
            matches!(Name::parse(bad), Err(ConfigError::InvalidName { .. })),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn prefix_relations() {
    let p = Name::parse("/prefix").expect("name");
    let n = p.with_seq(42);
    assert_eq!(n.to_string(), "/prefix/42");
    assert!(p.is_prefix_of(&n));
    assert!(Name::root().is_prefix_of(&n));
    assert!(!n.is_prefix_of(&p));
    assert!(!Name::parse("/pre").expect("name").is_prefix_of(&n));
    assert_eq!(n.prefix(1), p);
    assert_eq!(n.prefix(10), n);
    assert_eq!(p.seq(), None);
}

#[test]
fn names_serialize_as_strings() {
    let n = Name::parse("/prefix/3").expect("name");
    let json = serde_json::to_string(&n).expect("serialize");
    assert_eq!(json, "\"/prefix/3\"");
    let back: Name = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, n);
    assert!(serde_json::from_str::<Name>("\"no-slash\"").is_err());
}

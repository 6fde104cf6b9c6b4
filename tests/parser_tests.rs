// tests/parser_tests.rs

mod common;

use std::sync::Arc;

use cstml::languages::number;
use cstml::{
    parse, parse_template, parse_with_config, print_pretty, read_tree, AttrValue, EngineConfig,
    ErrorKind, Interpolation, NodeFlags, Tag, Template,
};
use common::{element_types, list, parse_list, parse_list_template, tally};

// ---
// Plain text
// ---

#[test]
fn test_parse_nested_list() {
    let root = parse_list("List", "[a [b] 12]").unwrap();
    assert_eq!(root.node_type, "List");
    assert_eq!(element_types(&root, "items"), ["Word", "List", "Integer"]);

    let items = root.elements("items");
    let inner = items[1].unwrap();
    assert_eq!(element_types(inner, "items"), ["Word"]);
    let integer = items[2].unwrap();
    assert_eq!(integer.language, "Number");
    assert_eq!(element_types(integer, "digits"), ["Digit", "Digit"]);
}

#[test]
fn test_empty_list_declares_items() {
    let root = parse_list("List", "[]").unwrap();
    assert!(root.property("items").and_then(|p| p.as_array()).is_some_and(|a| a.is_empty()));
    assert!(matches!(root.content().next(), Some(Tag::Array(_))));
}

#[test]
fn test_str_tokens_are_intrinsic() {
    let root = parse_list("List", "[a]").unwrap();
    let open = root.get("open").unwrap();
    assert_eq!(open.flags, NodeFlags::INTRINSIC);
    let word = root.elements("items")[0].unwrap();
    assert!(word.flags.token);
    assert!(!word.flags.intrinsic);
    assert_eq!(word.text(), "a");
}

#[test]
fn test_trivia_stays_in_the_parent() {
    let root = parse_list("List", "[a  b]").unwrap();
    let trivia: Vec<&Tag> = root.content().filter(|t| matches!(t, Tag::Trivia(_))).collect();
    assert_eq!(trivia.len(), 1);
    assert!(matches!(trivia[0], Tag::Trivia(t) if t.text == "  "));
}

#[test]
fn test_fragment_shares_the_parent_frame() {
    let root = parse_list("Sentence", "<a b>").unwrap();
    assert_eq!(element_types(&root, "words"), ["Word", "Word"]);
    assert!(root.get("open").is_some());
    assert!(root.get("close").is_some());
}

#[test]
fn test_shifted_child_is_claimed() {
    let root = parse_list("Suffix", "ab!").unwrap();
    assert!(root.get("word").is_none());
    let bang = root
        .content()
        .find_map(|tag| match tag {
            Tag::Embedded(embedded) => Some(Arc::clone(&embedded.node)),
            _ => None,
        })
        .unwrap();
    assert_eq!(bang.node_type, "Bang");
    assert_eq!(bang.get("target").unwrap().text(), "ab");
    assert!(bang.get("bang").is_some());

    let plain = parse_list("Suffix", "ab").unwrap();
    assert_eq!(plain.get("word").unwrap().text(), "ab");
}

#[test]
fn test_guard_hides_its_own_terminator() {
    let root = parse_list("Guarded", ";").unwrap();
    assert_eq!(root.attributes.get("blocked"), Some(&AttrValue::Bool(true)));
    assert_eq!(root.attributes.get("inner"), Some(&AttrValue::String("Semi".into())));
    assert_eq!(root.attributes.get("after"), Some(&AttrValue::String("Bare".into())));
}

// ---
// Interpolation
// ---

#[test]
fn test_gaps_fill_array_slots() {
    let root = parse_list_template("List", Template::with_gaps("[a <//> c]")).unwrap();
    assert_eq!(element_types(&root, "items"), ["Word", "<//>", "Word"]);
    let array_gap = |tag: &Tag| match tag {
        Tag::Gap(gap) => gap.reference.as_ref().is_some_and(|r| r.is_array),
        _ => false,
    };
    assert!(root.content().any(array_gap));
}

#[test]
fn test_interpolated_value_is_flagged() {
    let word = parse_list("Word", "b").unwrap();
    let template = Template::new(["[a ", "]"], vec![Interpolation::from(word)]).unwrap();
    let root = parse_list_template("List", template).unwrap();
    let items = root.elements("items");
    assert!(!items[0].unwrap().flags.expression);
    assert!(items[1].unwrap().flags.expression);
    assert_eq!(items[1].unwrap().text(), "b");
}

#[test]
fn test_interpolation_through_foreign_cover() {
    let integer = parse(&number().unwrap(), "Number", "7").unwrap();
    let template = Template::new(["[", "]"], vec![integer.into()]).unwrap();
    let root = parse_list_template("List", template).unwrap();
    assert_eq!(element_types(&root, "items"), ["Integer"]);
}

#[test]
fn test_interpolation_mismatch() {
    let infinity = parse(&number().unwrap(), "Number", "Infinity").unwrap();
    let template = Template::new(["[", "]"], vec![infinity.into()]).unwrap();
    let err = parse_list_template("List", template).unwrap_err();
    match err.kind {
        ErrorKind::InterpolationMismatch { expected, found } => {
            assert_eq!(expected, "List:Item");
            assert_eq!(found, "Number:Infinity");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_fragment_interpolation_splices_content() {
    let phrase = parse_list("Phrase", "x y").unwrap();
    let template = Template::new(["<", ">"], vec![phrase.into()]).unwrap();
    let root = parse_list_template("Sentence", template).unwrap();
    assert_eq!(element_types(&root, "words"), ["Word", "Word"]);
    assert!(root.content().any(|tag| matches!(tag, Tag::Trivia(_))));
    assert!(root.elements("words").iter().all(|w| !w.unwrap().flags.expression));
}

#[test]
fn test_root_interpolation() {
    let word = parse_list("Word", "q").unwrap();
    let template = Template::new(["", ""], vec![Arc::clone(&word).into()]).unwrap();
    let root = parse_list_template("Word", template).unwrap();
    assert_eq!(root, word);

    let err = parse_list_template("Word", Template::with_gaps("<//>")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RootGap { .. }));
}

#[test]
fn test_fragment_interpolation_must_share_the_language() {
    let integer = parse(&number().unwrap(), "Integer", "7").unwrap();
    let template = Template::new(["<", ">"], vec![integer.into()]).unwrap();
    let err = parse_list_template("Sentence", template).unwrap_err();
    match err.kind {
        ErrorKind::InterpolationMismatch { expected, found } => {
            assert_eq!(expected, "List:Words");
            assert_eq!(found, "Number:Integer");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_open_cover_accepts_any_interpolation() {
    assert_eq!(parse_list("Any", "[a]").unwrap().node_type, "List");
    assert_eq!(parse_list("Any", "a").unwrap().node_type, "Word");

    let integer = parse(&number().unwrap(), "Integer", "7").unwrap();
    let template = Template::new(["", ""], vec![Arc::clone(&integer).into()]).unwrap();
    let root = parse_list_template("Any", template).unwrap();
    assert_eq!(root, integer);
}

// ---
// Aliased dependencies
// ---

#[test]
fn test_delegation_through_an_alias() {
    let root = parse(&tally().unwrap(), "Tally", "#12").unwrap();
    let amount = root.get("amount").unwrap();
    assert_eq!(amount.language, "Number");
    assert_eq!(amount.node_type, "Integer");
    assert_eq!(amount.elements("digits").len(), 2);

    let pretty = print_pretty(&root).unwrap();
    assert!(pretty.starts_with("<!0:cstml language='Tally'>\n<>\n  <Tally>\n"));
    assert!(pretty.contains("\n    mark: <*Punctuator '#' />\n"));
    assert!(pretty.contains("\n    amount: <Number:Integer>\n"));
    assert!(pretty.contains("\n      digits[]: <*Digit>\n"));
    assert_eq!(read_tree(&pretty).unwrap(), *root);

    let err = parse(&tally().unwrap(), "Number:Integer", "1").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnresolvedLanguage { .. }));
}

#[test]
fn test_interpolation_through_an_alias() {
    let language = tally().unwrap();
    let seven = parse(&number().unwrap(), "Integer", "7").unwrap();
    let template = Template::new(["#", ""], vec![seven.into()]).unwrap();
    let root = parse_template(&language, "Tally", template).unwrap();
    let amount = root.get("amount").unwrap();
    assert!(amount.flags.expression);
    assert_eq!(amount.text(), "7");

    let infinity = parse(&number().unwrap(), "Number", "Infinity").unwrap();
    let template = Template::new(["#", ""], vec![infinity.into()]).unwrap();
    let err = parse_template(&language, "Tally", template).unwrap_err();
    match err.kind {
        ErrorKind::InterpolationMismatch { expected, found } => {
            assert_eq!(expected, "Tally:Amount");
            assert_eq!(found, "Number:Infinity");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---
// Failures
// ---

#[test]
fn test_root_must_build_a_node() {
    let err = parse_list("Words", "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RootNotNode { .. }));
    assert!(parse_list("Item", "a").is_ok());
}

#[test]
fn test_unknown_production() {
    let err = parse_list("Nope", "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownProduction { .. }));
    let err = parse_list("Elsewhere:Word", "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnresolvedLanguage { .. }));
}

#[test]
fn test_trailing_input() {
    let err = parse_list("Word", "abc1").unwrap_err();
    match &err.kind {
        ErrorKind::TrailingInput { remaining } => assert_eq!(remaining, "1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.offset(), Some(3));
}

#[test]
fn test_unmatched_reports_offset() {
    let err = parse_list("List", "[a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Unmatched { .. }));
    assert_eq!(err.offset(), Some(2));
    assert_eq!(err.production(), Some("List:List"));
}

#[test]
fn test_unbalanced_template() {
    let err = Template::new(["[", "]"], Vec::new()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Imbalance { .. }));
}

#[test]
fn test_cover_rejects_unlisted_production() {
    let err = parse_list("Strict", "[a]").unwrap_err();
    match err.kind {
        ErrorKind::NotCovered { cover, production } => {
            assert_eq!(cover, "List:Strict");
            assert_eq!(production, "List:List");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(parse_list("Strict", "abc").is_ok());
}

#[test]
fn test_recursion_limit() {
    let config = EngineConfig::new().with_max_depth(16);
    let err = parse_with_config(&list().unwrap(), "Deep", Template::text(""), config).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RecursionLimit { limit: 16 }));
}

#[test]
fn test_chuck_gives_text_back() {
    let err = parse_list("Chucked", "abc").unwrap_err();
    match err.kind {
        ErrorKind::TrailingInput { remaining } => assert_eq!(remaining, "c"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_duplicate_singular_property() {
    let err = parse_list("Twice", "ab").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateProperty { ref name, .. } if name == "x"));
}

#[test]
fn test_duplicate_singular_production() {
    let err = parse_list("Doubled", "ab").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateProperty { ref name, .. } if name == "value"));
    assert_eq!(err.production(), Some("List:Doubled"));
}

#[test]
fn test_cover_root_builds_one_node() {
    let err = parse_list("Pair", "a[]").unwrap_err();
    match err.kind {
        ErrorKind::MultipleRoots { ref production } => assert_eq!(production, "List:Pair"),
        ref other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_held_child_errors() {
    let err = parse_list("Orphan", "ab").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NothingHeld));

    let err = parse_list("Unclaimed", "ab!").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnclaimedHeld { .. }));
}

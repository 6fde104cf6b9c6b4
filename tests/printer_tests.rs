// tests/printer_tests.rs

mod common;

use cstml::print::collect_tags;
use cstml::{
    print_pretty, print_pretty_with, print_source, read_tree, stream, EngineConfig, ErrorKind,
    Interpolation, Tag, Template,
};
use common::{parse_list, parse_list_template};

#[test]
fn test_pretty_list() {
    let root = parse_list("List", "[a 1]").unwrap();
    let expected = [
        "<!0:cstml language='List'>",
        "<>",
        "  <List>",
        "    items[]: []",
        "    open: <*Punctuator '[' />",
        "    items[]: <*Word>",
        "      'a'",
        "    </>",
        "    #' '",
        "    items[]: <Number:Integer>",
        "      digits[]: []",
        "      digits[]: <*Digit>",
        "        '1'",
        "      </>",
        "    </>",
        "    close: <*Punctuator ']' />",
        "  </>",
        "</>",
    ]
    .join("\n");
    assert_eq!(print_pretty(&root).unwrap(), expected);
}

#[test]
fn test_pretty_gaps_and_expressions() {
    let word = parse_list("Word", "b").unwrap();
    let template = Template::new(["[", " ", "]"], vec![word.into(), Interpolation::Gap]).unwrap();
    let root = parse_list_template("List", template).unwrap();
    let printed = print_pretty(&root).unwrap();
    assert!(printed.contains("\n    items[]: <*+Word>\n      'b'\n    </>\n"));
    assert!(printed.contains("\n    items[]: <//>\n"));
}

#[test]
fn test_doctype_version_from_config() {
    let root = parse_list("Word", "x").unwrap();
    let printed = print_pretty_with(&root, &EngineConfig::new().with_doctype_version(2)).unwrap();
    assert!(printed.starts_with("<!2:cstml language='List'>\n<>\n"));
}

#[test]
fn test_stream_is_balanced() {
    let root = parse_list("List", "[a [b c] [] 3]").unwrap();
    let tags = collect_tags(&root).unwrap();
    assert!(matches!(tags.first(), Some(Tag::Doctype(_))));
    assert!(matches!(tags.last(), Some(Tag::CloseFragment(_))));

    let mut depth = 0i32;
    for tag in &tags {
        match tag {
            Tag::OpenNode(_) | Tag::OpenFragment(_) => depth += 1,
            Tag::CloseNode(_) | Tag::CloseFragment(_) => depth -= 1,
            Tag::Embedded(_) => panic!("embedded tags are flattened"),
            _ => {}
        }
        assert!(depth >= 0);
    }
    assert_eq!(depth, 0);
}

#[test]
fn test_source_round_trip() {
    for text in ["[]", "[a]", "[a  [b c]   -12 [[]]]", "[Infinity -Infinity]"] {
        let root = parse_list("List", text).unwrap();
        assert_eq!(print_source(&root).unwrap(), text);
    }
}

#[test]
fn test_gap_has_no_source() {
    let root = parse_list_template("List", Template::with_gaps("[<//>]")).unwrap();
    let err = print_source(&root).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::GapInSource));
    assert!(print_pretty(&root).is_ok());
}

// ---
// Reading pretty output back
// ---

#[test]
fn test_pretty_output_reads_back() {
    let text = "[a  [b -3] Infinity []]";
    let root = parse_list("List", text).unwrap();
    let printed = print_pretty(&root).unwrap();
    let tree = read_tree(&printed).unwrap();
    assert_eq!(tree, *root);
    assert_eq!(print_pretty(&tree).unwrap(), printed);
    assert_eq!(print_source(&tree).unwrap(), text);
}

#[test]
fn test_pretty_gaps_read_back() {
    let word = parse_list("Word", "b").unwrap();
    let template = Template::new(["[", " ", "]"], vec![word.into(), Interpolation::Gap]).unwrap();
    let root = parse_list_template("List", template).unwrap();
    let printed = print_pretty(&root).unwrap();
    let tree = read_tree(&printed).unwrap();
    assert_eq!(tree, *root);
    assert!(tree.elements("items")[0].unwrap().flags.expression);
    assert!(tree.elements("items")[1].is_none());
}

#[test]
fn test_read_tree_keeps_array_order() {
    let text = [
        "<!0:cstml language='T'>",
        "<>",
        "  <X>",
        "    a[]: []",
        "    a[]: <*E 'e1' />",
        "    b: <*E 'x' />",
        "    a[]: <*E 'e2' />",
        "  </>",
        "</>",
    ]
    .join("\n");
    let tree = read_tree(&text).unwrap();
    let elements: Vec<String> = tree
        .elements("a")
        .into_iter()
        .flatten()
        .map(|element| element.text())
        .collect();
    assert_eq!(elements, ["e1", "e2"]);
    assert_eq!(tree.get("b").unwrap().text(), "x");
    assert_eq!(print_pretty(&tree).unwrap(), text);
}

#[test]
fn test_read_tree_rejects_duplicate_singular_property() {
    let text = [
        "<!0:cstml language='T'>",
        "<>",
        "  <X>",
        "    b: <*E 'x' />",
        "    b: <*E 'y' />",
        "  </>",
        "</>",
    ]
    .join("\n");
    let err = read_tree(&text).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateProperty { ref name, .. } if name == "b"));
}

#[test]
fn test_stream_stops_on_corrupt_tree() {
    let mut root = (*parse_list("List", "[a]").unwrap()).clone();
    root.properties.remove("items");
    let results: Vec<_> = stream(&root).collect();
    let last = results.last().unwrap();
    assert!(matches!(
        last.as_ref().unwrap_err().kind,
        ErrorKind::UnpopulatedReference { .. }
    ));
}

// tests/languages_tests.rs

use ::cstml::builders::build_string_node;
use ::cstml::languages::{cstml, instruction, number, regex, spamex, string};
use ::cstml::{
    parse, parse_template, print_pretty, print_source, read_tree, AttrValue, ErrorKind, Tag,
    Template,
};

// ---
// String
// ---

#[test]
fn test_string_escapes_split_content() {
    let language = string().unwrap();
    let root = parse(&language, "String", r"'it\'s ok'").unwrap();
    let content = root.get("content").unwrap();
    let tags: Vec<&Tag> = content.content().collect();
    assert_eq!(tags.len(), 3);
    assert!(matches!(tags[0], Tag::Literal(lit) if lit.text == "it"));
    assert!(matches!(tags[1], Tag::Escape(esc) if esc.raw == r"\'" && esc.cooked == "'"));
    assert!(matches!(tags[2], Tag::Literal(lit) if lit.text == "s ok"));
    assert_eq!(content.text(), "it's ok");
    assert_eq!(print_source(&root).unwrap(), r"'it\'s ok'");
}

#[test]
fn test_string_matches_builder() {
    let language = string().unwrap();
    let parsed = parse(&language, "String", r"'a\\b\'c'").unwrap();
    assert_eq!(*parsed, build_string_node(r"a\b'c").unwrap());

    let empty = parse(&language, "String", "''").unwrap();
    assert_eq!(*empty, build_string_node("").unwrap());
}

#[test]
fn test_string_single_content_property() {
    let language = string().unwrap();
    let err = parse_template(&language, "String", Template::with_gaps("'a<//>b'")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    assert_eq!(err.offset(), Some(2));

    let gap = parse_template(&language, "String", Template::with_gaps("'<//>'")).unwrap();
    assert!(print_pretty(&gap).unwrap().contains("content: <//>"));
}

#[test]
fn test_string_rejects_bad_escapes_and_newlines() {
    let language = string().unwrap();
    assert!(parse(&language, "String", r"'\q'").is_err());
    let err = parse(&language, "String", "'\n'").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    let err = parse(&language, "String", "'a\nb'").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    assert_eq!(err.offset(), Some(2));
    assert!(parse(&language, "String", "\"it's\"").is_ok());
}

// ---
// Number
// ---

#[test]
fn test_number_cover_picks_production() {
    let language = number().unwrap();
    let negative = parse(&language, "Number", "-Infinity").unwrap();
    assert_eq!(negative.node_type, "Infinity");
    assert!(negative.get("negative").is_some());

    let integer = parse(&language, "Number", "1024").unwrap();
    assert_eq!(integer.node_type, "Integer");
    assert_eq!(integer.elements("digits").len(), 4);
    assert_eq!(print_source(&integer).unwrap(), "1024");
}

#[test]
fn test_digits_accept_gaps() {
    let language = number().unwrap();
    let root = parse_template(&language, "Integer", Template::with_gaps("1<//>3")).unwrap();
    let digits = root.elements("digits");
    assert_eq!(digits.len(), 3);
    assert!(digits[1].is_none());
}

// ---
// Regex
// ---

fn kinds(node: &::cstml::Node, name: &str) -> Vec<String> {
    node.elements(name)
        .into_iter()
        .flatten()
        .map(|n| n.node_type.clone())
        .collect()
}

#[test]
fn test_regex_alternatives() {
    let language = regex().unwrap();
    let root = parse(&language, "Pattern", "/ab|c|/").unwrap();
    let alternatives = root.elements("alternatives");
    assert_eq!(alternatives.len(), 3);
    assert_eq!(kinds(alternatives[0].unwrap(), "elements"), ["Character", "Character"]);
    assert!(alternatives[2].unwrap().elements("elements").is_empty());
    assert_eq!(root.elements("separators").len(), 2);
    assert!(root.elements("flags").is_empty());
}

#[test]
fn test_regex_character_class() {
    let language = regex().unwrap();
    let root = parse(&language, "Pattern", r"/[^a-f\d.\]]/").unwrap();
    let alternative = root.elements("alternatives")[0].unwrap();
    let class = alternative.elements("elements")[0].unwrap();
    assert_eq!(class.node_type, "CharacterClass");
    assert_eq!(class.attributes.get("negate"), Some(&AttrValue::Bool(true)));
    assert_eq!(
        kinds(class, "elements"),
        ["CharacterClassRange", "CharacterSet", "Character", "Character"]
    );
    let range = class.elements("elements")[0].unwrap();
    assert_eq!(range.get("min").unwrap().text(), "a");
    assert_eq!(range.get("max").unwrap().text(), "f");
}

#[test]
fn test_regex_quantifier_bounds() {
    let language = regex().unwrap();
    let root = parse(&language, "Pattern", "/x{3}y*/").unwrap();
    let elements = root.elements("alternatives")[0].unwrap().elements("elements");
    let exact = elements[0].unwrap();
    assert_eq!(exact.attributes.get("min"), Some(&AttrValue::Integer(3)));
    assert_eq!(exact.attributes.get("max"), Some(&AttrValue::Integer(3)));
    let star = elements[1].unwrap();
    assert_eq!(star.attributes.get("min"), Some(&AttrValue::Integer(0)));
    assert_eq!(star.attributes.get("max"), Some(&AttrValue::Null));
}

#[test]
fn test_regex_interpolated_element() {
    let language = regex().unwrap();
    let dot = parse(&language, "Pattern", "/./").unwrap();
    let set = dot.elements("alternatives")[0].unwrap().elements("elements")[0]
        .unwrap()
        .clone();
    let template = Template::new(["/a", "+/"], vec![set.into()]).unwrap();
    let root = parse_template(&language, "Pattern", template).unwrap();
    let elements = root.elements("alternatives")[0].unwrap().elements("elements");
    assert_eq!(elements.len(), 2);
    let quantifier = elements[1].unwrap();
    assert_eq!(quantifier.node_type, "Quantifier");
    assert!(quantifier.get("element").unwrap().flags.expression);
}

#[test]
fn test_regex_pretty_attributes() {
    let language = regex().unwrap();
    let root = parse(&language, "Pattern", r"/\W/y").unwrap();
    let printed = print_pretty(&root).unwrap();
    assert!(printed.contains("<CharacterSet kind='word' negate>"));
    assert!(printed.contains("<Flag kind='sticky'>"));
}

// ---
// CSTML
// ---

#[test]
fn test_cstml_reads_printed_regex() {
    let root = parse(&regex().unwrap(), "Pattern", r"/a|[^b-d]+/g").unwrap();
    let printed = print_pretty(&root).unwrap();
    let document = parse(&cstml().unwrap(), "Document", &printed).unwrap();
    assert_eq!(print_source(&document).unwrap(), printed);
    assert_eq!(read_tree(&printed).unwrap(), *root);
}

#[test]
fn test_cstml_reads_printed_string() {
    let root = parse(&string().unwrap(), "String", r"'it\'s'").unwrap();
    let printed = print_pretty(&root).unwrap();
    assert!(printed.contains("<String>") && printed.contains("!'"));
    let tree = read_tree(&printed).unwrap();
    assert_eq!(tree, *root);
    assert_eq!(print_source(&tree).unwrap(), r"'it\'s'");
}

// ---
// Spamex and Instruction
// ---

#[test]
fn test_spamex_pattern_source() {
    let language = spamex().unwrap();
    for text in ["<*Word>", "<?>", "<Regex:Pattern /x/>", "'lit'", "<*Word 'w' strict>"] {
        let root = parse(&language, "Pattern", text).unwrap();
        assert_eq!(print_source(&root).unwrap(), text);
    }
    assert!(parse(&language, "Pattern", "<Word").is_err());
}

#[test]
fn test_instruction_call_source() {
    let text = "eatMatch(<*Punctuator '['> 'open' { balanced: ']' } [null true])";
    let root = parse(&instruction().unwrap(), "Call", text).unwrap();
    assert_eq!(root.get("verb").unwrap().text(), "eatMatch");
    assert_eq!(print_source(&root).unwrap(), text);
    let values = root.get("arguments").unwrap().elements("values");
    assert_eq!(values.len(), 4);
}

//! CSTML, the text form of a tree.
//!
//! `Document` reads exactly what [`print_pretty`](crate::print::print_pretty)
//! writes: a doctype, then a fragment holding the root node. The result is
//! the syntax tree of the document itself; [`read_tree`] goes one step
//! further and rebuilds the tree the document describes.
//!
//! Every tag opens a `Tag` span guarded by `>`. Attribute values are
//! `String` strings, `Number` integers, constants, arrays and objects.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CstError, CstResult};
use crate::grammar::{CoverTable, Grammar, Language, ProductionResult};
use crate::node::{Node, NodeBuilder, Property};
use crate::parser::{parse, parse_template, sticky, Props, Template, TemplateParser};
use crate::print::DOCTYPE;
use crate::resolver::Resolver;
use crate::tags::{
    attributes, AttrValue, Attributes, EmbeddedTag, NodeFlags, NullTag, ReferenceTag, Tag,
};

use super::{number, string, KEYWORD, PUNCTUATOR};

pub const NAME: &str = "CSTML";
pub const IDENTIFIER: &str = "Identifier";

/// Span kind opened by every tag.
pub const TAG: &str = "Tag";

/// Attribute set on an `OpenNodeTag` that closes itself (`<*Type 'text' />`).
pub const SELF_CLOSING: &str = "selfClosing";

crate::productions! {
    pub enum CstmlProduction {
        Document,
        Doctype,
        Fragment,
        OpenFragmentTag,
        Children,
        Child,
        Property,
        PropertyValue,
        Node,
        OpenNodeTag,
        CloseNodeTag,
        Flags,
        TagType,
        Identifier,
        GlobalIdentifier,
        Attributes,
        Attribute,
        MappingAttribute,
        BooleanAttribute,
        AttributeValue,
        Constant,
        Array,
        Object,
        ObjectEntry,
        Gap,
        Null,
        EmptyArray,
        Literal,
        Escape,
        Trivia,
    }
}

fn re(pattern: &str) -> Regex {
    sticky(pattern).expect("static regex")
}

static SPACE: Lazy<Regex> = Lazy::new(|| re(r"\s+"));
static WORD: Lazy<Regex> = Lazy::new(|| re(r"\w+"));
static QUOTE: Lazy<Regex> = Lazy::new(|| re(r#"['"]"#));
static FLAG: Lazy<Regex> = Lazy::new(|| re(r"[#*@+]"));
static NULL: Lazy<Regex> = Lazy::new(|| re(r"null\b"));
static CONSTANT: Lazy<Regex> = Lazy::new(|| re(r"(?:true|false|null)\b"));
static NUMBER_START: Lazy<Regex> = Lazy::new(|| re(r"-|\d"));

/// A canonical id: a plain name or a URL, up to the `:` before the type.
static LANGUAGE_ID: Lazy<Regex> = Lazy::new(|| re(r#"(?:[^\s:<>'"=/]+://)?[^\s:<>'"=]+"#));
static QUALIFIED_TYPE: Lazy<Regex> =
    Lazy::new(|| re(r#"(?:[^\s:<>'"=/]+://)?[^\s:<>'"=]+:\w"#));

static ATTRIBUTE_START: Lazy<Regex> = Lazy::new(|| re(r"\s+\w"));
static VALUE_START: Lazy<Regex> = Lazy::new(|| re(r#"\s+['"]"#));
static MAPPING_START: Lazy<Regex> = Lazy::new(|| re(r"\w+\s*="));
static PROPERTY_START: Lazy<Regex> = Lazy::new(|| re(r"\w+(?:\[\])?\s*:"));
static CHILD_START: Lazy<Regex> = Lazy::new(|| re(r#"[#!]?['"]|<//>|<[^/>]|\w"#));
static TRIVIA_START: Lazy<Regex> = Lazy::new(|| re(r#"#['"]"#));
static ESCAPE_START: Lazy<Regex> = Lazy::new(|| re(r#"!['"]"#));

#[derive(Debug, Clone, Copy, Default)]
pub struct CstmlGrammar;

impl Grammar for CstmlGrammar {
    type Production = CstmlProduction;

    fn eval(
        &self,
        production: CstmlProduction,
        p: &mut TemplateParser,
        _props: &Props,
    ) -> ProductionResult {
        use CstmlProduction::*;
        match production {
            Document => document(p),
            Doctype => doctype(p),
            Fragment => fragment(p),
            OpenFragmentTag => open_fragment_tag(p),
            Children => children(p),
            Child => child(p),
            Property => property(p),
            PropertyValue => property_value(p),
            Node => node(p),
            OpenNodeTag => open_node_tag(p),
            CloseNodeTag => close_node_tag(p),
            Flags => flags(p),
            TagType => tag_type(p),
            Identifier => {
                p.eat_literal(&WORD)?;
                Ok(None)
            }
            GlobalIdentifier => global_identifier(p),
            Attributes => attribute_list(p),
            Attribute => attribute(p),
            MappingAttribute => mapping_attribute(p),
            BooleanAttribute => {
                p.eat(&WORD, IDENTIFIER, Props::path("key"))?;
                Ok(None)
            }
            AttributeValue => attribute_value(p),
            Constant => {
                p.eat(&CONSTANT, KEYWORD, Props::path("value"))?;
                Ok(None)
            }
            Array => array(p),
            Object => object(p),
            ObjectEntry => object_entry(p),
            Gap => {
                p.eat("<//>", PUNCTUATOR, Props::path("value"))?;
                Ok(None)
            }
            Null => {
                p.eat(&NULL, KEYWORD, Props::path("value"))?;
                Ok(None)
            }
            EmptyArray => {
                p.eat("[", PUNCTUATOR, Props::path("open"))?;
                p.eat("]", PUNCTUATOR, Props::path("close"))?;
                Ok(None)
            }
            Literal => {
                p.eat_production("String:String", Props::path("value"))?;
                Ok(None)
            }
            Escape => escape(p),
            Trivia => {
                p.eat("#", PUNCTUATOR, Props::path("trivializeOperator"))?;
                p.eat_production("String:String", Props::path("value"))?;
                Ok(None)
            }
        }
    }
}

// ============================================================================
// DOCUMENT STRUCTURE
// ============================================================================

fn open_tag(p: &mut TemplateParser, open: &str) -> CstResult<String> {
    p.eat(open, PUNCTUATOR, Props::path("open").start_span(TAG).balanced(">"))
}

fn close_tag(p: &mut TemplateParser, close: &str) -> CstResult<Option<String>> {
    p.eat_match(close, PUNCTUATOR, Props::path("close").end_span(TAG).balancer())
}

fn document(p: &mut TemplateParser) -> ProductionResult {
    p.eat_match_trivia(&SPACE)?;
    if p.match_pattern("<!").is_some() {
        p.eat_production("Doctype", Props::path("doctype"))?;
        p.eat_match_trivia(&SPACE)?;
    }
    p.eat_production("Fragment", Props::path("tree"))?;
    p.eat_match_trivia(&SPACE)?;
    Ok(None)
}

fn doctype(p: &mut TemplateParser) -> ProductionResult {
    open_tag(p, "<!")?;
    p.eat_production("Number:Integer", Props::path("version"))?;
    p.eat(":", PUNCTUATOR, Props::path("versionSeparator"))?;
    p.eat(&WORD, IDENTIFIER, Props::path("doctype"))?;
    p.eat_production("Attributes", Props::none())?;
    p.eat_match_trivia(&SPACE)?;
    p.eat(">", PUNCTUATOR, Props::path("close").end_span(TAG).balancer())?;
    Ok(None)
}

fn fragment(p: &mut TemplateParser) -> ProductionResult {
    p.declare_array("children[]")?;
    p.eat_production("OpenFragmentTag", Props::path("open"))?;
    p.eat_production("Children", Props::none())?;
    p.eat_production("CloseNodeTag", Props::path("close"))?;
    Ok(None)
}

fn open_fragment_tag(p: &mut TemplateParser) -> ProductionResult {
    open_tag(p, "<")?;
    p.eat(">", PUNCTUATOR, Props::path("close").end_span(TAG).balancer())?;
    Ok(None)
}

fn close_node_tag(p: &mut TemplateParser) -> ProductionResult {
    open_tag(p, "</")?;
    p.eat(">", PUNCTUATOR, Props::path("close").end_span(TAG).balancer())?;
    Ok(None)
}

fn children(p: &mut TemplateParser) -> ProductionResult {
    loop {
        p.eat_match_trivia(&SPACE)?;
        if !p.at_expression() && p.match_pattern(&CHILD_START).is_none() {
            break;
        }
        p.eat_production("Child", Props::path("children[]"))?;
    }
    Ok(None)
}

fn child(p: &mut TemplateParser) -> ProductionResult {
    let name = if p.match_pattern(&PROPERTY_START).is_some() {
        "Property"
    } else if p.match_pattern(&TRIVIA_START).is_some() {
        "Trivia"
    } else if p.match_pattern(&ESCAPE_START).is_some() {
        "Escape"
    } else if p.match_pattern(&QUOTE).is_some() {
        "Literal"
    } else if p.match_pattern("<//>").is_some() {
        "Gap"
    } else if p.match_pattern("<").is_some() {
        "Node"
    } else if p.match_pattern(&NULL).is_some() {
        "Null"
    } else {
        return Err(CstError::syntax("expected a property, a node or a terminal"));
    };
    p.eat_production(name, Props::none())?;
    Ok(None)
}

fn property(p: &mut TemplateParser) -> ProductionResult {
    p.eat(&WORD, IDENTIFIER, Props::path("key"))?;
    p.eat_match("[]", PUNCTUATOR, Props::path("arrayOperator"))?;
    p.eat_match_trivia(&SPACE)?;
    p.eat(":", PUNCTUATOR, Props::path("mapOperator"))?;
    p.eat_match_trivia(&SPACE)?;
    p.eat_production("PropertyValue", Props::path("value"))?;
    Ok(None)
}

fn property_value(p: &mut TemplateParser) -> ProductionResult {
    let name = if p.match_pattern("<//>").is_some() {
        "Gap"
    } else if p.match_pattern("[]").is_some() {
        "EmptyArray"
    } else if p.match_pattern(&NULL).is_some() {
        "Null"
    } else {
        "Node"
    };
    p.eat_production(name, Props::none())?;
    Ok(None)
}

// ============================================================================
// NODE TAGS
// ============================================================================

fn node(p: &mut TemplateParser) -> ProductionResult {
    if p.match_pattern("<>").is_some() {
        return Err(CstError::syntax("a fragment is not a node"));
    }
    let open = p.eat_production("OpenNodeTag", Props::path("open"))?;
    let self_closing = open.is_some_and(|open| open.attributes.contains_key(SELF_CLOSING));
    if !self_closing {
        p.declare_array("children[]")?;
        p.eat_production("Children", Props::none())?;
        p.eat_production("CloseNodeTag", Props::path("close"))?;
    }
    Ok(None)
}

fn open_node_tag(p: &mut TemplateParser) -> ProductionResult {
    open_tag(p, "<")?;
    if p.match_pattern(&FLAG).is_some() {
        p.eat_production("Flags", Props::path("flags"))?;
    }
    p.eat_production("TagType", Props::path("type"))?;
    p.eat_production("Attributes", Props::none())?;

    let valued = p.match_pattern(&VALUE_START).is_some();
    if valued {
        p.eat_trivia(&SPACE)?;
        p.eat_production("String:String", Props::path("value"))?;
    }
    p.eat_match_trivia(&SPACE)?;

    let self_closing = close_tag(p, "/>")?.is_some();
    if !self_closing {
        p.eat(">", PUNCTUATOR, Props::path("close").end_span(TAG).balancer())?;
    }
    if valued != self_closing {
        return Err(CstError::syntax("only a self-closing tag holds text"));
    }
    Ok(self_closing.then(|| attributes([(SELF_CLOSING, true)])))
}

/// Sigils in printed order: `#` trivia, `*` token, `@` escape, `+` expression.
fn flags(p: &mut TemplateParser) -> ProductionResult {
    for (sigil, path) in [("#", "trivia"), ("*", "token"), ("@", "escape"), ("+", "expression")] {
        p.eat_match(sigil, PUNCTUATOR, Props::path(path))?;
    }
    Ok(None)
}

fn tag_type(p: &mut TemplateParser) -> ProductionResult {
    if p.match_pattern(&QUALIFIED_TYPE).is_some() {
        p.eat_production("GlobalIdentifier", Props::none())?;
    } else {
        p.eat_production("Identifier", Props::none())?;
    }
    Ok(None)
}

fn global_identifier(p: &mut TemplateParser) -> ProductionResult {
    p.eat(&LANGUAGE_ID, IDENTIFIER, Props::path("language"))?;
    p.eat(":", PUNCTUATOR, Props::path("namespaceOperator"))?;
    p.eat(&WORD, IDENTIFIER, Props::path("type"))?;
    Ok(None)
}

fn escape(p: &mut TemplateParser) -> ProductionResult {
    p.eat("!", PUNCTUATOR, Props::path("escapeOperator"))?;
    p.eat_production("String:String", Props::path("rawValue"))?;
    p.eat(":", PUNCTUATOR, Props::path("rawOperator"))?;
    p.eat_production("String:String", Props::path("value"))?;
    Ok(None)
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

fn attribute_list(p: &mut TemplateParser) -> ProductionResult {
    while p.match_pattern(&ATTRIBUTE_START).is_some() {
        p.eat_trivia(&SPACE)?;
        p.eat_production("Attribute", Props::path("attributes[]"))?;
    }
    Ok(None)
}

fn attribute(p: &mut TemplateParser) -> ProductionResult {
    if p.match_pattern(&MAPPING_START).is_some() {
        p.eat_production("MappingAttribute", Props::none())?;
    } else {
        p.eat_production("BooleanAttribute", Props::none())?;
    }
    Ok(None)
}

fn mapping_attribute(p: &mut TemplateParser) -> ProductionResult {
    p.eat(&WORD, IDENTIFIER, Props::path("key"))?;
    p.eat_match_trivia(&SPACE)?;
    p.eat("=", PUNCTUATOR, Props::path("mapOperator"))?;
    p.eat_match_trivia(&SPACE)?;
    p.eat_production("AttributeValue", Props::path("value"))?;
    Ok(None)
}

fn attribute_value(p: &mut TemplateParser) -> ProductionResult {
    let name = if p.match_pattern(&QUOTE).is_some() {
        "String:String"
    } else if p.match_pattern(&NUMBER_START).is_some() {
        "Number:Integer"
    } else if p.match_pattern("[").is_some() {
        "Array"
    } else if p.match_pattern("{").is_some() {
        "Object"
    } else {
        "Constant"
    };
    p.eat_production(name, Props::none())?;
    Ok(None)
}

/// `open item, item close`, where `item` runs `production` under `path`.
fn delimited(
    p: &mut TemplateParser,
    (open, close): (&str, &str),
    production: &str,
    path: &str,
) -> ProductionResult {
    p.declare_array(path)?;
    p.eat(open, PUNCTUATOR, Props::path("open"))?;
    p.eat_match_trivia(&SPACE)?;
    while p.match_pattern(close).is_none() && !p.done() {
        p.eat_production(production, Props::path(path))?;
        p.eat_match_trivia(&SPACE)?;
        if p.eat_match(",", PUNCTUATOR, Props::path("separators[]"))?.is_none() {
            break;
        }
        p.eat_match_trivia(&SPACE)?;
    }
    p.eat(close, PUNCTUATOR, Props::path("close"))?;
    Ok(None)
}

fn array(p: &mut TemplateParser) -> ProductionResult {
    delimited(p, ("[", "]"), "AttributeValue", "elements[]")
}

fn object(p: &mut TemplateParser) -> ProductionResult {
    delimited(p, ("{", "}"), "ObjectEntry", "entries[]")
}

fn object_entry(p: &mut TemplateParser) -> ProductionResult {
    p.eat(&WORD, IDENTIFIER, Props::path("key"))?;
    p.eat(":", PUNCTUATOR, Props::path("mapOperator"))?;
    p.eat_match_trivia(&SPACE)?;
    p.eat_production("AttributeValue", Props::path("value"))?;
    Ok(None)
}

fn build() -> CstResult<Arc<Language>> {
    let covers = CoverTable::builder()
        .nodes([
            "Document",
            "Doctype",
            "Fragment",
            "OpenFragmentTag",
            "Child",
            "Property",
            "PropertyValue",
            "Node",
            "OpenNodeTag",
            "CloseNodeTag",
            "Flags",
            "TagType",
            "Identifier",
            "GlobalIdentifier",
            "Attribute",
            "MappingAttribute",
            "BooleanAttribute",
            "AttributeValue",
            "Constant",
            "Array",
            "Object",
            "ObjectEntry",
            "Gap",
            "Null",
            "EmptyArray",
            "Literal",
            "Escape",
            "Trivia",
        ])
        .cover(
            "Child",
            ["Property", "Node", "Gap", "Null", "Literal", "Escape", "Trivia"],
        )
        .cover("PropertyValue", ["Node", "Gap", "Null", "EmptyArray"])
        .cover("TagType", ["Identifier", "GlobalIdentifier"])
        .cover("Attribute", ["MappingAttribute", "BooleanAttribute"])
        .cover(
            "AttributeValue",
            ["String:String", "Number:Integer", "Constant", "Array", "Object"],
        )
        .build();
    Language::builder(NAME, CstmlGrammar)
        .dependency(string()?)
        .dependency(number()?)
        .covers(covers)
        .build()
}

static LANGUAGE: Lazy<CstResult<Arc<Language>>> = Lazy::new(build);

/// The `CSTML` language. Parse documents with its `Document` production.
pub fn cstml() -> CstResult<Arc<Language>> {
    LANGUAGE.clone()
}

// ============================================================================
// READING TREES
// ============================================================================

/// Parses a CSTML document and rebuilds the tree it describes.
///
/// Reading the output of [`print_pretty`](crate::print::print_pretty) gives
/// back a tree equal to the one printed.
pub fn read_tree(text: &str) -> CstResult<Node> {
    let document = parse(&cstml()?, "Document", text)?;
    tree_from_document(&document)
}

/// [`read_tree`] over a template. Gaps in children become gaps in the tree.
pub fn read_tree_template(template: Template) -> CstResult<Node> {
    let document = parse_template(&cstml()?, "Document", template)?;
    tree_from_document(&document)
}

/// Rebuilds the tree described by a parsed `Document`.
pub fn tree_from_document(document: &Node) -> CstResult<Node> {
    let language = match document.get("doctype") {
        Some(doctype) => {
            if text_of(doctype, "doctype")? != DOCTYPE {
                return Err(malformed("the doctype must be `cstml`"));
            }
            match read_attributes(doctype)?.get("language") {
                Some(AttrValue::String(language)) => Some(language.clone()),
                _ => None,
            }
        }
        None => None,
    };

    let fragment = required(document, "tree")?;
    let mut roots = fragment.elements("children").into_iter().filter(|child| {
        child.map_or(true, |child| child.node_type != "Trivia")
    });
    let root = match (roots.next(), roots.next()) {
        (Some(Some(root)), None) if root.node_type == "Node" => root,
        _ => return Err(malformed("a document holds exactly one root node")),
    };
    read_node(root, language.as_deref()).map(|node| Node::clone(&node))
}

fn malformed(message: impl Into<String>) -> CstError {
    CstError::syntax(message)
}

fn required<'n>(node: &'n Node, name: &str) -> CstResult<&'n Arc<Node>> {
    node.get(name)
        .ok_or_else(|| malformed(format!("`{}` has no `{name}`", node.node_type)))
}

fn text_of(node: &Node, name: &str) -> CstResult<String> {
    required(node, name).map(|child| child.text())
}

/// The cooked value of a `String` node.
fn string_value(node: &Node) -> String {
    node.get("content").map(|content| content.text()).unwrap_or_default()
}

fn read_node(node: &Node, language: Option<&str>) -> CstResult<Arc<Node>> {
    let open = required(node, "open")?;
    let tag_type = required(open, "type")?;
    let (language, node_type) = if tag_type.node_type == "GlobalIdentifier" {
        (text_of(tag_type, "language")?, text_of(tag_type, "type")?)
    } else {
        let language = language.ok_or_else(|| malformed("the root node names no language"))?;
        (language.to_string(), tag_type.text())
    };

    let sigils = open.get("flags");
    let has = |name: &str| sigils.is_some_and(|flags| flags.get(name).is_some());
    let mut flags = NodeFlags {
        trivia: has("trivia"),
        token: has("token"),
        escape: has("escape"),
        expression: has("expression"),
        intrinsic: false,
    };

    let mut builder = NodeBuilder::new(language.as_str(), node_type.as_str(), flags);
    let mut resolver = Resolver::new(node_type.as_str());
    if let Some(value) = open.get("value") {
        flags.token = true;
        flags.intrinsic = true;
        builder.set_flags(flags);
        builder.push(Tag::literal(string_value(value)));
    } else {
        for child in node.elements("children") {
            let Some(child) = child else {
                builder.push(Tag::gap(None));
                continue;
            };
            read_child(child, &language, &mut builder, &mut resolver)?;
        }
    }
    builder.set_attributes(read_attributes(open)?);
    Ok(Arc::new(builder.finish()?))
}

fn read_child(
    child: &Node,
    language: &str,
    builder: &mut NodeBuilder,
    resolver: &mut Resolver,
) -> CstResult<()> {
    let tag = match child.node_type.as_str() {
        "Property" => return read_property(child, language, builder, resolver),
        "Node" => Tag::Embedded(EmbeddedTag {
            node: read_node(child, Some(language))?,
        }),
        "Gap" => Tag::gap(None),
        "Null" => Tag::Null(NullTag),
        "Literal" => Tag::literal(string_value(required(child, "value")?)),
        "Trivia" => Tag::trivia(string_value(required(child, "value")?)),
        "Escape" => Tag::escape(
            string_value(required(child, "rawValue")?),
            string_value(required(child, "value")?),
        ),
        other => return Err(malformed(format!("`{other}` cannot be a child"))),
    };
    builder.push(tag);
    Ok(())
}

fn read_property(
    property: &Node,
    language: &str,
    builder: &mut NodeBuilder,
    resolver: &mut Resolver,
) -> CstResult<()> {
    let key = text_of(property, "key")?;
    let reference = ReferenceTag::new(key.as_str(), property.get("arrayOperator").is_some());

    let value = match property.property("value") {
        Some(Property::Node(value)) => value,
        _ => {
            let slot = resolver.consume(&reference)?;
            builder.attach_gap(&reference, &slot);
            return Ok(());
        }
    };
    match value.node_type.as_str() {
        "EmptyArray" if reference.is_array => {
            resolver.declare_array(&key)?;
            builder.declare_array(&key);
        }
        "EmptyArray" => return Err(malformed(format!("`{key}` is not an array"))),
        "Gap" => {
            let slot = resolver.consume(&reference)?;
            builder.attach_gap(&reference, &slot);
        }
        "Null" => {
            let slot = resolver.consume(&reference)?;
            builder.attach_null(&reference, &slot);
        }
        _ => {
            let slot = resolver.consume(&reference)?;
            builder.attach(&reference, &slot, read_node(value, Some(language))?);
        }
    }
    Ok(())
}

fn read_attributes(tag: &Node) -> CstResult<Attributes> {
    let mut attributes = Attributes::new();
    for attribute in tag.elements("attributes").into_iter().flatten() {
        let key = text_of(attribute, "key")?;
        let value = match attribute.get("value") {
            Some(value) => read_value(value)?,
            None => AttrValue::Bool(true),
        };
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn read_value(value: &Node) -> CstResult<AttrValue> {
    Ok(match value.node_type.as_str() {
        "String" => AttrValue::String(string_value(value)),
        "Integer" => {
            let digits: String = value
                .elements("digits")
                .into_iter()
                .flatten()
                .map(|digit| digit.text())
                .collect();
            let sign = if value.get("negative").is_some() { "-" } else { "" };
            let integer = format!("{sign}{digits}")
                .parse()
                .map_err(|_| malformed(format!("`{sign}{digits}` is out of range")))?;
            AttrValue::Integer(integer)
        }
        "Constant" => match text_of(value, "value")?.as_str() {
            "true" => AttrValue::Bool(true),
            "false" => AttrValue::Bool(false),
            _ => AttrValue::Null,
        },
        "Array" => AttrValue::Array(
            value
                .elements("elements")
                .into_iter()
                .flatten()
                .map(|element| read_value(element))
                .collect::<CstResult<_>>()?,
        ),
        "Object" => AttrValue::Object(
            value
                .elements("entries")
                .into_iter()
                .flatten()
                .map(|entry| Ok((text_of(entry, "key")?, read_value(required(entry, "value")?)?)))
                .collect::<CstResult<_>>()?,
        ),
        other => return Err(malformed(format!("`{other}` is not an attribute value"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::print::{print_pretty, print_source};

    const GROUP: &str = concat!(
        "<!0:cstml language='Test'>\n",
        "<>\n",
        "  <Group depth=2 name='g'>\n",
        "    open: <*Punctuator '(' />\n",
        "    body: <//>\n",
        "    close: <*Punctuator ')' />\n",
        "  </>\n",
        "</>",
    );

    #[test]
    fn test_document_source_round_trip() {
        let document = parse(&cstml().unwrap(), "Document", GROUP).unwrap();
        assert_eq!(print_source(&document).unwrap(), GROUP);

        let tree = document.get("tree").unwrap();
        let root = tree.elements("children")[0].unwrap();
        let open = root.get("open").unwrap();
        assert_eq!(open.elements("attributes").len(), 2);
        assert_eq!(open.get("type").unwrap().text(), "Group");
    }

    #[test]
    fn test_read_tree() {
        let tree = read_tree(GROUP).unwrap();
        assert_eq!(tree.language, "Test");
        assert_eq!(tree.node_type, "Group");
        assert_eq!(tree.attributes.get("depth"), Some(&AttrValue::Integer(2)));
        assert_eq!(tree.property("body"), Some(&Property::Null));
        let open = tree.get("open").unwrap();
        assert_eq!(open.flags, NodeFlags::INTRINSIC);
        assert_eq!(open.text(), "(");
        assert_eq!(print_pretty(&tree).unwrap(), GROUP);
    }

    #[test]
    fn test_attribute_values() {
        let text = concat!(
            "<!0:cstml language='T'>\n",
            "<>\n",
            "  <*X list=[1, -2, null] map={a: 'b', c: false} on 'x' />\n",
            "</>",
        );
        let tree = read_tree(text).unwrap();
        assert_eq!(
            tree.attributes.get("list"),
            Some(&AttrValue::Array(vec![
                AttrValue::Integer(1),
                AttrValue::Integer(-2),
                AttrValue::Null
            ]))
        );
        assert_eq!(
            tree.attributes.get("map"),
            Some(&AttrValue::Object(attributes([
                ("a", AttrValue::from("b")),
                ("c", AttrValue::Bool(false)),
            ])))
        );
        assert_eq!(tree.attributes.get("on"), Some(&AttrValue::Bool(true)));
        assert_eq!(print_pretty(&tree).unwrap(), text);
    }

    #[test]
    fn test_malformed_documents() {
        let language = cstml().unwrap();
        assert!(parse(&language, "Document", "<>\n  <X>\n</>").is_err());

        let err = parse(&language, "Document", "<>\n  <*X 'a'>\n  </>\n</>").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax { .. }));

        let err = read_tree("<>\n  <X>\n  </>\n</>").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax { .. }));

        let err = read_tree("<!0:html language='T'>\n<>\n  <X>\n  </>\n</>").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax { .. }));
    }
}

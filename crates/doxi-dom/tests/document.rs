//! Document level tests: provenance, file table, serialization, adoption

use std::path::{Path, PathBuf};
use std::sync::Arc;

use doxi_dom::{AttrValue, Config, Document, DomError, NodeId, NodeTypeBuilder, Provenance};
use doxi_source::{LexicalPaths, Location, SourceMap};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn document_at(base_dir: &str) -> anyhow::Result<Document> {
    init_tracing();

    let config = Config {
        base_dir: Some(PathBuf::from(base_dir)),
        ..Config::default()
    };
    let mut doc = Document::with_paths(config, Arc::new(LexicalPaths::new("/work")));

    let entity = NodeTypeBuilder::new("entity")
        .extends(doc.registry().node())
        .attribute("alias[|]", AttrValue::Null)
        .attribute("mixins[]", AttrValue::Null)
        .attribute("text...", AttrValue::Null)
        .attribute("static", false)
        .build()?;
    doc.register_type(entity)?;
    Ok(doc)
}

fn attached(doc: &mut Document) -> anyhow::Result<NodeId> {
    let node = doc.create_node("entity")?;
    doc.append_child(doc.root(), node)?;
    Ok(node)
}

fn strings(locations: &[Option<Location>]) -> Vec<String> {
    locations
        .iter()
        .map(|l| l.as_ref().map_or("??".to_string(), Location::to_string))
        .collect()
}

#[test]
fn test_composite_alias_positions() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj")?;
    let node = attached(&mut doc)?;

    doc.set_attribute_at(node, "alias", "foo|bar", Location::new("Foo.js", 123, 42))?;

    assert_eq!(doc.get_attribute(node, "alias")?, &AttrValue::from(vec!["foo", "bar"]));
    assert_eq!(strings(&doc.attribute_locations(node, "alias")?), vec!["Foo.js:123:42", "Foo.js:123:46"]);
    assert_eq!(doc.attribute_src(node, "alias")?.as_deref(), Some("0:123:42|0:123:46"));
    Ok(())
}

#[test]
fn test_append_attribute_combinations() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj")?;
    let node = attached(&mut doc)?;

    // nothing known, then a location per element
    doc.append_attribute(node, "mixins", "A,B", None)?;
    doc.append_attribute(node, "mixins", "C", Some(Location::new("M.js", 4, 9).into()))?;
    assert_eq!(doc.get_attribute(node, "mixins")?, &AttrValue::from(vec!["A", "B", "C"]));
    assert_eq!(strings(&doc.attribute_locations(node, "mixins")?), vec!["??", "??", "M.js:4:9"]);

    // encoded on both sides stays encoded
    let other = attached(&mut doc)?;
    doc.set_attribute_at(other, "alias", "x", "0:1:1")?;
    doc.append_attribute(other, "alias", "y|z", Some(Provenance::Encoded("0:2:1|0:2:3".into())))?;
    assert!(doc.node(other)?.provenance("alias").is_some_and(Provenance::is_encoded));
    assert_eq!(doc.attribute_src(other, "alias")?.as_deref(), Some("0:1:1|0:2:1|0:2:3"));

    // scalars cannot be appended to
    assert_eq!(
        doc.append_attribute(other, "static", true, None).unwrap_err(),
        DomError::NotComposite("static".into())
    );
    Ok(())
}

#[test]
fn test_too_many_locations_rejected() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj")?;
    let node = attached(&mut doc)?;

    let err = doc
        .set_attribute_at(
            node,
            "alias",
            "one",
            vec![Location::new("A.js", 1, 1), Location::new("A.js", 1, 5)],
        )
        .unwrap_err();
    assert!(matches!(err, DomError::InvalidPosition { .. }));
    assert!(!doc.node(node)?.has_attribute("alias"));
    Ok(())
}

#[test]
fn test_base_dir_change_keeps_ids() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj/test/specs")?;
    let node = attached(&mut doc)?;

    assert_eq!(doc.file_index("/work/proj/foo"), 0);
    doc.set_attribute_at(node, "name", "n", Location::new("/work/proj/bar", 5, 2))?;
    assert_eq!(doc.file(0), Some(Path::new("../../foo")));
    assert_eq!(doc.file(1), Some(Path::new("../../bar")));

    doc.set_base_dir("/work/proj/test")?;

    assert_eq!(doc.file(0), Some(Path::new("../foo")));
    assert_eq!(doc.file(1), Some(Path::new("../bar")));
    assert_eq!(doc.attribute_location(node, "name")?, Some(Location::new("../bar", 5, 2)));
    assert_eq!(doc.attribute_src(node, "name")?.as_deref(), Some("1:5:2"));
    assert_eq!(
        doc.resolve_location(&Location::new("../bar", 5, 2)).file,
        Some(PathBuf::from("/work/proj/bar"))
    );
    Ok(())
}

#[test]
fn test_encode_keeps_null_slots() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj")?;
    let src = doc.encode_locations(&[None, Some(Location::new("Foo.js", 3, 4)), None]);
    assert_eq!(src, "??|0:3:4|??");

    let decoded = doc.decode_locations(&src)?;
    assert_eq!(decoded, vec![None, Some(Location::new("Foo.js", 3, 4)), None]);
    Ok(())
}

#[test]
fn test_multiline_edits_follow_sources() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj")?;
    let node = attached(&mut doc)?;

    let text = "Hello\nWorld\nBye";
    let sources = SourceMap::new(
        vec![PathBuf::from("/work/proj/A.js"), PathBuf::from("/work/proj/B.js")],
        text,
        "0:10:4:12|1:50:1",
    )?;
    doc.set_attribute_at(node, "text", text, sources)?;

    assert_eq!(doc.attribute_location(node, "text")?, Some(Location::new("A.js", 10, 4)));

    // drop "World\n"; "Bye" keeps its place in B.js
    doc.erase_attribute_text(node, "text", 6, 6)?;
    let sources = doc.attribute_sources(node, "text")?.expect("source map");
    assert_eq!(sources.text(), "Hello\nBye");
    assert_eq!(sources.at(6), Some(Location::new("B.js", 50, 1)));

    // same-length replacement leaves the chunks alone
    doc.replace_attribute_text(node, "text", 0, 5, "Howdy")?;
    assert_eq!(doc.get_attribute(node, "text")?.as_str(), Some("Howdy\nBye"));
    assert_eq!(doc.attribute_src(node, "text")?.as_deref(), Some("0:10:4:6|1:50:1"));
    Ok(())
}

#[test]
fn test_serialize_round_trip() -> anyhow::Result<()> {
    let mut doc = document_at("/work/proj")?;
    let parent = attached(&mut doc)?;
    let child = doc.create_node("entity")?;
    doc.append_child(parent, child)?;

    doc.set_attribute_at(parent, "name", "Parent", Location::new("P.js", 1, 1))?;
    doc.set_attribute_at(parent, "alias", "p|q", Location::new("P.js", 2, 8))?;
    doc.set_attribute(child, "static", true)?;
    doc.set_attribute(child, "static", false)?;
    doc.set_attribute(child, "mixins", vec!["A", "B"])?;

    let json = doc.to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let item = &value["root"]["items"][0];
    assert_eq!(item["alias"], "p|q");
    assert_eq!(item["src"]["alias"], "0:2:8|0:2:10");
    assert_eq!(item["items"][0]["mixins"], "A,B");
    assert!(item["items"][0].get("static").is_none());

    let mut copy = document_at("/work/proj")?;
    copy.from_json(&json)?;
    assert_eq!(copy.serialize()?, doc.serialize()?);

    let loaded = copy.tree().child_named(copy.root(), "Parent", doxi_dom::Which::First);
    let loaded = loaded.expect("indexed by name");
    assert_ne!(copy.node(loaded)?.id(), doc.node(parent)?.id());
    assert_eq!(copy.attribute_location(loaded, "name")?, Some(Location::new("P.js", 1, 1)));
    Ok(())
}

#[test]
fn test_adopt_remaps_files() -> anyhow::Result<()> {
    let mut source = document_at("/work/lib")?;
    let node = attached(&mut source)?;
    let kid = source.create_node("entity")?;
    source.append_child(node, kid)?;
    source.set_attribute_at(kid, "alias", "a|b", Location::new("src/K.js", 7, 3))?;
    source.set_attribute_at(kid, "text", "doc", Location::new("src/K.js", 6, 4))?;

    let mut doc = document_at("/work/app")?;
    doc.file_index("Main.js");

    let adopted = doc.adopt(&mut source, node)?;
    doc.append_child(doc.root(), adopted)?;

    assert!(source.tree().children(source.root()).is_empty());

    let moved = doc.tree().children(adopted)[0];
    assert_eq!(
        strings(&doc.attribute_locations(moved, "alias")?),
        vec!["../lib/src/K.js:7:3", "../lib/src/K.js:7:5"]
    );
    assert_eq!(doc.attribute_src(moved, "alias")?.as_deref(), Some("1:7:3|1:7:5"));
    assert_eq!(doc.attribute_src(moved, "text")?.as_deref(), Some("1:6:4:3"));
    Ok(())
}

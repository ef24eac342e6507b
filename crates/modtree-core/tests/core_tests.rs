use modtree_core::node::{CHILD_DIR_KEY, CHILD_ORDER_KEY};
use modtree_core::{Db, Document, Error, FileStore, ObjectNode, WriteOpts, parse_all, print_all};
use serde_json::json;

fn obj(v: serde_json::Value) -> Document {
    v.as_object().cloned().expect("object literal")
}

fn script(len: usize) -> String {
    let mut s = String::from("print('x')\n");
    while s.len() < len {
        s.push('-');
    }
    s.truncate(len);
    s
}

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn read_doc(store: &FileStore, path: &str) -> Document {
    use modtree_core::DocumentReader;
    store.read_document(path).expect("read doc")
}

#[test]
fn long_script_goes_to_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let body = script(81);
    let doc = obj(json!({"GUID": "g1", "Nickname": "My Card!", "LuaScript": body}));

    let order = print_all("out/", &store, &store, &store, &[doc]).expect("print");
    assert_eq!(order, vec!["MyCard.g1"]);

    let written = read_doc(&store, "out/MyCard.g1.json");
    assert!(written.get("LuaScript").is_none());
    assert_eq!(written.get("LuaScript_path"), Some(&json!("out/MyCard.g1.ttslua")));
    let on_disk = std::fs::read_to_string(dir.path().join("out/MyCard.g1.ttslua")).unwrap();
    assert_eq!(on_disk, body);
}

#[test]
fn threshold_is_strictly_greater_than_80() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let docs = vec![
        obj(json!({
            "GUID": "a80",
            "LuaScript": script(80),
            "LuaScriptState": script(80),
            "GMNotes": script(80)
        })),
        obj(json!({
            "GUID": "a81",
            "LuaScript": script(81),
            "LuaScriptState": script(81),
            "GMNotes": script(81)
        })),
    ];
    print_all("", &store, &store, &store, &docs).unwrap();

    let inline = read_doc(&store, "a80.json");
    assert_eq!(inline.get("LuaScript"), Some(&json!(script(80))));
    assert_eq!(inline.get("LuaScriptState"), Some(&json!(script(80))));
    assert_eq!(inline.get("GMNotes"), Some(&json!(script(80))));
    assert!(inline.get("LuaScript_path").is_none());

    let ext = read_doc(&store, "a81.json");
    assert!(ext.get("LuaScript").is_none());
    assert!(ext.get("LuaScriptState").is_none());
    assert!(ext.get("GMNotes").is_none());
    assert_eq!(ext.get("LuaScript_path"), Some(&json!("a81.ttslua")));
    assert_eq!(ext.get("LuaScriptState_path"), Some(&json!("a81.luascriptstate")));
    assert_eq!(ext.get("GMNotes_path"), Some(&json!("a81.gmnotes")));
    assert!(dir.path().join("a81.gmnotes").is_file());
    assert!(!dir.path().join("a80.ttslua").exists());
}

#[test]
fn print_then_parse_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let docs = vec![
        obj(json!({
            "GUID": "deck01",
            "Name": "Deck",
            "Nickname": "Starter Deck",
            "Transform": {"posX": 1.5, "posY": 0.25, "rotY": 180.0, "scaleX": 1.0},
            "ColorDiffuse": {"r": 0.5, "g": 0.25, "b": 1.0},
            "LuaScript": script(120),
            "LuaScriptState": format!("{{\"counter\":{}}}", "1".repeat(90)),
            "GMNotes": format!("Setup: {}", "shuffle, then deal five to each seat. ".repeat(3)),
            "Locked": true,
            "ContainedObjects": [
                {"GUID": "c1", "Name": "Card", "Nickname": "Ace", "CardID": 100},
                {
                    "GUID": "c2",
                    "Name": "Card",
                    "Nickname": "Ace",
                    "CardID": 101,
                    "LuaScript": "print(1)"
                }
            ]
        })),
        obj(json!({"GUID": "b2", "Name": "Board", "LuaScript": "", "GMNotes": "short notes"})),
    ];

    let order = print_all("objs", &store, &store, &store, &docs).expect("print");
    assert_eq!(order, vec!["StarterDeck.deck01", "Board.b2"]);

    // same label, distinct guid, distinct files
    assert!(dir.path().join("objs/StarterDeck.deck01/Ace.c1.json").is_file());
    assert!(dir.path().join("objs/StarterDeck.deck01/Ace.c2.json").is_file());
    let deck = read_doc(&store, "objs/StarterDeck.deck01.json");
    assert_eq!(deck.get(CHILD_DIR_KEY), Some(&json!("StarterDeck.deck01")));
    assert_eq!(deck.get(CHILD_ORDER_KEY), Some(&json!(["Ace.c1", "Ace.c2"])));
    assert!(deck.get("ContainedObjects").is_none());
    assert!(deck.get("GMNotes").is_none());
    assert_eq!(deck.get("GMNotes_path"), Some(&json!("objs/StarterDeck.deck01.gmnotes")));
    assert!(dir.path().join("objs/StarterDeck.deck01.gmnotes").is_file());
    let board = read_doc(&store, "objs/Board.b2.json");
    assert_eq!(board.get("GMNotes"), Some(&json!("short notes")));

    let back = parse_all("objs", &store, &store, &store, &order).expect("parse");
    assert_eq!(back, docs);

    // a different top-level order is honoured
    let reversed: Vec<String> = order.iter().rev().cloned().collect();
    let back = parse_all("objs", &store, &store, &store, &reversed).unwrap();
    assert_eq!(back[0].get("GUID"), Some(&json!("b2")));
}

#[test]
fn bundled_script_is_unbundled_on_emit() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let bundled = format!(
        "{} {{\"version\":\"1.6.0\"}}\n\
         __bundle_register(\"__root\", \
         function(require, _LOADED, __bundle_register, __bundle_modules)\n\
         print('root')\nend)\n\
         return __bundle_require(\"__root\")\n",
        modtree_core::bundler::BUNDLE_MARKER
    );
    let doc = obj(json!({"GUID": "s1", "LuaScript": bundled, "LuaScript_path": "stale.ttslua"}));
    print_all("", &store, &store, &store, &[doc]).unwrap();
    let written = read_doc(&store, "s1.json");
    assert_eq!(written.get("LuaScript"), Some(&json!("print('root')")));
    assert!(written.get("LuaScript_path").is_none());
}

#[test]
fn missing_guid_is_missing_field() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let docs = vec![obj(json!({
        "Name": "NoId",
        "ContainedObjects": [],
        "Transform": {"posX": 1.23456}
    }))];
    let err = print_all("", &store, &store, &store, &docs).unwrap_err();
    assert!(matches!(err.root_cause(), Error::MissingField { key } if key == "GUID"));
    // caller's documents are untouched
    assert_eq!(docs[0].get("Transform"), Some(&json!({"posX": 1.23456})));
    assert!(docs[0].contains_key("ContainedObjects"));

    let err = ObjectNode::from_document(obj(json!({"GUID": 7}))).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn parse_all_checks_order_before_assembling() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    // notes sidecar is missing, so any assembly attempt would fail with Io
    std::fs::write(
        dir.path().join("A.a1.json"),
        r#"{"GUID":"a1","Name":"A","GMNotes_path":"gone.gmnotes"}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("B.b1.json"), r#"{"GUID":"b1","Name":"B"}"#).unwrap();
    std::fs::write(dir.path().join("notes.gmnotes"), "not a document").unwrap();

    let err = parse_all("", &store, &store, &store, &names(&["A.a1"])).unwrap_err();
    assert!(matches!(err, Error::OrderLengthMismatch { expected: 1, found: 2, .. }));
    let err = parse_all("", &store, &store, &store, &names(&["A.a1", "B.b1", "C"])).unwrap_err();
    assert!(matches!(err, Error::OrderLengthMismatch { .. }));
    let err = parse_all("", &store, &store, &store, &names(&["A.a1", "nope"])).unwrap_err();
    assert!(matches!(err, Error::UnknownOrderEntry { name } if name == "nope"));
    let err = parse_all("", &store, &store, &store, &names(&["B.b1", "B.b1"])).unwrap_err();
    assert!(matches!(err, Error::OrderLengthMismatch { .. }));

    let err = parse_all("", &store, &store, &store, &names(&["B.b1", "A.a1"])).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Io { path, .. } if path == "gone.gmnotes"));
}

#[test]
fn emit_rejects_order_length_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let child = ObjectNode::from_document(obj(json!({"GUID": "a"}))).unwrap();
    let node = ObjectNode {
        guid: "p".into(),
        data: obj(json!({"GUID": "p"})),
        child_order: vec!["a".into(), "b".into()],
        children: vec![child],
        ..Default::default()
    };
    let err = node.emit("", &store, &store, &store).unwrap_err();
    assert!(matches!(err.root_cause(), Error::OrderLengthMismatch { expected: 2, found: 1, .. }));
    assert!(!dir.path().join("p.json").exists());
}

#[test]
fn parse_from_file_rejects_order_length_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(
        dir.path().join("p.json"),
        r#"{"GUID":"p","ContainedObjects_order":["a","b"],"ContainedObjects":[{"GUID":"a"}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("q.json"),
        r#"{"GUID":"q","ContainedObjects_order":["a","b"]}"#,
    )
    .unwrap();

    let err = ObjectNode::parse_from_file("p.json", &store).unwrap_err();
    assert!(matches!(err.root_cause(), Error::OrderLengthMismatch { expected: 2, found: 1, .. }));
    let err = ObjectNode::parse_from_file("q.json", &store).unwrap_err();
    assert!(matches!(err.root_cause(), Error::OrderLengthMismatch { expected: 2, found: 0, .. }));
}

#[test]
fn nested_failure_names_every_level() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::create_dir_all(dir.path().join("Bag.p/Inner.c")).unwrap();
    std::fs::write(
        dir.path().join("Bag.p.json"),
        concat!(
            r#"{"GUID":"p","Name":"Bag","ContainedObjects_path":"Bag.p","#,
            r#""ContainedObjects_order":["Inner.c"]}"#
        ),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("Bag.p/Inner.c.json"),
        concat!(
            r#"{"GUID":"c","Name":"Inner","ContainedObjects_path":"Inner.c","#,
            r#""ContainedObjects_order":["x"]}"#
        ),
    )
    .unwrap();
    std::fs::write(dir.path().join("Bag.p/Inner.c/x.json"), r#"{"Name":"no guid"}"#).unwrap();

    let err = parse_all("", &store, &store, &store, &["Bag.p".to_string()]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Bag.p.json"), "{}", msg);
    assert!(msg.contains("Bag.p/Inner.c.json"), "{}", msg);
    assert!(msg.contains("Bag.p/Inner.c/x.json"), "{}", msg);
    assert!(matches!(err.root_cause(), Error::MissingField { .. }));
}

#[test]
fn smoothing_applies_and_angle_failure_names_field() {
    let node = ObjectNode::from_document(obj(json!({
        "GUID": "t",
        "Transform": {"posX": 0.123456, "rotY": 90},
        "AltLookAngle": {"x": -10.0, "y": 0.0, "z": 0.0},
        "AttachedSnapPoints": [{"Position": {"x": 1.000049}}]
    })))
    .unwrap();
    assert_eq!(node.data["Transform"], json!({"posX": 0.1235, "rotY": 90}));
    assert_eq!(node.data["AltLookAngle"], json!({"x": 350.0, "y": 0.0, "z": 0.0}));
    assert_eq!(node.data["AttachedSnapPoints"], json!([{"Position": {"x": 1.0}}]));

    let bad_angle = obj(json!({"GUID": "t", "AltLookAngle": "sideways"}));
    let err = ObjectNode::from_document(bad_angle).unwrap_err();
    assert!(err.to_string().contains("AltLookAngle"));
    assert!(matches!(err.root_cause(), Error::Smoothing { .. }));

    let err =
        ObjectNode::from_document(obj(json!({"GUID": "t", "AttachedSnapPoints": {}}))).unwrap_err();
    assert!(matches!(err.root_cause(), Error::Smoothing { .. }));
}

#[test]
fn inline_children_win_over_child_directory() {
    let node = ObjectNode::from_document(obj(json!({
        "GUID": "p",
        "ContainedObjects_path": "somewhere",
        "ContainedObjects_order": ["ignored"],
        "ContainedObjects": [{"GUID": "k", "Nickname": "Kid"}]
    })))
    .unwrap();
    assert_eq!(node.child_order, vec!["Kid.k"]);
    assert_eq!(node.children.len(), 1);
    assert_eq!(node.child_dir.as_deref(), Some("somewhere"));
    assert!(!node.data.contains_key("ContainedObjects"));
}

#[test]
fn empty_children_assemble_to_absence() {
    use modtree_core::LuaHandler;
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let node =
        ObjectNode::from_document(obj(json!({"GUID": "e", "ContainedObjects": []}))).unwrap();
    let out = node.assemble(&store, &LuaHandler::new(&store)).unwrap();
    assert_eq!(out, obj(json!({"GUID": "e"})));
}

#[test]
fn forest_roots_from_a_compact_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::with_opts(dir.path(), WriteOpts { pretty: false });
    assert_eq!(store.base(), dir.path());
    let docs = vec![
        obj(json!({"GUID": "r1", "Name": "One"})),
        obj(json!({"GUID": "r2", "Nickname": "Two", "ContainedObjects": [{"GUID": "k"}]})),
    ];
    print_all("", &store, &store, &store, &docs).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("One.r1.json")).unwrap();
    assert_eq!(raw, "{\"GUID\":\"r1\",\"Name\":\"One\"}\n");

    let mut db = Db::new(&store, &store);
    assert!(db.is_empty());
    db.parse_from_folder("").unwrap();
    assert_eq!(db.len(), 2);
    assert_eq!(db.roots().keys().collect::<Vec<_>>(), vec!["One.r1", "Two.r2"]);
    assert_eq!(db.roots()["Two.r2"].child_order, vec!["k"]);
    assert_eq!(db.roots()["Two.r2"].child_dir.as_deref(), Some("Two.r2"));
}

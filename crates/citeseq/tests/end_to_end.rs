use std::fs;
use std::thread;

use citeseq::{CiteseqError, Dataset, LinearChainModel, ReferenceFinder, ReferenceParser, TrainConfig};

const CORPUS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dataset>
  <sequence>
    <author>Smith, J.</author>
    <date>(2001).</date>
    <title>Parsing reference strings.</title>
    <journal>Journal of Things,</journal>
    <volume>12,</volume>
    <pages>1-10.</pages>
  </sequence>
  <sequence>
    <author>Doe, A. and Roe, B.</author>
    <date>(1999).</date>
    <title>Reading old books.</title>
    <publisher>Oxford University Press.</publisher>
  </sequence>
  <sequence>
    <author>Lee, K.</author>
    <date>(2015).</date>
    <title>Sequence models for citations.</title>
    <journal>Proceedings of Stuff,</journal>
    <pages>45-67.</pages>
  </sequence>
</dataset>
"#;

const INPUT: &str = "\
Smith, J. (2001). Parsing reference strings. Journal of Things, 12, 1-10.
Lee, K. (2015). Sequence models for citations. Proceedings of Stuff, 45-67.
Brown, R. (2020). Unseen words everywhere. Elsevier.
";

fn trained_parser() -> ReferenceParser {
    let dataset = Dataset::from_xml_str(CORPUS).unwrap();
    let mut parser = ReferenceParser::new(TrainConfig::new().with_seed(Some(7)));
    parser.train(&dataset).unwrap();
    parser
}

#[test]
fn test_saved_model_tags_identically() {
    let parser = trained_parser();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parser.json");
    parser.model().unwrap().save(&path, false).unwrap();

    let loaded = ReferenceParser::load(&path).unwrap();
    assert_eq!(parser.parse_str(INPUT).unwrap(), loaded.parse_str(INPUT).unwrap());
    assert_eq!(
        loaded.model().unwrap().weights(),
        parser.model().unwrap().weights()
    );
}

#[test]
fn test_parse_file_recovers_training_fields() {
    let parser = trained_parser();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refs.txt");
    fs::write(&path, INPUT).unwrap();

    let references = parser.parse(&path).unwrap();
    assert_eq!(references.len(), 3);
    assert_eq!(references[0].get("author"), Some("Smith, J."));
    assert_eq!(references[0].get("title"), Some("Parsing reference strings."));
    assert_eq!(references[1].get("date"), Some("(2015)."));
    assert!(!references[2].is_empty());
}

#[test]
fn test_model_file_is_not_clobbered() {
    let parser = trained_parser();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parser.json");
    fs::write(&path, "keep me").unwrap();

    let err = parser.model().unwrap().save(&path, false).unwrap_err();
    assert!(matches!(err, CiteseqError::ModelExists(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
}

#[test]
fn test_template_version_mismatch_is_rejected() {
    let parser = trained_parser();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parser.json");
    let json = parser
        .model()
        .unwrap()
        .to_json()
        .unwrap()
        .replacen("\"template_version\":1", "\"template_version\":2", 1);
    fs::write(&path, json).unwrap();

    assert!(matches!(
        ReferenceParser::load(&path),
        Err(CiteseqError::ModelLoad(_))
    ));
    assert!(matches!(
        LinearChainModel::load(dir.path().join("missing.json")),
        Err(CiteseqError::ModelLoad(_))
    ));
}

#[test]
fn test_independent_trainings_in_parallel() {
    let handles: Vec<_> = (0..4).map(|_| thread::spawn(trained_parser)).collect();
    let parsers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let expected = parsers[0].parse_str(INPUT).unwrap();
    for parser in &parsers[1..] {
        assert_eq!(parser.parse_str(INPUT).unwrap(), expected);
    }
}

#[test]
fn test_finder_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("paper.ttx");
    fs::write(
        &doc,
        "\
title  | On Things
text   | Body text of the paper goes here.
text   | It continues for a while.
blank  |
title  | References
ref    | Smith, J. (2001). Parsing reference strings. Journal of Things, 12, 1-10.
ref    | Doe, A. (1999). Reading old books. Oxford University Press.
",
    )
    .unwrap();

    let mut finder = ReferenceFinder::default();
    finder.train(&[&doc]).unwrap();
    let model_path = dir.path().join("finder.json");
    finder.model().unwrap().save(&model_path, false).unwrap();

    let plain = dir.path().join("paper.txt");
    fs::write(
        &plain,
        "On Things\nBody text of the paper goes here.\nIt continues for a while.\n\nReferences\n\
         Smith, J. (2001). Parsing reference strings. Journal of Things, 12, 1-10.\n\
         Doe, A. (1999). Reading old books. Oxford University Press.\n",
    )
    .unwrap();

    let loaded = ReferenceFinder::load(&model_path).unwrap();
    let spans = loaded.find(&plain).unwrap();
    assert_eq!(spans, finder.find(&plain).unwrap());
    assert_eq!(spans.len(), 1);
    assert_eq!((spans[0].start, spans[0].end), (5, 7));
}

use std::io::Write;

use scrub_ner::{load_model, EntityRecognizer, NerError};

#[test]
fn loads_lexicon_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "name": "acme_lexicon",
            "org": ["Initech"],
            "given_names": ["Milton"],
            "org_suffixes": ["Inc"],
            "stopwords": ["Memo"]
        }}"#
    )
    .expect("write lexicon");

    let path = file.path().to_string_lossy().into_owned();
    let model = load_model(Some(&path)).expect("load");
    assert_eq!(model.name(), "acme_lexicon");

    let entities = model.recognize("Memo: Milton Waddams moved to Initech");
    let found: Vec<(&str, &str)> = entities
        .iter()
        .map(|e| (e.label.as_str(), e.text.as_str()))
        .collect();
    assert_eq!(found, vec![("PERSON", "Milton Waddams"), ("ORG", "Initech")]);
}

#[test]
fn malformed_lexicon_is_a_json_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{{ not json").expect("write");
    let path = file.path().to_string_lossy().into_owned();
    assert!(matches!(load_model(Some(&path)), Err(NerError::Json(_))));
}

#[test]
fn recognizer_is_shareable_across_threads() {
    let model = std::sync::Arc::new(load_model(None).expect("embedded"));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let model = model.clone();
            std::thread::spawn(move || model.recognize("Jane Doe lives in Boston").len())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("thread"), 2);
    }
}

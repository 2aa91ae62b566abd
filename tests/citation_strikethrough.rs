//! §8 scenario 5: a tampered sentence gets struck through while the
//! surrounding, still-accurate citation marker is preserved.

use ire_engine::synthesis::citation::strike_sentence;

#[test]
fn tampered_sentence_is_struck_while_citation_marker_survives() {
    let report = "Adoption grew steadily. The rate is 42%. This matches prior findings [3].";
    let tampered_sentence = "The rate is 42%.";

    let struck = strike_sentence(report, tampered_sentence);

    assert_eq!(
        struck,
        "Adoption grew steadily. ~~The rate is 42%.~~ This matches prior findings [3]."
    );
    assert!(struck.contains("[3]"), "citation marker must survive strikethrough");
    assert!(!struck.contains("~~[3]~~"), "citation marker itself must not be struck");
}

#[test]
fn sentence_not_present_in_text_leaves_it_unchanged() {
    let report = "The rate is 85%. This matches prior findings [3].";
    let not_present = "The rate is 42%.";
    assert_eq!(strike_sentence(report, not_present), report);
}

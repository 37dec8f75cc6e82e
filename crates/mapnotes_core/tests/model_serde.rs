use mapnotes_core::store::DocumentId;
use mapnotes_core::{AppConfig, GeoPoint, Note, NoteDraft, ThemePreference};

#[test]
fn note_round_trips_through_json() {
    let note = Note {
        id: DocumentId::new("n1"),
        owner_id: "u1".to_string(),
        title: "Park".to_string(),
        description: "Bench here".to_string(),
        position: Some(GeoPoint::new(51.1, 10.4)),
        created_at_ms: Some(1_700_000_000_000),
    };

    let json = serde_json::to_string(&note).unwrap();
    let parsed: Note = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, note);
}

#[test]
fn document_id_serializes_transparently() {
    let json = serde_json::to_string(&DocumentId::new("n1")).unwrap();
    assert_eq!(json, "\"n1\"");
}

#[test]
fn draft_round_trips_through_json() {
    let draft = NoteDraft::new("Park", "Bench here", GeoPoint::new(51.1, 10.4));
    let json = serde_json::to_value(&draft).unwrap();
    assert_eq!(json["title"], "Park");
    assert_eq!(json["position"]["latitude"], 51.1);

    let parsed: NoteDraft = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, draft);
}

#[test]
fn theme_preference_uses_snake_case_tags() {
    assert_eq!(
        serde_json::to_string(&ThemePreference::System).unwrap(),
        "\"system\""
    );
    let parsed: ThemePreference = serde_json::from_str("\"dark\"").unwrap();
    assert_eq!(parsed, ThemePreference::Dark);
}

#[test]
fn app_config_fills_missing_fields_with_defaults() {
    let parsed: AppConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(parsed, AppConfig::default());

    let parsed: AppConfig = serde_json::from_str("{\"theme\":\"light\"}").unwrap();
    assert_eq!(parsed.theme, ThemePreference::Light);
    assert!(!parsed.log_level.is_empty());
}

//! Merged router document tests

use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchboard_core::backend::{ActivationBackend, EnvBackend, JsonFileBackend, MemoryEnvStore};
use switchboard_core::{
    ActivationEngine, MergeSelection, MergeWriter, ProfileRecord, ProfileStore, SwitchError,
    ToolFamily,
};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    engine: ActivationEngine,
    router_path: PathBuf,
}

fn harness() -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let router_path = dir.path().join("router.json");

    let store =
        ProfileStore::open(dir.path().join("profiles.json")).expect("Failed to open store");
    let backends: Vec<Box<dyn ActivationBackend>> = vec![
        Box::new(EnvBackend::new(Arc::new(MemoryEnvStore::new()))),
        Box::new(JsonFileBackend::new(
            ToolFamily::Codex,
            dir.path().join("codex").join("auth.json"),
        )),
        Box::new(JsonFileBackend::new(
            ToolFamily::Gemini,
            dir.path().join("gemini").join("credentials.json"),
        )),
    ];
    let engine = ActivationEngine::new(store, backends, MergeWriter::new(router_path.clone()))
        .expect("Failed to build engine");

    Harness {
        _dir: dir,
        engine,
        router_path,
    }
}

fn add(
    engine: &ActivationEngine,
    name: &str,
    family: ToolFamily,
    secret: &str,
    endpoint: Option<&str>,
) -> ProfileRecord {
    engine
        .add_profile(name, family, secret.to_string(), endpoint.map(String::from))
        .expect("Failed to add profile")
}

fn read_doc(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("Failed to read router config");
    serde_json::from_str(&content).expect("Failed to parse router config")
}

#[test]
fn test_merge_writes_only_selected_sections() {
    let h = harness();
    let claude = add(
        &h.engine,
        "claude",
        ToolFamily::Claude,
        "sk-ant",
        Some("https://proxy.example"),
    );
    add(&h.engine, "codex", ToolFamily::Codex, "sk-oa", None);

    let mut selection = MergeSelection::new();
    selection.insert(ToolFamily::Claude, Some(claude.id));
    selection.insert(ToolFamily::Codex, None);
    h.engine
        .apply_merged_config(&selection)
        .expect("Failed to write merged config");

    let doc = read_doc(&h.router_path);
    let section = &doc["claude"];
    assert_eq!(section["ANTHROPIC_AUTH_TOKEN"], "sk-ant");
    assert_eq!(section["ANTHROPIC_BASE_URL"], "https://proxy.example");

    // Families selected as None (or not at all) get no section, not an
    // empty placeholder.
    assert!(doc.get("codex").is_none());
    assert!(doc.get("gemini").is_none());
}

#[test]
fn test_merge_omits_endpoint_key_when_unset() {
    let h = harness();
    let codex = add(&h.engine, "codex", ToolFamily::Codex, "sk-oa", None);

    let mut selection = MergeSelection::new();
    selection.insert(ToolFamily::Codex, Some(codex.id));
    h.engine
        .apply_merged_config(&selection)
        .expect("Failed to write merged config");

    let doc = read_doc(&h.router_path);
    assert_eq!(doc["codex"]["OPENAI_API_KEY"], "sk-oa");
    assert!(doc["codex"].get("OPENAI_BASE_URL").is_none());
}

#[test]
fn test_merge_rejects_empty_selection() {
    let h = harness();

    let err = h.engine.apply_merged_config(&MergeSelection::new()).unwrap_err();
    assert!(matches!(err, SwitchError::Validation(_)));

    let mut all_none = MergeSelection::new();
    for family in ToolFamily::ALL {
        all_none.insert(family, None);
    }
    let err = h.engine.apply_merged_config(&all_none).unwrap_err();
    assert!(matches!(err, SwitchError::Validation(_)));

    assert!(!h.router_path.exists());
}

#[test]
fn test_merge_rejects_unknown_id() {
    let h = harness();

    let mut selection = MergeSelection::new();
    selection.insert(ToolFamily::Claude, Some(uuid::Uuid::new_v4()));
    let err = h.engine.apply_merged_config(&selection).unwrap_err();

    assert!(matches!(err, SwitchError::NotFound(_)));
    assert!(!h.router_path.exists());
}

#[test]
fn test_merge_rejects_family_mismatch() {
    let h = harness();
    let codex = add(&h.engine, "codex", ToolFamily::Codex, "sk-oa", None);

    let mut selection = MergeSelection::new();
    selection.insert(ToolFamily::Claude, Some(codex.id));
    let err = h.engine.apply_merged_config(&selection).unwrap_err();

    assert!(matches!(err, SwitchError::Validation(_)));
}

#[test]
fn test_merge_is_independent_of_activation_state() {
    let h = harness();
    let live = add(&h.engine, "live", ToolFamily::Codex, "sk-live", None);
    let spare = add(&h.engine, "spare", ToolFamily::Codex, "sk-spare", None);
    h.engine.activate_profile(live.id).expect("Failed to activate");

    // A profile can be merged without being the family's activated one.
    let mut selection = MergeSelection::new();
    selection.insert(ToolFamily::Codex, Some(spare.id));
    h.engine
        .apply_merged_config(&selection)
        .expect("Failed to write merged config");

    let doc = read_doc(&h.router_path);
    assert_eq!(doc["codex"]["OPENAI_API_KEY"], "sk-spare");

    // Merging never mutates activation state.
    let profiles = h.engine.list_profiles();
    assert!(profiles.iter().find(|r| r.id == live.id).expect("live").active);
    assert!(!profiles.iter().find(|r| r.id == spare.id).expect("spare").active);
}

#[test]
fn test_merge_regenerates_whole_document() {
    let h = harness();
    let claude = add(&h.engine, "claude", ToolFamily::Claude, "sk-ant", None);
    let codex = add(&h.engine, "codex", ToolFamily::Codex, "sk-oa", None);

    let mut both = MergeSelection::new();
    both.insert(ToolFamily::Claude, Some(claude.id));
    both.insert(ToolFamily::Codex, Some(codex.id));
    h.engine
        .apply_merged_config(&both)
        .expect("Failed to write merged config");

    let mut codex_only = MergeSelection::new();
    codex_only.insert(ToolFamily::Codex, Some(codex.id));
    h.engine
        .apply_merged_config(&codex_only)
        .expect("Failed to rewrite merged config");

    // Regenerated, not patched: the claude section is gone.
    let doc = read_doc(&h.router_path);
    assert!(doc.get("claude").is_none());
    assert_eq!(doc["codex"]["OPENAI_API_KEY"], "sk-oa");
}

//! Session recovery across simulated page reloads

use std::sync::Arc;

use klangkiste_console::models::{UidMode, WizardStep};
use klangkiste_console::session::{
    MemorySessionStore, SessionRecovery, SessionStore, SqliteSessionStore,
};
use klangkiste_console::WizardSession;

fn in_progress_session(key: &str) -> WizardSession {
    let mut session = WizardSession::new(
        key,
        "ab12cd34ef",
        Some("ab12cd34ef".to_string()),
        UidMode::Keep,
        "A1:B2:C3:D4:E5:F6:07",
        false,
        false,
        None,
    );
    session.set_label("Gute-Nacht-Geschichten");
    session.advance().expect("identifiers");
    session.choose_media(Some("audiobooks/grimm".to_string()));
    session
}

#[tokio::test]
async fn sqlite_store_round_trips_a_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("sessions.db");
    let store = SqliteSessionStore::connect(&db_path).await.expect("connect");

    let key = "1700000000000|ab12cd34ef|A1:B2:C3:D4:E5:F6:07";
    let session = in_progress_session(key);
    store.save(&session).await.expect("save");

    let restored = store.load(key).await.expect("load").expect("present");
    assert_eq!(restored.step, WizardStep::Media);
    assert!(restored.identifiers_done);
    assert_eq!(restored.label, "Gute-Nacht-Geschichten");
    assert_eq!(restored.chosen_media(), Some("audiobooks/grimm"));
    assert_eq!(restored.uid_mode, UidMode::Keep);
}

#[tokio::test]
async fn reload_resumes_at_the_persisted_step_with_working_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("sessions.db");
    let key = "1700000000000|ab12cd34ef|A1:B2:C3:D4:E5:F6:07";

    {
        // First page load: operator makes progress, every change persisted
        let store = SqliteSessionStore::connect(&db_path).await.expect("connect");
        let mut session = in_progress_session(key);
        store.save(&session).await.expect("save");
        session.advance().expect("media");
        store.save(&session).await.expect("save after advance");
    }

    // Reload: a fresh pool over the same file, fresh recovery state
    let store: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::connect(&db_path)
            .await
            .expect("reconnect"),
    );
    let mut recovery = SessionRecovery::new();
    let restored = recovery
        .restore_once(&store, key)
        .await
        .expect("restore")
        .expect("session survives the reload");

    assert_eq!(restored.key, key);
    assert_eq!(restored.step, WizardStep::Confirm);
    assert!(restored.identifiers_done);
    assert!(restored.media_done);
    assert_eq!(restored.uid, "ab12cd34ef");
    assert_eq!(restored.label, "Gute-Nacht-Geschichten");
    assert_eq!(restored.chosen_media(), Some("audiobooks/grimm"));
    assert!(restored.ready_to_commit());
}

#[tokio::test]
async fn save_is_an_upsert_keyed_by_scan_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteSessionStore::connect(&dir.path().join("sessions.db"))
        .await
        .expect("connect");

    let key = "1|ab12cd34ef|hw";
    let mut session = in_progress_session(key);
    store.save(&session).await.expect("save");

    session.set_label("Umbenannt");
    store.save(&session).await.expect("second save replaces");

    let restored = store.load(key).await.expect("load").expect("present");
    assert_eq!(restored.label, "Umbenannt");
}

#[tokio::test]
async fn clear_removes_only_the_given_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteSessionStore::connect(&dir.path().join("sessions.db"))
        .await
        .expect("connect");

    store
        .save(&in_progress_session("touch-a"))
        .await
        .expect("save a");
    store
        .save(&in_progress_session("touch-b"))
        .await
        .expect("save b");

    store.clear("touch-a").await.expect("clear");
    assert!(store.load("touch-a").await.expect("load").is_none());
    assert!(store.load("touch-b").await.expect("load").is_some());
}

#[tokio::test]
async fn memory_and_sqlite_stores_agree_on_recovery_semantics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sqlite: Arc<dyn SessionStore> = Arc::new(
        SqliteSessionStore::connect(&dir.path().join("sessions.db"))
            .await
            .expect("connect"),
    );
    let memory: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

    for store in [&sqlite, &memory] {
        store
            .save(&in_progress_session("stale-touch"))
            .await
            .expect("save");

        let mut recovery = SessionRecovery::new();
        // A different key never restores the stale session
        assert!(recovery
            .restore_once(store, "fresh-touch")
            .await
            .expect("restore")
            .is_none());
        // The stale session is ignored, not purged
        assert!(store.load("stale-touch").await.expect("load").is_some());
        // The matching key restores exactly once
        assert!(recovery
            .restore_once(store, "stale-touch")
            .await
            .expect("restore")
            .is_some());
        assert!(recovery
            .restore_once(store, "stale-touch")
            .await
            .expect("restore")
            .is_none());
    }
}

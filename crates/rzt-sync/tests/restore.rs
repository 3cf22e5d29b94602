use std::sync::Arc;

use chrono::{Duration, Utc};

use rzt_backup::ExportBuilder;
use rzt_store::{CatalogStore, InMemoryCatalogStore};
use rzt_sync::{
    BackupSource, CloudRestorer, InMemoryBackupSource, MemoryLedger, RestoreLedger,
    RestoreOutcome, SkipReason, SyncConfig, SyncError,
};
use rzt_types::{Color, Tissue};
use rzt_worker::BackupClient;

fn tissue(sku: &str) -> Tissue {
    Tissue {
        id: String::new(),
        name: "Linho".into(),
        width: 140.0,
        composition: "Linho".into(),
        sku: sku.into(),
        color: None,
        created_at: None,
    }
}

fn color(sku: &str) -> Color {
    Color {
        id: String::new(),
        name: "Azul".into(),
        hex: Some("#1f4e9c".into()),
        lab_l: None,
        lab_a: None,
        lab_b: None,
        sku: sku.into(),
        created_at: None,
    }
}

fn cloud_export() -> String {
    let store = InMemoryCatalogStore::new();
    store.insert_tissue(tissue("T100")).unwrap();
    store.insert_tissue(tissue("T101")).unwrap();
    store.insert_color(color("AZ001")).unwrap();
    ExportBuilder::new()
        .build_from_store(&store)
        .unwrap()
        .to_json()
        .unwrap()
}

struct Fixture {
    source: Arc<InMemoryBackupSource>,
    ledger: Arc<MemoryLedger>,
    store: Arc<InMemoryCatalogStore>,
    restorer: CloudRestorer,
}

fn fixture(ledger: MemoryLedger) -> Fixture {
    let source = Arc::new(InMemoryBackupSource::new());
    let ledger = Arc::new(ledger);
    let store = Arc::new(InMemoryCatalogStore::new());
    let client = BackupClient::spawn(store.clone(), None).unwrap();
    let restorer = CloudRestorer::new(source.clone(), ledger.clone(), store.clone(), client);
    Fixture {
        source,
        ledger,
        store,
        restorer,
    }
}

#[tokio::test]
async fn auto_import_needs_a_manifest() {
    let mut fx = fixture(MemoryLedger::new());
    let outcome = fx.restorer.auto_import_if_needed().await.unwrap();
    assert_eq!(outcome, RestoreOutcome::Skipped(SkipReason::NoManifest));
}

#[tokio::test]
async fn auto_import_respects_the_switch() {
    let fx = fixture(MemoryLedger::new());
    fx.source.publish("a.json", &cloud_export(), Utc::now()).unwrap();
    let mut restorer = fx.restorer.with_config(SyncConfig { auto: false });

    let outcome = restorer.auto_import_if_needed().await.unwrap();
    assert_eq!(outcome.reason().as_deref(), Some("auto import disabled"));
    assert!(fx.store.is_empty().unwrap());
}

#[tokio::test]
async fn auto_import_runs_once_per_backup() {
    let mut fx = fixture(MemoryLedger::new());
    fx.source
        .publish("a.json", &cloud_export(), Utc::now() - Duration::minutes(5))
        .unwrap();

    let first = fx.restorer.auto_import_if_needed().await.unwrap();
    assert!(first.performed(), "{first:?}");
    assert_eq!(first.imported(), 3);
    assert_eq!(fx.store.list_tissues().unwrap().len(), 2);
    assert!(fx.ledger.last_import().await.unwrap().is_some());

    let second = fx.restorer.auto_import_if_needed().await.unwrap();
    assert_eq!(second, RestoreOutcome::Skipped(SkipReason::NoNewerBackup));
}

#[tokio::test]
async fn stale_manifest_is_skipped() {
    let mut fx = fixture(MemoryLedger::starting_at(Utc::now()));
    fx.source
        .publish("old.json", &cloud_export(), Utc::now() - Duration::days(1))
        .unwrap();

    let outcome = fx.restorer.auto_import_if_needed().await.unwrap();
    assert_eq!(outcome, RestoreOutcome::Skipped(SkipReason::NoNewerBackup));
    assert!(fx.store.is_empty().unwrap());
}

#[tokio::test]
async fn diverging_manifest_rejects_the_backup() {
    let mut fx = fixture(MemoryLedger::new());
    let mut manifest = fx.source.publish("a.json", &cloud_export(), Utc::now()).unwrap();
    manifest.hash = "deadbeef".repeat(8);
    fx.source.set_manifest(Some(manifest)).unwrap();

    let outcome = fx.restorer.auto_import_if_needed().await.unwrap();
    match outcome {
        RestoreOutcome::Rejected(reason) => assert!(reason.contains("manifest divergence"), "{reason}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(fx.store.is_empty().unwrap());
    assert_eq!(fx.ledger.last_import().await.unwrap(), None);
}

#[tokio::test]
async fn tampered_latest_is_rejected() {
    let mut fx = fixture(MemoryLedger::new());
    let json = cloud_export();
    fx.source.publish("a.json", &json, Utc::now()).unwrap();
    fx.source
        .set_latest(Some(json.replace("\"Azul\"", "\"Vermelho\"")))
        .unwrap();

    let outcome = fx.restorer.manual_restore_latest().await.unwrap();
    match outcome {
        RestoreOutcome::Rejected(reason) => assert!(reason.contains("tampered"), "{reason}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn manual_restore_ignores_the_ledger() {
    let mut fx = fixture(MemoryLedger::starting_at(Utc::now() + Duration::days(1)));
    fx.source.publish("a.json", &cloud_export(), Utc::now()).unwrap();

    let outcome = fx.restorer.manual_restore_latest().await.unwrap();
    assert!(outcome.performed(), "{outcome:?}");
}

#[tokio::test]
async fn manual_restore_without_backup_is_skipped() {
    let mut fx = fixture(MemoryLedger::new());
    let outcome = fx.restorer.manual_restore_latest().await.unwrap();
    assert_eq!(outcome, RestoreOutcome::Skipped(SkipReason::NoBackup));
}

#[tokio::test]
async fn named_restore_checks_the_stamp() {
    let mut fx = fixture(MemoryLedger::new());
    fx.source.publish("a.json", &cloud_export(), Utc::now()).unwrap();

    let listed = fx.restorer.list_backups().await.unwrap();
    assert_eq!(listed.len(), 1);

    let outcome = fx.restorer.restore_named(&listed[0].name).await.unwrap();
    assert!(outcome.performed(), "{outcome:?}");

    let err = fx.restorer.restore_named("missing.json").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(name) if name == "missing.json"));
}

#[tokio::test]
async fn bootstrap_imports_into_an_empty_catalog_whatever_the_ledger() {
    let mut fx = fixture(MemoryLedger::starting_at(Utc::now() + Duration::days(1)));
    fx.source.publish("a.json", &cloud_export(), Utc::now()).unwrap();

    let outcome = fx.restorer.bootstrap_if_empty().await.unwrap();
    assert!(outcome.performed(), "{outcome:?}");

    // populated now, so the auto rule applies and the ledger says up to date
    let again = fx.restorer.bootstrap_if_empty().await.unwrap();
    assert_eq!(again, RestoreOutcome::Skipped(SkipReason::NoNewerBackup));
}

#[tokio::test]
async fn source_trait_objects_are_shareable() {
    let source: Arc<dyn BackupSource> = Arc::new(InMemoryBackupSource::new());
    assert!(source.list_backups().await.unwrap().is_empty());
}

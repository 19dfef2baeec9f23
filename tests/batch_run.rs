use quality_report::models::load_dataset;
use quality_report::services::{MailTransport, MemoryMailer};
use quality_report::{logger, App, Config};
use std::path::Path;
use std::sync::Arc;
use tokio_test::assert_ok;

const DATASET: &str = r#"
[[clients]]
id = 1
username = "jperez"
first_name = "Juan"
last_name = "Pérez"
email = "juan@example.com"
cedula = "CED123"

[[clients]]
id = 2
username = "mlopez"
email = "maria@example.com"

[[batches]]
id = 1
client_id = 1
lot_code = "L-001"
grain_type = "cafe"
processed_on = "2026-10-01"
quantity_kg = "1500.00"
humidity = "10.00"
impurities = "5.00"
good_grain = "80.00"
defective_grain = "5.00"
created_at = "2026-10-01T08:00:00Z"

[[batches]]
id = 2
client_id = 2
lot_code = "L-002"
grain_type = "maiz"
processed_on = "2026-10-02"
quantity_kg = "800.00"
humidity = "12.00"
impurities = "3.00"
created_at = "2026-10-02T08:00:00Z"

[[batches]]
id = 3
client_id = 1
lot_code = "L-003"
grain_type = "arroz"
processed_on = "2026-09-15"
quantity_kg = "200.00"
humidity = "14.00"
impurities = "1.00"
delivered = true
created_at = "2026-09-15T08:00:00Z"
"#;

fn config(dir: &Path, backend: &str) -> Config {
    let dataset = dir.join("lotes.toml");
    std::fs::write(&dataset, DATASET).unwrap();
    Config {
        dataset_file: dataset.to_string_lossy().to_string(),
        output_log_file: dir.join("output.txt").to_string_lossy().to_string(),
        mail_backend: backend.to_string(),
        mail_spool_dir: dir.join("outbox").to_string_lossy().to_string(),
        max_concurrent_dispatches: 2,
        ..Config::default()
    }
}

#[tokio::test]
async fn run_sends_pending_batches_and_persists_flags() {
    logger::init();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "memory");
    let mailer = Arc::new(MemoryMailer::new());
    let transport: Arc<dyn MailTransport> = mailer.clone();

    let app = App::initialize_with_transport(config.clone(), transport)
        .await
        .unwrap();
    let summary = assert_ok!(app.run().await);

    // L-003 已投递，不再处理；L-002 的客户没有证件号
    assert_eq!(summary.success, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total(), 2);

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachment_name, "informe_L-001.pdf");

    let reloaded = load_dataset(Path::new(&config.dataset_file)).await.unwrap();
    let flag = |code: &str| {
        reloaded
            .batches
            .iter()
            .find(|b| b.lot_code == code)
            .map(|b| b.delivered)
            .unwrap()
    };
    assert!(flag("L-001"));
    assert!(!flag("L-002"));
    assert!(flag("L-003"));

    let log = std::fs::read_to_string(&config.output_log_file).unwrap();
    assert!(log.contains("L-001 -> juan@example.com"));
    assert!(log.contains("L-002 omitido"));
}

#[tokio::test]
async fn file_backend_writes_eml_to_spool() {
    logger::init();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "file");

    let summary = App::initialize(config.clone())
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.success, 1);

    let emls = std::fs::read_dir(&config.mail_spool_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("eml"))
        .count();
    assert_eq!(emls, 1);
}

#[tokio::test]
async fn unknown_backend_and_missing_dataset_fail_initialization() {
    let dir = tempfile::tempdir().unwrap();

    let bad_backend = config(dir.path(), "pigeon");
    assert!(App::initialize(bad_backend).await.is_err());

    let duplicated = config(dir.path(), "memory");
    let twice = DATASET.replace("lot_code = \"L-002\"", "lot_code = \"L-001\"");
    std::fs::write(&duplicated.dataset_file, twice).unwrap();
    let err = App::initialize(duplicated).await.err().unwrap();
    assert!(format!("{:#}", err).contains("L-001"));

    let mut missing = config(dir.path(), "memory");
    missing.dataset_file = dir.path().join("nope.toml").to_string_lossy().to_string();
    assert!(App::initialize(missing).await.is_err());
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use std::time::Duration;

use selfup_core::{
    AutoUpdater, ChannelListener, Installer, UpdateEvent, UpdatePhase, UpdaterConfig,
    VersionEntry,
};
use selfup_platform::TargetOs;

const MANIFEST: &str = "https://raw.githubusercontent.com/acme/viewer/main/update.json";

fn updater(app_name: &str) -> (AutoUpdater, tokio::sync::mpsc::UnboundedReceiver<UpdateEvent>) {
    let (listener, events) = ChannelListener::new();
    let config = UpdaterConfig::new(MANIFEST, "2023.01.01").with_app_name(app_name);
    let updater = AutoUpdater::new(config, Arc::new(listener)).expect("config should be valid");
    (updater, events)
}

fn drain(events: &mut tokio::sync::mpsc::UnboundedReceiver<UpdateEvent>) -> Vec<UpdateEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

#[tokio::test]
async fn insecure_download_url_is_rejected_before_any_transfer() {
    let (updater, mut events) = updater("selfup-flow-insecure");
    let quits = Arc::new(AtomicUsize::new(0));
    let quits_for_hook = Arc::clone(&quits);
    let updater = updater.with_quit_hook(Arc::new(move || {
        quits_for_hook.fetch_add(1, Ordering::SeqCst);
    }));

    updater
        .download_and_install_update("http://downloads.example/viewer.AppImage")
        .await;

    assert_eq!(
        drain(&mut events),
        vec![UpdateEvent::Error("Network request rejected".to_string())]
    );
    assert_eq!(updater.phase(), UpdatePhase::DownloadError);
    assert_eq!(quits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_download_closes_the_session() {
    let (updater, mut events) = updater("selfup-flow-retry");

    updater.download_and_install_update("not a url").await;
    updater.download_and_install_update("ftp://mirror.example/viewer").await;

    let received = drain(&mut events);
    assert_eq!(received.len(), 2);
    assert!(
        received
            .iter()
            .all(|event| matches!(event, UpdateEvent::Error(message) if message == "Network request rejected"))
    );
}

#[tokio::test]
async fn temp_file_is_named_after_the_application() {
    let (updater, _events) = updater("selfup-flow-tempfile");

    updater
        .download_and_install_update("http://downloads.example/viewer")
        .await;

    let expected = selfup_platform::update_download_path("selfup-flow-tempfile");
    assert!(expected.exists(), "session should have created {}", expected.display());
    let _ = std::fs::remove_file(expected);
}

fn counting_quits(updater: AutoUpdater) -> (AutoUpdater, Arc<AtomicUsize>) {
    let quits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&quits);
    let updater = updater.with_quit_hook(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    (updater, quits)
}

fn launch_failure_events() -> Vec<UpdateEvent> {
    vec![
        UpdateEvent::Progress(100.0),
        UpdateEvent::DownloadFinished,
        UpdateEvent::Error("Failed to launch the downloaded update.".to_string()),
    ]
}

#[tokio::test]
async fn handler_open_failure_reports_then_quits() {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let package = temp.path().join("viewer.zip");
    std::fs::write(&package, b"archive").expect("fixture should be written");
    let (updater, mut events) = updater("selfup-flow-handler");
    let (updater, quits) = counting_quits(updater.with_installer(Installer::HandlerOpen));

    updater.complete_download(&package).await;

    assert_eq!(drain(&mut events), launch_failure_events());
    assert_eq!(updater.phase(), UpdatePhase::InstallError);
    assert_eq!(quits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn other_installers_stay_open_after_a_failure() {
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let package = temp.path().join("viewer.zip");
    std::fs::write(&package, b"archive").expect("fixture should be written");
    let installers = [
        Installer::MountAndCopy {
            mount_timeout: Duration::from_secs(1),
        },
        Installer::PortableReplace,
    ];

    for installer in installers {
        let (updater, mut events) = updater("selfup-flow-stay-open");
        let (updater, quits) = counting_quits(updater.with_installer(installer));

        updater.complete_download(&package).await;

        assert_eq!(drain(&mut events), launch_failure_events(), "{installer:?}");
        assert_eq!(updater.phase(), UpdatePhase::InstallError);
        assert_eq!(quits.load(Ordering::SeqCst), 0, "{installer:?}");
    }
}

#[test]
fn empty_manifest_body_reports_no_data() {
    let (updater, mut events) = updater("selfup-flow-empty");

    updater.report_manifest(b"");

    assert_eq!(
        drain(&mut events),
        vec![UpdateEvent::Error("No data downloaded.".to_string())]
    );
    assert_eq!(updater.phase(), UpdatePhase::CheckError);
}

#[test]
fn manifest_without_this_platform_reports_empty_changelog() {
    let (updater, mut events) = updater("selfup-flow-other-os");

    updater.report_manifest(br#"{ "Plan9": { "version": "2030.01.01", "url": "https://x/y" } }"#);

    assert_eq!(drain(&mut events), vec![UpdateEvent::Available(Vec::new())]);
    assert_eq!(updater.phase(), UpdatePhase::NoUpdate);
}

#[test]
fn newer_build_for_this_platform_is_offered() {
    let (updater, mut events) = updater("selfup-flow-newer");
    let body = format!(
        r#"{{ "{}": {{ "version": "2023.02.15", "url": "https://github.com/acme/viewer/releases/download/viewer", "changelog": "Faster startup\nFixed crash" }} }}"#,
        TargetOs::current().manifest_key()
    );

    updater.report_manifest(body.as_bytes());

    assert_eq!(
        drain(&mut events),
        vec![UpdateEvent::Available(vec![VersionEntry {
            version: "2023.02.15".to_string(),
            changes: "<br />Faster startup<br />Fixed crash".to_string(),
            update_url: "https://github.com/acme/viewer/releases/download/viewer".to_string(),
        }])]
    );
    assert_eq!(updater.phase(), UpdatePhase::UpdateAvailable);
}

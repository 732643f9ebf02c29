//! Detection against a real container
//!
//! Needs a reachable Docker daemon; run with `cargo test -- --ignored`.

use serial_test::serial;
use stackscout::detection::{Axis, FrameworkDetector, IndicatorTable};
use stackscout::provider::{ContainerProvider, DockerProvider};
use stackscout::{DetectionError, FrameworkId, LanguageId};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{GenericImage, ImageExt};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn test_detect_flask_container() {
    let container = GenericImage::new("python", "3.12-alpine")
        .with_exposed_port(5000.tcp())
        .with_wait_for(WaitFor::message_on_stdout("ready"))
        .with_env_var("FLASK_APP", "app.py")
        .with_cmd([
            "sh",
            "-c",
            "printf 'flask==3.0.0\\ngunicorn\\n' > /requirements.txt && echo ready && sleep 600",
        ])
        .start()
        .await
        .expect("Failed to start python container");

    let provider = DockerProvider::connect(PROBE_TIMEOUT).expect("Failed to connect to Docker");
    let detector = FrameworkDetector::new(Arc::new(provider), IndicatorTable::builtin());

    let result = detector
        .detect(container.id())
        .await
        .expect("Detection failed");

    assert_eq!(result.framework(), FrameworkId::Flask);
    assert_eq!(result.language(), LanguageId::Python);
    assert_eq!(result.version(), Some("3.0.0"));
    assert!((result.confidence() - 0.48).abs() < 1e-9);
    for axis in Axis::ALL {
        assert!(result.metadata().evidence(axis).contains(FrameworkId::Flask));
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn test_missing_container_is_not_found() {
    let provider = DockerProvider::connect(PROBE_TIMEOUT).expect("Failed to connect to Docker");
    let detector = FrameworkDetector::new(Arc::new(provider), IndicatorTable::builtin());

    let reference = "stackscout-no-such-container";
    assert_eq!(
        detector.detect(reference).await,
        Err(DetectionError::ContainerNotFound(reference.to_string()))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn test_file_probes_in_container() {
    let container = GenericImage::new("alpine", "3.19")
        .with_wait_for(WaitFor::message_on_stdout("ready"))
        .with_cmd([
            "sh",
            "-c",
            "echo 'module shop' > /go.mod && echo ready && sleep 600",
        ])
        .start()
        .await
        .expect("Failed to start alpine container");

    let provider = DockerProvider::connect(PROBE_TIMEOUT).expect("Failed to connect to Docker");
    let handle = provider
        .resolve(container.id())
        .await
        .expect("Failed to resolve container");

    assert!(provider.file_exists(&handle, "/go.mod").await.unwrap());
    assert!(!provider.file_exists(&handle, "/pom.xml").await.unwrap());
    assert_eq!(
        provider.read_file(&handle, "/go.mod").await.unwrap(),
        b"module shop\n".to_vec()
    );
    assert!(provider.read_file(&handle, "/pom.xml").await.is_err());
    assert!(provider
        .list_running()
        .await
        .unwrap()
        .contains(&handle.id));
}

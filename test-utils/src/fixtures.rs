//! Pods and images used across the lifecycle tests.

use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use vicklet::images::ImageConfig;

pub const NAMESPACE: &str = "default";
pub const POD_NAME: &str = "busybox-sleep";

pub fn container(name: &str, image: &str, command: &[&str]) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: (!command.is_empty()).then(|| command.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

pub fn pod(name: &str, containers: Vec<Container>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// busybox running `/bin/sleep 2m` next to an alpine container with no command.
pub fn two_container_pod() -> Pod {
    pod(
        POD_NAME,
        vec![
            container("busybox", "busybox", &["/bin/sleep", "2m"]),
            container("alpine", "alpine", &[]),
        ],
    )
}

pub fn image(name: &str) -> ImageConfig {
    ImageConfig {
        id: format!("{}-id", name),
        layer_id: format!("{}-layer", name),
        name: name.to_string(),
        tags: vec!["latest".to_string()],
        cmd: vec!["/bin/sh".to_string()],
        entrypoint: Vec::new(),
        env: vec!["PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string()],
        user: String::new(),
        working_dir: String::new(),
    }
}

//! Translation of a Kubernetes container plus its image config into the
//! per-container VM configuration.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Pod};
use vicklet_shared::errors::VickletResult;

use super::resources;
use crate::images::ImageConfig;
use crate::proxy::{IsolationContainerConfig, PortBinding};
use crate::runtime::constants::{container_env, network};

/// Build the VM configuration for `container` running `image` inside `pod`.
pub fn isolation_config(
    pod: &Pod,
    container: &Container,
    image: &ImageConfig,
) -> VickletResult<IsolationContainerConfig> {
    let (entrypoint, cmd) = command_line(container, image);

    let working_dir = container
        .working_dir
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| image.working_dir.clone());

    Ok(IsolationContainerConfig {
        name: container.name.clone(),
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        image_name: container.image.clone().unwrap_or_default(),
        image_id: Some(image.id.clone()),
        layer_id: Some(image.layer_id.clone()),
        cmd,
        entrypoint,
        working_dir,
        env: merged_env(container, image),
        user: user(container, image),
        stop_signal: String::new(),
        tty: container.tty.unwrap_or(false),
        open_stdin: container.stdin.unwrap_or(false),
        stdin_once: container.stdin_once.unwrap_or(false),
        attach: true,
        cpu_count: resources::cpu_count(container)?,
        memory_mib: resources::memory_mib(container)?,
        port_map: port_map(container),
    })
}

/// Resolve `(entrypoint, cmd)`.
///
/// A container `command` replaces the image entrypoint entirely and is
/// followed by the container `args`. Without a command the image entrypoint
/// stays and `args` (if any) replace the image cmd.
fn command_line(container: &Container, image: &ImageConfig) -> (Option<Vec<String>>, Vec<String>) {
    let command = container.command.clone().unwrap_or_default();
    let args = container.args.clone().unwrap_or_default();

    if !command.is_empty() {
        let mut cmd = command;
        cmd.extend(args);
        return (None, cmd);
    }

    let entrypoint = (!image.entrypoint.is_empty()).then(|| image.entrypoint.clone());
    let cmd = if args.is_empty() {
        image.cmd.clone()
    } else {
        args
    };
    (entrypoint, cmd)
}

fn user(container: &Container, image: &ImageConfig) -> String {
    container
        .security_context
        .as_ref()
        .and_then(|sc| sc.run_as_user)
        .map(|uid| uid.to_string())
        .unwrap_or_else(|| image.user.clone())
}

fn env_key(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(k, _)| k)
}

/// Container env first, then PATH and TERM defaults, then any image
/// variable the container did not set.
fn merged_env(container: &Container, image: &ImageConfig) -> Vec<String> {
    let mut env: Vec<String> = container
        .env
        .iter()
        .flatten()
        .filter_map(|var| var.value.as_ref().map(|v| format!("{}={}", var.name, v)))
        .collect();

    let has = |env: &[String], key: &str| env.iter().any(|e| env_key(e) == key);

    if !has(&env, "PATH") {
        let path = image
            .env
            .iter()
            .find(|e| env_key(e) == "PATH")
            .cloned()
            .unwrap_or_else(|| format!("PATH={}", container_env::DEFAULT_PATH));
        env.push(path);
    }

    if container.tty.unwrap_or(false) && !has(&env, "TERM") {
        env.push(format!("TERM={}", container_env::DEFAULT_TERM));
    }

    for entry in &image.env {
        if !has(&env, env_key(entry)) {
            env.push(entry.clone());
        }
    }

    env
}

fn port_map(container: &Container) -> BTreeMap<String, PortBinding> {
    container
        .ports
        .iter()
        .flatten()
        .map(|port| {
            let protocol = port
                .protocol
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(network::DEFAULT_PROTOCOL)
                .to_lowercase();
            let host_port = port.host_port.unwrap_or(port.container_port);
            (
                format!("{}/{}", port.container_port, protocol),
                PortBinding {
                    host_ip: port.host_ip.clone().unwrap_or_default(),
                    host_port: host_port.to_string(),
                },
            )
        })
        .collect()
}

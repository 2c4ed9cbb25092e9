//! Per-container VM configuration and its translation into portlayer
//! task and network requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vicklet_shared::errors::{VickletError, VickletResult};

use crate::runtime::constants::network;

/// Host side of a published container port.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

/// Everything the backend needs to run one container of a pod.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationContainerConfig {
    pub name: String,
    pub namespace: String,
    pub image_name: String,
    pub image_id: Option<String>,
    pub layer_id: Option<String>,

    pub cmd: Vec<String>,
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: String,
    pub env: Vec<String>,
    pub user: String,
    pub stop_signal: String,

    pub tty: bool,
    pub open_stdin: bool,
    pub stdin_once: bool,
    pub attach: bool,

    /// Whole vCPUs.
    pub cpu_count: i64,
    /// MiB, at least 512 and a multiple of 128.
    pub memory_mib: i64,

    /// Keyed by `"<port>/<proto>"`.
    pub port_map: BTreeMap<String, PortBinding>,
}

/// Body of the task join request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJoinConfig {
    pub handle: String,
    pub id: String,
    /// Filesystem namespace (layer id) the task runs in.
    pub namespace: String,
    pub path: String,
    pub args: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub user: String,
    pub attach: bool,
    pub open_stdin: bool,
    pub tty: bool,
    pub stop_signal: String,
}

impl TaskJoinConfig {
    /// Build the task for `config`.
    ///
    /// With an entrypoint the task runs `entrypoint[0]` with the rest of the
    /// entrypoint followed by `cmd`; otherwise it runs `cmd[0]` with the rest
    /// of `cmd`. Attach is always requested so the task stays attachable.
    pub fn from_isolation_config(
        handle: &str,
        id: &str,
        layer_id: &str,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Self> {
        let (path, args) = match config.entrypoint.as_deref() {
            Some([path, rest @ ..]) => {
                let mut args = rest.to_vec();
                args.extend(config.cmd.iter().cloned());
                (path.clone(), args)
            }
            _ => match config.cmd.as_slice() {
                [path, rest @ ..] => (path.clone(), rest.to_vec()),
                [] => {
                    return Err(VickletError::BadRequest(format!(
                        "no command specified for container {}",
                        config.name
                    )));
                }
            },
        };

        Ok(Self {
            handle: handle.to_string(),
            id: id.to_string(),
            namespace: layer_id.to_string(),
            path,
            args,
            env: config.env.clone(),
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            attach: true,
            open_stdin: config.open_stdin,
            tty: config.tty,
            stop_signal: config.stop_signal.clone(),
        })
    }
}

/// Scope membership requested by AddHandleToScope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub network_name: String,
    /// `"<hostPort>:<port>/<proto>"` entries.
    pub ports: Vec<String>,
}

impl NetworkConfig {
    pub fn from_isolation_config(config: &IsolationContainerConfig) -> Self {
        Self {
            network_name: network::DEFAULT_SCOPE.to_string(),
            ports: config
                .port_map
                .iter()
                .map(|(port, binding)| format!("{}:{}", binding.host_port, port))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cmd: &[&str], entrypoint: Option<&[&str]>) -> IsolationContainerConfig {
        IsolationContainerConfig {
            name: "c".into(),
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            entrypoint: entrypoint.map(|e| e.iter().map(|s| s.to_string()).collect()),
            env: vec!["PATH=/bin".into()],
            tty: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_task_from_cmd() {
        let task =
            TaskJoinConfig::from_isolation_config("h", "pod-1", "layer", &config(&["/bin/sleep", "2m"], None))
                .unwrap();
        assert_eq!(task.path, "/bin/sleep");
        assert_eq!(task.args, vec!["2m"]);
        assert_eq!(task.namespace, "layer");
        assert_eq!(task.id, "pod-1");
        assert!(task.attach);
        assert!(task.tty);
    }

    #[test]
    fn test_task_entrypoint_prefixes_cmd() {
        let task = TaskJoinConfig::from_isolation_config(
            "h",
            "t",
            "l",
            &config(&["-c", "echo hi"], Some(&["/bin/sh", "-e"])),
        )
        .unwrap();
        assert_eq!(task.path, "/bin/sh");
        assert_eq!(task.args, vec!["-e", "-c", "echo hi"]);
    }

    #[test]
    fn test_task_empty_entrypoint_falls_back_to_cmd() {
        let task =
            TaskJoinConfig::from_isolation_config("h", "t", "l", &config(&["top"], Some(&[]))).unwrap();
        assert_eq!(task.path, "top");
        assert!(task.args.is_empty());
    }

    #[test]
    fn test_task_without_command_is_bad_request() {
        let err = TaskJoinConfig::from_isolation_config("h", "t", "l", &config(&[], None)).unwrap_err();
        assert!(matches!(err, VickletError::BadRequest(_)));
    }

    #[test]
    fn test_network_config_ports() {
        let mut c = config(&["x"], None);
        c.port_map.insert(
            "80/tcp".into(),
            PortBinding {
                host_ip: String::new(),
                host_port: "8080".into(),
            },
        );
        c.port_map.insert(
            "53/udp".into(),
            PortBinding {
                host_ip: String::new(),
                host_port: "53".into(),
            },
        );

        let net = NetworkConfig::from_isolation_config(&c);
        assert_eq!(net.network_name, "default");
        assert_eq!(net.ports, vec!["53:53/udp", "8080:80/tcp"]);
    }
}

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use k8s_openapi::api::core::v1::Pod;
use vicklet::Provider;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Pod manifest (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Delete the pod after printing its status
    #[arg(long)]
    pub rm: bool,
}

pub async fn execute(args: RunArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let pod = read_pod(&args.file)?;
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let name = pod.metadata.name.clone().unwrap_or_default();

    let provider = global.create_provider().await?;
    tracing::info!(namespace = %namespace, pod = %name, "Running pod from {}", args.file.display());
    provider
        .create_pod(&pod)
        .await
        .with_context(|| format!("failed to create pod {}", name))?;

    let status = match provider.get_pod_status(&namespace, &name).await {
        Ok(status) => status,
        Err(e) => {
            eprintln!("Error reading status of pod '{}': {}", name, e);
            *e.status
        }
    };
    print!("{}", serde_yaml::to_string(&status)?);

    if args.rm {
        tracing::info!(namespace = %namespace, pod = %name, "Removing pod");
        provider
            .delete_pod(&pod)
            .await
            .with_context(|| format!("failed to delete pod {}", name))?;
        println!("{}", name);
    }
    Ok(())
}

fn read_pod(path: &Path) -> anyhow::Result<Pod> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut pod: Pod = serde_yaml::from_str(&raw)
        .with_context(|| format!("{} is not a valid pod manifest", path.display()))?;
    apply_defaults(&mut pod);
    Ok(pod)
}

/// Fill in what the API server would have defaulted: the namespace and
/// each container's pull policy.
fn apply_defaults(pod: &mut Pod) {
    if pod.metadata.namespace.as_deref().is_none_or(str::is_empty) {
        pod.metadata.namespace = Some("default".to_string());
    }

    let Some(spec) = pod.spec.as_mut() else {
        return;
    };
    for container in &mut spec.containers {
        if container.image_pull_policy.is_none() {
            let image = container.image.as_deref().unwrap_or_default();
            container.image_pull_policy = Some(default_pull_policy(image).to_string());
        }
    }
}

/// `Always` for `:latest` or untagged images, otherwise `IfNotPresent`.
fn default_pull_policy(image: &str) -> &'static str {
    let last = image.rsplit('/').next().unwrap_or(image);
    let untagged = !last.contains(':') && !image.contains('@');
    if untagged || image.ends_with(":latest") {
        "Always"
    } else {
        "IfNotPresent"
    }
}

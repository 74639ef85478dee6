use pkg_constants::devpod::PERSISTENCE_VOLUME_NAME;
use pkg_types::devpod::{DevContainer, DevPod};
use pkg_types::pod::{ContainerSpec, PodTemplateSpec};
use pkg_types::volume::{Volume, VolumeMount, VolumeSource};

use super::error::ReplaceError;

/// Apply the dev container overrides of `dev_pod` to `template`.
///
/// Persisted paths are mounted from the claim `claim_name` through a single
/// pod volume. `target` only names the workload in errors.
pub fn apply_dev_containers(
    template: &mut PodTemplateSpec,
    dev_pod: &DevPod,
    claim_name: &str,
    target: &str,
) -> Result<(), ReplaceError> {
    for dev_container in &dev_pod.dev_containers {
        let container = select_container(template, dev_container, target)?;
        apply_overrides(container, dev_container);
    }

    template
        .spec
        .volumes
        .retain(|v| v.name != PERSISTENCE_VOLUME_NAME);
    if dev_pod.has_persist_paths() {
        template.spec.volumes.push(Volume {
            name: PERSISTENCE_VOLUME_NAME.to_string(),
            source: VolumeSource::PersistentVolumeClaim {
                claim_name: claim_name.to_string(),
            },
        });
    }
    Ok(())
}

fn select_container<'a>(
    template: &'a mut PodTemplateSpec,
    dev_container: &DevContainer,
    target: &str,
) -> Result<&'a mut ContainerSpec, ReplaceError> {
    match &dev_container.container {
        Some(name) => template
            .spec
            .containers
            .iter_mut()
            .find(|c| c.name == *name)
            .ok_or_else(|| ReplaceError::ContainerNotFound {
                container: name.clone(),
                target: target.to_string(),
            }),
        None => template
            .spec
            .containers
            .first_mut()
            .ok_or_else(|| ReplaceError::NoContainers {
                target: target.to_string(),
            }),
    }
}

fn apply_overrides(container: &mut ContainerSpec, dev_container: &DevContainer) {
    if let Some(image) = &dev_container.dev_image {
        container.image = image.clone();
    }
    if let Some(command) = &dev_container.command {
        container.command = command.clone();
    }
    if let Some(args) = &dev_container.args {
        container.args = args.clone();
    }
    if let Some(working_dir) = &dev_container.working_dir {
        container.working_dir = Some(working_dir.clone());
    }
    container.env.extend(
        dev_container
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    for persist in &dev_container.persist_paths {
        container.volume_mounts.retain(|m| m.mount_path != persist.path);
        container.volume_mounts.push(VolumeMount {
            name: PERSISTENCE_VOLUME_NAME.to_string(),
            mount_path: persist.path.clone(),
            sub_path: Some(persist.sub_path()),
            read_only: persist.read_only,
        });
    }
}

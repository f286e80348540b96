//! Clean-up of a captured apiserver pod before it is checkpointed.

use k8s_openapi::api::core::v1::Pod;

/// Volumes and mounts whose name contains this are dropped
pub const DEFAULT_VOLUME_MARKER: &str = "default";

/// Command-line flag whose port is rewritten
pub const INSECURE_PORT_FLAG: &str = "insecure-port";

const PRIMARY_INSECURE_PORT: &str = "8080";
const TEMP_INSECURE_PORT: &str = "8081";

/// Prepare a captured primary apiserver pod for use as the temporary one.
///
/// Strips the implicitly mounted default service-account credentials and
/// moves the insecure port off the primary's, so both apiservers can run
/// side by side during the hand-over.
///
/// Idempotent as long as the insecure-port argument holds at most one
/// "8080". Each pass rewrites one occurrence, so `--insecure-port=8080,8080`
/// becomes `8081,8080` and then `8081,8081` on a second pass.
pub fn sanitize(mut pod: Pod) -> Pod {
    strip_default_volumes(&mut pod);
    rewrite_insecure_port(&mut pod);
    pod
}

/// Remove every volume, and every mount of the first container, whose name
/// contains "default".
pub fn strip_default_volumes(pod: &mut Pod) {
    let Some(spec) = pod.spec.as_mut() else {
        return;
    };

    if let Some(volumes) = spec.volumes.as_mut() {
        volumes.retain(|v| !v.name.contains(DEFAULT_VOLUME_MARKER));
    }
    if let Some(mounts) = spec
        .containers
        .first_mut()
        .and_then(|c| c.volume_mounts.as_mut())
    {
        mounts.retain(|m| !m.name.contains(DEFAULT_VOLUME_MARKER));
    }
}

/// In the first container's command, replace the first "8080" of the first
/// argument mentioning the insecure port with "8081".
pub fn rewrite_insecure_port(pod: &mut Pod) {
    let Some(command) = pod
        .spec
        .as_mut()
        .and_then(|spec| spec.containers.first_mut())
        .and_then(|c| c.command.as_mut())
    else {
        return;
    };

    if let Some(arg) = command.iter_mut().find(|arg| arg.contains(INSECURE_PORT_FLAG)) {
        *arg = arg.replacen(PRIMARY_INSECURE_PORT, TEMP_INSECURE_PORT, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::primary_apiserver_pod;
    use k8s_openapi::api::core::v1::{Container, PodSpec};

    fn command_of(pod: &Pod) -> Vec<String> {
        pod.spec.as_ref().unwrap().containers[0]
            .command
            .clone()
            .unwrap()
    }

    fn pod_with_command(command: &[&str]) -> Pod {
        Pod {
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "kube-apiserver".to_string(),
                    command: Some(command.iter().map(ToString::to_string).collect()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_strips_default_volumes_and_mounts() {
        let pod = sanitize(primary_apiserver_pod("kube-apiserver-xyz", "kube-system"));
        let spec = pod.spec.unwrap();

        let volumes: Vec<_> = spec.volumes.unwrap().into_iter().map(|v| v.name).collect();
        assert_eq!(volumes, vec!["secrets", "ssl-certs-host"]);

        let mounts: Vec<_> = spec.containers[0]
            .volume_mounts
            .clone()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(mounts, vec!["secrets", "ssl-certs-host"]);
    }

    #[test]
    fn test_only_first_container_mounts_are_filtered() {
        let mut pod = primary_apiserver_pod("kube-apiserver-xyz", "kube-system");
        let sidecar = Container {
            name: "sidecar".to_string(),
            volume_mounts: pod.spec.as_ref().unwrap().containers[0].volume_mounts.clone(),
            ..Default::default()
        };
        pod.spec.as_mut().unwrap().containers.push(sidecar.clone());

        let pod = sanitize(pod);

        assert_eq!(pod.spec.unwrap().containers[1], sidecar);
    }

    #[test]
    fn test_rewrites_insecure_port() {
        let pod = sanitize(primary_apiserver_pod("kube-apiserver-xyz", "kube-system"));
        let command = command_of(&pod);

        assert!(command.contains(&"--insecure-port=8081".to_string()));
        assert!(!command.contains(&"--insecure-port=8080".to_string()));
    }

    #[test]
    fn test_rewrites_only_first_matching_argument_once() {
        let mut pod = pod_with_command(&[
            "kube-apiserver",
            "--bind-address=0.0.0.0:8080",
            "--insecure-port=8080,8080",
            "--insecure-port-extra=8080",
        ]);

        rewrite_insecure_port(&mut pod);

        assert_eq!(
            command_of(&pod),
            vec![
                "kube-apiserver",
                "--bind-address=0.0.0.0:8080",
                "--insecure-port=8081,8080",
                "--insecure-port-extra=8080",
            ]
        );
    }

    #[test]
    fn test_no_match_is_unchanged() {
        let original = pod_with_command(&["kube-apiserver", "--secure-port=443"]);
        assert_eq!(sanitize(original.clone()), original);

        let no_spec = Pod::default();
        assert_eq!(sanitize(no_spec.clone()), no_spec);

        let no_containers = Pod {
            spec: Some(PodSpec::default()),
            ..Default::default()
        };
        assert_eq!(sanitize(no_containers.clone()), no_containers);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize(primary_apiserver_pod("kube-apiserver-xyz", "kube-system"));
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_repeated_port_is_rewritten_once_per_pass() {
        let once = sanitize(pod_with_command(&["kube-apiserver", "--insecure-port=8080,8080"]));
        assert_eq!(
            command_of(&once),
            vec!["kube-apiserver", "--insecure-port=8081,8080"]
        );

        let twice = sanitize(once.clone());
        assert_eq!(
            command_of(&twice),
            vec!["kube-apiserver", "--insecure-port=8081,8081"]
        );
        assert_ne!(once, twice);

        // No "8080" left, so further passes change nothing.
        assert_eq!(sanitize(twice.clone()), twice);
    }
}

//! Execution-context classification
//!
//! Every facet is decided by the first matching rule in a fixed table, so the
//! same inputs always produce the same descriptor. Each decided facet records
//! the variable or sentinel that decided it.

use crate::host::{HostFs, ProcessEnv};
use crate::models::*;
use crate::traits::{EnvSource, FileProbe};
use std::path::Path;
use tracing::debug;

const DOCKERENV: &str = "/.dockerenv";
const CONTAINERENV: &str = "/run/.containerenv";
const INIT_CGROUP: &str = "/proc/1/cgroup";

/// Vendor-specific variables, checked in order
const CI_VENDOR_VARS: &[(&str, CiVendor)] = &[
    ("GITHUB_ACTIONS", CiVendor::GitHubActions),
    ("GITLAB_CI", CiVendor::GitLabCi),
    ("JENKINS_URL", CiVendor::Jenkins),
    ("JENKINS_HOME", CiVendor::Jenkins),
    ("CIRCLECI", CiVendor::CircleCi),
    ("TRAVIS", CiVendor::TravisCi),
    ("TF_BUILD", CiVendor::AzurePipelines),
    ("BITBUCKET_BUILD_NUMBER", CiVendor::Bitbucket),
    ("BUILDKITE", CiVendor::BuildKite),
    ("TEAMCITY_VERSION", CiVendor::TeamCity),
    ("DRONE", CiVendor::Drone),
    ("APPVEYOR", CiVendor::AppVeyor),
    ("CODEBUILD_BUILD_ID", CiVendor::AwsCodeBuild),
    ("BUILDER_OUTPUT", CiVendor::GoogleCloudBuild),
];

/// Vendor-neutral variables meaning "some CI"
const CI_GENERIC_VARS: &[&str] = &["CI", "CONTINUOUS_INTEGRATION", "BUILD_NUMBER"];

const CLOUD_VARS: &[(&str, CloudProvider)] = &[
    ("AWS_EXECUTION_ENV", CloudProvider::Aws),
    ("AWS_REGION", CloudProvider::Aws),
    ("ECS_CONTAINER_METADATA_URI", CloudProvider::Aws),
    ("ECS_CONTAINER_METADATA_URI_V4", CloudProvider::Aws),
    ("AWS_LAMBDA_FUNCTION_NAME", CloudProvider::Aws),
    ("GOOGLE_CLOUD_PROJECT", CloudProvider::Gcp),
    ("GCP_PROJECT", CloudProvider::Gcp),
    ("K_SERVICE", CloudProvider::Gcp),
    ("FUNCTION_TARGET", CloudProvider::Gcp),
    ("WEBSITE_SITE_NAME", CloudProvider::Azure),
    ("AZURE_FUNCTIONS_ENVIRONMENT", CloudProvider::Azure),
    ("AZURE_HTTP_USER_AGENT", CloudProvider::Azure),
    ("DYNO", CloudProvider::Heroku),
    ("VERCEL", CloudProvider::Vercel),
    ("NETLIFY", CloudProvider::Netlify),
];

/// Cgroup markers in `/proc/1/cgroup`, checked in order
const CGROUP_MARKERS: &[(&str, ContainerRuntime)] = &[
    ("kubepods", ContainerRuntime::Kubernetes),
    ("docker", ContainerRuntime::Docker),
    ("containerd", ContainerRuntime::Containerd),
    ("libpod", ContainerRuntime::Podman),
];

/// Classify the running process
pub fn detect() -> EnvironmentDescriptor {
    classify(
        &ProcessEnv,
        &HostFs,
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
}

/// Classify an execution context described by `env` and `fs`
pub fn classify(
    env: &dyn EnvSource,
    fs: &dyn FileProbe,
    os: &str,
    arch: &str,
) -> EnvironmentDescriptor {
    let mut evidence = Vec::new();

    let ci_vendor = classify_ci(env, &mut evidence);
    let container = classify_container(env, fs, &mut evidence);
    let cloud = classify_cloud(env, &mut evidence);

    let descriptor = EnvironmentDescriptor {
        os: OsFamily::from_os_str(os),
        arch: arch.to_string(),
        ci: ci_vendor != CiVendor::None,
        ci_vendor,
        container,
        cloud,
        in_container: container != ContainerRuntime::None,
        in_kubernetes: container == ContainerRuntime::Kubernetes,
        evidence,
    };

    debug!(summary = %descriptor.summary(), "classified environment");
    descriptor
}

/// `CI=false` and `CI=0` are set but mean "not CI"
fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn classify_ci(env: &dyn EnvSource, evidence: &mut Vec<Evidence>) -> CiVendor {
    for (var, vendor) in CI_VENDOR_VARS {
        if env.non_empty(var).is_some() {
            evidence.push(env_evidence(Facet::Ci, var));
            return *vendor;
        }
    }

    for var in CI_GENERIC_VARS {
        if env.var(var).is_some_and(|v| is_truthy(&v)) {
            evidence.push(env_evidence(Facet::Ci, var));
            return CiVendor::Generic;
        }
    }

    CiVendor::None
}

fn classify_container(
    env: &dyn EnvSource,
    fs: &dyn FileProbe,
    evidence: &mut Vec<Evidence>,
) -> ContainerRuntime {
    if env.non_empty("KUBERNETES_SERVICE_HOST").is_some() {
        evidence.push(env_evidence(Facet::Container, "KUBERNETES_SERVICE_HOST"));
        return ContainerRuntime::Kubernetes;
    }

    if fs.exists(Path::new(CONTAINERENV)) {
        evidence.push(file_evidence(Facet::Container, CONTAINERENV));
        return ContainerRuntime::Podman;
    }
    if env
        .var("container")
        .is_some_and(|v| v.eq_ignore_ascii_case("podman"))
    {
        evidence.push(env_evidence(Facet::Container, "container"));
        return ContainerRuntime::Podman;
    }

    if fs.exists(Path::new(DOCKERENV)) {
        evidence.push(file_evidence(Facet::Container, DOCKERENV));
        return ContainerRuntime::Docker;
    }

    if let Some(cgroup) = fs.read_to_string(Path::new(INIT_CGROUP)) {
        for (marker, runtime) in CGROUP_MARKERS {
            if cgroup.contains(marker) {
                evidence.push(Evidence {
                    facet: Facet::Container,
                    source: format!("file:{}#{}", INIT_CGROUP, marker),
                });
                return *runtime;
            }
        }
    }

    ContainerRuntime::None
}

fn classify_cloud(env: &dyn EnvSource, evidence: &mut Vec<Evidence>) -> CloudProvider {
    for (var, provider) in CLOUD_VARS {
        if env.non_empty(var).is_some() {
            evidence.push(env_evidence(Facet::Cloud, var));
            return *provider;
        }
    }
    CloudProvider::None
}

fn env_evidence(facet: Facet, var: &str) -> Evidence {
    Evidence {
        facet,
        source: format!("env:{}", var),
    }
}

fn file_evidence(facet: Facet, path: &str) -> Evidence {
    Evidence {
        facet,
        source: format!("file:{}", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{StaticEnv, StaticFs};

    fn classify_with(env: StaticEnv, fs: StaticFs) -> EnvironmentDescriptor {
        classify(&env, &fs, "linux", "x86_64")
    }

    #[test]
    fn test_bare_host() {
        let d = classify_with(StaticEnv::new(), StaticFs::new());
        assert_eq!(d.os, OsFamily::Linux);
        assert_eq!(d.arch, "x86_64");
        assert!(!d.ci);
        assert_eq!(d.ci_vendor, CiVendor::None);
        assert_eq!(d.container, ContainerRuntime::None);
        assert_eq!(d.cloud, CloudProvider::None);
        assert!(!d.in_container);
        assert!(d.evidence.is_empty());
    }

    #[test]
    fn test_github_actions() {
        let env = StaticEnv::new()
            .with("CI", "true")
            .with("GITHUB_ACTIONS", "true");
        let d = classify_with(env, StaticFs::new());
        assert!(d.ci);
        assert_eq!(d.ci_vendor, CiVendor::GitHubActions);
        assert_eq!(d.evidence[0].source, "env:GITHUB_ACTIONS");
    }

    #[test]
    fn test_jenkins_by_home() {
        let env = StaticEnv::new().with("JENKINS_HOME", "/var/jenkins");
        assert_eq!(
            classify_with(env, StaticFs::new()).ci_vendor,
            CiVendor::Jenkins
        );
    }

    #[test]
    fn test_generic_ci() {
        let env = StaticEnv::new().with("CI", "1");
        let d = classify_with(env, StaticFs::new());
        assert_eq!(d.ci_vendor, CiVendor::Generic);
        assert!(d.ci);
    }

    #[test]
    fn test_every_vendor_variable() {
        for &(var, vendor) in CI_VENDOR_VARS {
            let d = classify_with(StaticEnv::new().with(var, "1"), StaticFs::new());
            assert!(d.ci, "{var}");
            assert_eq!(d.ci_vendor, vendor, "{var}");
            assert_eq!(d.evidence[0].source, format!("env:{}", var));
        }
    }

    #[test]
    fn test_every_generic_ci_variable() {
        for &var in CI_GENERIC_VARS {
            let d = classify_with(StaticEnv::new().with(var, "42"), StaticFs::new());
            assert_eq!(d.ci_vendor, CiVendor::Generic, "{var}");
            assert_eq!(d.evidence[0].source, format!("env:{}", var));
        }

        let env = StaticEnv::new()
            .with("CONTINUOUS_INTEGRATION", "true")
            .with("BUILD_NUMBER", "17");
        assert!(classify_with(env, StaticFs::new()).ci);
    }

    #[test]
    fn test_ci_false_is_not_ci() {
        for value in ["false", "0", "FALSE", ""] {
            let env = StaticEnv::new().with("CI", value);
            let d = classify_with(env, StaticFs::new());
            assert!(!d.ci, "CI={value:?} should not count as CI");
        }
    }

    #[test]
    fn test_empty_vendor_var_ignored() {
        let env = StaticEnv::new().with("GITLAB_CI", "");
        assert_eq!(
            classify_with(env, StaticFs::new()).ci_vendor,
            CiVendor::None
        );
    }

    #[test]
    fn test_dockerenv_sentinel() {
        let fs = StaticFs::new().with("/.dockerenv", "");
        let d = classify_with(StaticEnv::new(), fs);
        assert_eq!(d.container, ContainerRuntime::Docker);
        assert!(d.in_container);
        assert!(!d.in_kubernetes);
        assert_eq!(d.evidence[0].source, "file:/.dockerenv");
    }

    #[test]
    fn test_kubernetes_beats_dockerenv() {
        let env = StaticEnv::new().with("KUBERNETES_SERVICE_HOST", "10.0.0.1");
        let fs = StaticFs::new().with("/.dockerenv", "");
        let d = classify_with(env, fs);
        assert_eq!(d.container, ContainerRuntime::Kubernetes);
        assert!(d.in_kubernetes);
    }

    #[test]
    fn test_podman_containerenv() {
        let fs = StaticFs::new().with("/run/.containerenv", "engine=\"podman\"");
        assert_eq!(
            classify_with(StaticEnv::new(), fs).container,
            ContainerRuntime::Podman
        );
    }

    #[test]
    fn test_podman_container_variable() {
        let env = StaticEnv::new().with("container", "podman");
        let d = classify_with(env, StaticFs::new());
        assert_eq!(d.container, ContainerRuntime::Podman);
        assert!(d.in_container);
        assert_eq!(d.evidence[0].source, "env:container");

        // other values of `container` are not a runtime on their own
        let env = StaticEnv::new().with("container", "oci");
        assert_eq!(
            classify_with(env, StaticFs::new()).container,
            ContainerRuntime::None
        );
    }

    #[test]
    fn test_every_cgroup_marker() {
        for &(marker, runtime) in CGROUP_MARKERS {
            let fs = StaticFs::new().with(INIT_CGROUP, format!("0::/{}/abc123", marker));
            let d = classify_with(StaticEnv::new(), fs);
            assert_eq!(d.container, runtime, "{marker}");
            assert_eq!(
                d.evidence[0].source,
                format!("file:{}#{}", INIT_CGROUP, marker)
            );
        }
    }

    #[test]
    fn test_cgroup_markers() {
        let cases = [
            ("12:pids:/kubepods/besteffort/pod1", ContainerRuntime::Kubernetes),
            ("0::/docker/3f2a", ContainerRuntime::Docker),
            ("0::/system.slice/containerd.service", ContainerRuntime::Containerd),
            ("0::/machine.slice/libpod-abc.scope", ContainerRuntime::Podman),
            ("0::/init.scope", ContainerRuntime::None),
        ];

        for (cgroup, expected) in cases {
            let fs = StaticFs::new().with("/proc/1/cgroup", cgroup);
            assert_eq!(
                classify_with(StaticEnv::new(), fs).container,
                expected,
                "cgroup {cgroup:?}"
            );
        }
    }

    #[test]
    fn test_every_cloud_variable() {
        for &(var, provider) in CLOUD_VARS {
            let d = classify_with(StaticEnv::new().with(var, "x"), StaticFs::new());
            assert_eq!(d.cloud, provider, "{var}");
            assert_eq!(d.evidence[0].source, format!("env:{}", var));
        }
    }

    #[test]
    fn test_every_facet_has_evidence() {
        let env = StaticEnv::new()
            .with("GITLAB_CI", "true")
            .with("GOOGLE_CLOUD_PROJECT", "proj");
        let fs = StaticFs::new().with("/.dockerenv", "");
        let d = classify_with(env, fs);

        for facet in [Facet::Ci, Facet::Container, Facet::Cloud] {
            assert!(d.evidence.iter().any(|e| e.facet == facet));
        }
    }

    #[test]
    fn test_classification_is_deterministic() {
        let env = StaticEnv::new().with("CIRCLECI", "true").with("DYNO", "web.1");
        let fs = StaticFs::new().with("/proc/1/cgroup", "0::/docker/x");
        assert_eq!(
            classify(&env, &fs, "macos", "aarch64"),
            classify(&env, &fs, "macos", "aarch64")
        );
    }
}

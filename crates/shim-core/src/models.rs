use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Operating system family the process runs on.
///
/// Always serialized as a bare string, including unlisted systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
    FreeBsd,
    Other(String),
}

impl Serialize for OsFamily {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OsFamily {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(OsFamily::from_os_str(&name))
    }
}

impl OsFamily {
    /// Map a `std::env::consts::OS` style name to a family
    pub fn from_os_str(os: &str) -> Self {
        match os.to_ascii_lowercase().as_str() {
            "linux" => OsFamily::Linux,
            "macos" | "darwin" => OsFamily::MacOs,
            "windows" | "win32" => OsFamily::Windows,
            "freebsd" => OsFamily::FreeBsd,
            other => OsFamily::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
            OsFamily::Windows => "windows",
            OsFamily::FreeBsd => "freebsd",
            OsFamily::Other(name) => name,
        }
    }
}

/// Continuous-integration platform inferred from environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CiVendor {
    #[serde(rename = "github-actions")]
    GitHubActions,
    #[serde(rename = "gitlab-ci")]
    GitLabCi,
    Jenkins,
    #[serde(rename = "circleci")]
    CircleCi,
    TravisCi,
    AzurePipelines,
    Bitbucket,
    #[serde(rename = "buildkite")]
    BuildKite,
    #[serde(rename = "teamcity")]
    TeamCity,
    Drone,
    #[serde(rename = "appveyor")]
    AppVeyor,
    #[serde(rename = "aws-codebuild")]
    AwsCodeBuild,
    GoogleCloudBuild,
    /// `CI` is set but no known vendor variable is present
    Generic,
    None,
}

impl CiVendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CiVendor::GitHubActions => "github-actions",
            CiVendor::GitLabCi => "gitlab-ci",
            CiVendor::Jenkins => "jenkins",
            CiVendor::CircleCi => "circleci",
            CiVendor::TravisCi => "travis-ci",
            CiVendor::AzurePipelines => "azure-pipelines",
            CiVendor::Bitbucket => "bitbucket",
            CiVendor::BuildKite => "buildkite",
            CiVendor::TeamCity => "teamcity",
            CiVendor::Drone => "drone",
            CiVendor::AppVeyor => "appveyor",
            CiVendor::AwsCodeBuild => "aws-codebuild",
            CiVendor::GoogleCloudBuild => "google-cloud-build",
            CiVendor::Generic => "generic",
            CiVendor::None => "none",
        }
    }
}

/// Container runtime wrapping the process, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerRuntime {
    Docker,
    Podman,
    Containerd,
    Kubernetes,
    None,
}

impl ContainerRuntime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
            ContainerRuntime::Containerd => "containerd",
            ContainerRuntime::Kubernetes => "kubernetes",
            ContainerRuntime::None => "none",
        }
    }
}

/// Cloud or hosting provider inferred from environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    Heroku,
    Vercel,
    Netlify,
    None,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Azure => "azure",
            CloudProvider::Heroku => "heroku",
            CloudProvider::Vercel => "vercel",
            CloudProvider::Netlify => "netlify",
            CloudProvider::None => "none",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(OsFamily, CiVendor, ContainerRuntime, CloudProvider);

/// Which classification facet a piece of evidence decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Facet {
    Ci,
    Container,
    Cloud,
}

impl Facet {
    pub fn as_str(&self) -> &str {
        match self {
            Facet::Ci => "ci",
            Facet::Container => "container",
            Facet::Cloud => "cloud",
        }
    }
}

/// The environment variable or sentinel path that decided a facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub facet: Facet,
    /// e.g. `env:GITHUB_ACTIONS` or `file:/.dockerenv`
    pub source: String,
}

/// Flat description of the execution context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    pub os: OsFamily,
    pub arch: String,
    pub ci: bool,
    pub ci_vendor: CiVendor,
    pub container: ContainerRuntime,
    pub cloud: CloudProvider,
    pub in_container: bool,
    pub in_kubernetes: bool,
    /// Empty on a bare host, but always present in serialized form
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl EnvironmentDescriptor {
    /// One-line summary used in report placeholders and logs
    pub fn summary(&self) -> String {
        format!(
            "os={} arch={} ci={} container={} cloud={}",
            self.os, self.arch, self.ci_vendor, self.container, self.cloud
        )
    }
}

/// Result of matching a path against a route pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    /// The portion of the input that matched (whole path unless prefix matching)
    pub path: String,
    /// Decoded parameter values keyed by parameter name
    pub params: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_family_from_str() {
        assert_eq!(OsFamily::from_os_str("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_os_str("Darwin"), OsFamily::MacOs);
        assert_eq!(OsFamily::from_os_str("windows"), OsFamily::Windows);
        assert_eq!(
            OsFamily::from_os_str("haiku"),
            OsFamily::Other("haiku".to_string())
        );
    }

    #[test]
    fn test_os_family_is_always_a_string() {
        let other = serde_json::to_value(OsFamily::from_os_str("openbsd")).unwrap();
        assert_eq!(other, serde_json::json!("openbsd"));
        assert_eq!(serde_json::to_value(OsFamily::MacOs).unwrap(), serde_json::json!("macos"));

        let back: OsFamily = serde_json::from_str("\"openbsd\"").unwrap();
        assert_eq!(back, OsFamily::Other("openbsd".to_string()));
        let back: OsFamily = serde_json::from_str("\"freebsd\"").unwrap();
        assert_eq!(back, OsFamily::FreeBsd);
    }

    #[test]
    fn test_descriptor_serializes_kebab_case() {
        let descriptor = EnvironmentDescriptor {
            os: OsFamily::Linux,
            arch: "x86_64".to_string(),
            ci: true,
            ci_vendor: CiVendor::GitHubActions,
            container: ContainerRuntime::Docker,
            cloud: CloudProvider::None,
            in_container: true,
            in_kubernetes: false,
            evidence: Vec::new(),
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["ci_vendor"], "github-actions");
        assert_eq!(json["container"], "docker");
        assert_eq!(json["os"], "linux");
        assert_eq!(json["evidence"], serde_json::json!([]));
    }

    #[test]
    fn test_summary() {
        let descriptor = EnvironmentDescriptor {
            os: OsFamily::MacOs,
            arch: "aarch64".to_string(),
            ci: false,
            ci_vendor: CiVendor::None,
            container: ContainerRuntime::None,
            cloud: CloudProvider::Aws,
            in_container: false,
            in_kubernetes: false,
            evidence: Vec::new(),
        };
        assert_eq!(
            descriptor.summary(),
            "os=macos arch=aarch64 ci=none container=none cloud=aws"
        );
    }
}

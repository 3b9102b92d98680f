//! Image plan data structures
//!
//! The plan is the declarative description of what a build would do: the two
//! build invocations, the ordered layer contents, and the runtime contract.
//! `monopack plan` computes and prints it without executing anything.

use crate::config::BuildConfig;
use crate::image::{validate_order, LayerKind, RuntimeContract, RuntimeIdentity};
use crate::manifest::{WorkspaceSet, LOCKFILE_FILENAME, MANIFEST_FILENAME};
use crate::supervise::ProbeParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_version() -> String {
    "1.0".to_string()
}

/// Project metadata carried by the plan
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanMetadata {
    pub project_name: String,
    pub workspaces: Vec<String>,
}

/// The build half of the plan: the whole-tree invocations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildPlan {
    pub install_command: String,
    pub build_command: String,
    pub artifact_dir: String,
    /// The resolver's exact input set, manifests first
    pub manifest_inputs: Vec<String>,
}

/// One planned layer: kind plus the paths it will carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPlan {
    pub kind: LayerKind,
    pub paths: Vec<String>,
}

/// Complete image plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePlan {
    #[serde(default = "default_version")]
    pub version: String,
    pub metadata: PlanMetadata,
    pub build: BuildPlan,
    pub layers: Vec<LayerPlan>,
    pub runtime: RuntimeContract,
}

impl ImagePlan {
    /// Compute the plan for a discovered workspace set
    pub fn compute(workspaces: &WorkspaceSet, config: &BuildConfig) -> Result<Self> {
        let identity =
            RuntimeIdentity::new(&config.image_user, config.image_uid, config.image_gid)?;

        let ws_manifests: Vec<String> = workspaces
            .workspaces
            .iter()
            .map(|ws| ws.path.join(MANIFEST_FILENAME).display().to_string())
            .collect();

        let layers = vec![
            LayerPlan {
                kind: LayerKind::RootManifests,
                paths: vec![
                    MANIFEST_FILENAME.to_string(),
                    LOCKFILE_FILENAME.to_string(),
                    config.license_file.clone(),
                ],
            },
            LayerPlan {
                kind: LayerKind::WorkspaceManifests,
                paths: ws_manifests.clone(),
            },
            LayerPlan {
                kind: LayerKind::Artifacts,
                paths: workspaces
                    .workspaces
                    .iter()
                    .map(|ws| {
                        ws.path
                            .join(&config.artifact_dir)
                            .display()
                            .to_string()
                    })
                    .collect(),
            },
            LayerPlan {
                kind: LayerKind::StaticResources,
                paths: vec![config.static_dir.clone()],
            },
            LayerPlan {
                kind: LayerKind::Dependencies,
                paths: vec!["node_modules".to_string()],
            },
        ];

        let mut manifest_inputs = vec![
            MANIFEST_FILENAME.to_string(),
            LOCKFILE_FILENAME.to_string(),
        ];
        manifest_inputs.extend(ws_manifests);

        Ok(Self {
            version: default_version(),
            metadata: PlanMetadata {
                project_name: workspaces.root.name.clone(),
                workspaces: workspaces
                    .workspaces
                    .iter()
                    .map(|ws| ws.name.clone())
                    .collect(),
            },
            build: BuildPlan {
                install_command: config.install_command.clone(),
                build_command: config.build_command.clone(),
                artifact_dir: config.artifact_dir.clone(),
                manifest_inputs,
            },
            layers,
            runtime: RuntimeContract::new(config, identity, &ProbeParams::default()),
        })
    }

    /// Serialize the plan to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize plan to YAML")
    }

    /// Serialize the plan to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize plan to JSON")
    }

    /// Validate the plan structure
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            anyhow::bail!("Version cannot be empty");
        }
        if self.metadata.workspaces.is_empty() {
            anyhow::bail!("Plan has no workspaces");
        }
        if self.build.install_command.is_empty() {
            anyhow::bail!("Install command cannot be empty");
        }
        if self.build.build_command.is_empty() {
            anyhow::bail!("Build command cannot be empty");
        }
        let kinds: Vec<LayerKind> = self.layers.iter().map(|l| l.kind).collect();
        validate_order(&kinds)?;
        self.runtime.validate()
    }
}

impl fmt::Display for ImagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image Plan")?;
        writeln!(f, "==========")?;
        writeln!(f, "Project:    {}", self.metadata.project_name)?;
        writeln!(f, "Workspaces: {}", self.metadata.workspaces.join(", "))?;
        writeln!(f)?;

        writeln!(f, "Build:")?;
        writeln!(f, "  Install:  {}", self.build.install_command)?;
        writeln!(f, "  Compile:  {}", self.build.build_command)?;
        writeln!(f, "  Artifacts: {}/ per workspace", self.build.artifact_dir)?;
        writeln!(f)?;

        writeln!(f, "Layers:")?;
        for layer in &self.layers {
            writeln!(f, "  - {}: {}", layer.kind.name(), layer.paths.join(", "))?;
        }
        writeln!(f)?;

        writeln!(f, "Runtime:")?;
        writeln!(f, "  User:     {}", self.runtime.user)?;
        writeln!(
            f,
            "  Port:     ${} (default {}), expose {}",
            self.runtime.port.var, self.runtime.port.default, self.runtime.port.expose
        )?;
        writeln!(f, "  Command:  {}", self.runtime.command)?;
        writeln!(
            f,
            "  Health:   GET {} every {}s, timeout {}s, grace {}s, retries {}",
            self.runtime.healthcheck.path,
            self.runtime.healthcheck.interval_secs,
            self.runtime.healthcheck.timeout_secs,
            self.runtime.healthcheck.start_period_secs,
            self.runtime.healthcheck.retries
        )?;
        Ok(())
    }
}

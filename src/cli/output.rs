//! Output format rendering

use crate::output::{BuildReport, ImagePlan};
use anyhow::Result;

/// How results are rendered to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

pub fn render_plan(plan: &ImagePlan, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => plan.to_json(),
        OutputFormat::Yaml => plan.to_yaml(),
        OutputFormat::Human => Ok(plan.to_string()),
    }
}

pub fn render_report(report: &BuildReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => report.to_json(),
        OutputFormat::Yaml => report.to_yaml(),
        OutputFormat::Human => Ok(report.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::fs::MockFileSystem;
    use crate::manifest::WorkspaceSet;
    use std::path::Path;

    fn plan() -> ImagePlan {
        let fs = MockFileSystem::new();
        fs.add_file(
            "/repo/package.json",
            r#"{"name": "acme", "workspaces": ["core"]}"#,
        );
        fs.add_file("/repo/package-lock.json", "{}");
        fs.add_file("/repo/core/package.json", r#"{"name": "@acme/core"}"#);
        let workspaces = WorkspaceSet::discover(&fs, Path::new("/repo")).unwrap();
        ImagePlan::compute(&workspaces, &BuildConfig::default()).unwrap()
    }

    #[test]
    fn test_render_plan_json() {
        let out = render_plan(&plan(), OutputFormat::Json).unwrap();
        assert!(out.trim_start().starts_with('{'));
        assert!(out.contains("\"install_command\": \"npm ci\""));
    }

    #[test]
    fn test_render_plan_yaml() {
        let out = render_plan(&plan(), OutputFormat::Yaml).unwrap();
        assert!(out.contains("project_name: acme"));
    }

    #[test]
    fn test_render_plan_human() {
        let out = render_plan(&plan(), OutputFormat::Human).unwrap();
        assert!(out.contains("Image Plan"));
    }
}

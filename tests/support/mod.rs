//! Shared fixtures for integration tests

use monopack::config::BuildConfig;
use monopack::pipeline::BuildContext;
use std::fs;
use std::path::Path;

/// Stand-in install command: materializes a store with one production
/// dependency chain (express -> body-parser) and one dev-only package
/// (typescript), the way a real whole-tree install would.
pub const INSTALL_CMD: &str = "\
mkdir -p node_modules/express node_modules/body-parser node_modules/typescript && \
printf '{\"name\":\"express\",\"version\":\"4.18.2\",\"dependencies\":{\"body-parser\":\"^1.20.0\"}}' > node_modules/express/package.json && \
printf '{\"name\":\"body-parser\",\"version\":\"1.20.2\"}' > node_modules/body-parser/package.json && \
printf '{\"name\":\"typescript\",\"version\":\"5.3.3\"}' > node_modules/typescript/package.json";

/// Stand-in build command: one invocation compiling every workspace into its
/// own dist directory.
pub const BUILD_CMD: &str = "\
for ws in core server frontend; do \
mkdir -p $ws/dist && printf 'exports.ok = 1;' > $ws/dist/index.js; \
done";

/// Lay down a three-workspace monorepo
pub fn seed_monorepo(root: &Path) {
    fs::write(
        root.join("package.json"),
        r#"{
  "name": "acme",
  "version": "1.0.0",
  "workspaces": ["core", "server", "frontend"],
  "devDependencies": {"typescript": "^5.3.0"}
}"#,
    )
    .unwrap();
    fs::write(root.join("package-lock.json"), r#"{"lockfileVersion": 3}"#).unwrap();
    fs::write(root.join("LICENSE"), "Apache License 2.0").unwrap();
    fs::write(root.join("tsconfig.base.json"), r#"{"compilerOptions": {}}"#).unwrap();
    fs::create_dir_all(root.join("public")).unwrap();
    fs::write(root.join("public/favicon.ico"), "icon-bytes").unwrap();

    for (ws, deps) in [
        ("core", r#"{}"#),
        ("server", r#"{"express": "^4.18.0"}"#),
        ("frontend", r#"{}"#),
    ] {
        fs::create_dir_all(root.join(ws).join("src")).unwrap();
        fs::write(
            root.join(ws).join("package.json"),
            format!(
                r#"{{"name": "@acme/{}", "version": "1.0.0", "scripts": {{"build": "tsc -b"}}, "dependencies": {}}}"#,
                ws, deps
            ),
        )
        .unwrap();
        fs::write(root.join(ws).join("src/index.ts"), "export {};").unwrap();
    }
}

/// Build configuration wired to the stand-in commands
pub fn test_config() -> BuildConfig {
    BuildConfig {
        install_command: INSTALL_CMD.to_string(),
        build_command: BUILD_CMD.to_string(),
        ..BuildConfig::default()
    }
}

pub fn build_context(repo: &Path, work: &Path, out: &Path) -> BuildContext {
    BuildContext::with_defaults(
        test_config(),
        repo.to_path_buf(),
        work.to_path_buf(),
        out.to_path_buf(),
    )
}

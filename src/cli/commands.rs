use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Deterministic container packaging pipeline for workspace monorepos
#[derive(Parser, Debug)]
#[command(
    name = "monopack",
    about = "Deterministic container packaging pipeline for workspace monorepos",
    version,
    author,
    long_about = "monopack turns a workspace monorepo into a pruned, non-root runtime \
                  image through five sequential stages: dependency resolution, source \
                  assembly, build transform, production pruning, and image assembly. \
                  It also supervises the packaged process at runtime with HTTP \
                  liveness probing."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Compute the image plan without building",
        long_about = "Discovers the workspace layout and prints the stages, layer \
                      contents, and runtime contract a build would produce.\n\n\
                      Examples:\n  \
                      monopack plan\n  \
                      monopack plan /path/to/repo --format yaml"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Run the build pipeline and assemble the runtime image",
        long_about = "Runs all five stages in order and writes the layered image.\n\n\
                      Examples:\n  \
                      monopack build --output ./image\n  \
                      monopack build /path/to/repo --output ./image --format json"
    )]
    Build(BuildArgs),

    #[command(
        about = "Supervise the packaged process with liveness probing",
        long_about = "Drops privileges, resolves the port from PORT (default 3000), \
                      starts the single process, and probes /api/v1/status on a fixed \
                      cadence. Health is reported, never acted on; the surrounding \
                      orchestrator owns restarts.\n\n\
                      Examples:\n  \
                      monopack supervise -- node server/dist/main.js\n  \
                      monopack supervise --user 1000:1000 -- node server/dist/main.js"
    )]
    Supervise(SuperviseArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the monorepo (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the monorepo (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Directory the image is assembled into"
    )]
    pub output: PathBuf,

    #[arg(
        long,
        value_name = "DIR",
        help = "Working directory for the build stages (defaults to <output>/work)"
    )]
    pub work_dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct SuperviseArgs {
    #[arg(
        long,
        value_name = "UID:GID",
        help = "Unprivileged identity to drop to before starting the process"
    )]
    pub user: Option<String>,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "30",
        help = "Probe interval"
    )]
    pub probe_interval: u64,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "5",
        help = "Per-probe timeout (must be shorter than the interval)"
    )]
    pub probe_timeout: u64,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value = "5",
        help = "Startup grace period during which probe failures are ignored"
    )]
    pub grace_period: u64,

    #[arg(
        long,
        value_name = "COUNT",
        default_value = "3",
        help = "Consecutive failures before reporting unhealthy"
    )]
    pub retries: u32,

    #[arg(
        trailing_var_arg = true,
        required = true,
        value_name = "COMMAND",
        help = "The single long-lived process-start command"
    )]
    pub command: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => Self::Json,
            OutputFormatArg::Yaml => Self::Yaml,
            OutputFormatArg::Human => Self::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_defaults() {
        let args = CliArgs::parse_from(["monopack", "plan"]);
        match args.command {
            Commands::Plan(plan) => {
                assert!(plan.repository_path.is_none());
                assert_eq!(plan.format, OutputFormatArg::Human);
            }
            _ => panic!("expected plan"),
        }
    }

    #[test]
    fn test_build_requires_output() {
        assert!(CliArgs::try_parse_from(["monopack", "build"]).is_err());
        let args = CliArgs::parse_from(["monopack", "build", "-o", "img"]);
        match args.command {
            Commands::Build(build) => assert_eq!(build.output, PathBuf::from("img")),
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_supervise_takes_trailing_command() {
        let args = CliArgs::parse_from([
            "monopack",
            "supervise",
            "--user",
            "1000:1000",
            "--",
            "node",
            "server/dist/main.js",
        ]);
        match args.command {
            Commands::Supervise(sup) => {
                assert_eq!(sup.user.as_deref(), Some("1000:1000"));
                assert_eq!(sup.command, vec!["node", "server/dist/main.js"]);
                assert_eq!(sup.probe_interval, 30);
                assert_eq!(sup.retries, 3);
            }
            _ => panic!("expected supervise"),
        }
    }

    #[test]
    fn test_supervise_requires_command() {
        assert!(CliArgs::try_parse_from(["monopack", "supervise"]).is_err());
    }

    #[test]
    fn test_verbose_quiet_conflict() {
        assert!(CliArgs::try_parse_from(["monopack", "-v", "-q", "plan"]).is_err());
    }
}

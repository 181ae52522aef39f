use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the directory to read files from (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xconcat/xconcat.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub no_config_file: bool,

    #[arg(
        long,
        help = "Specify the project name (overrides config/dir name).",
        value_name = "NAME",
        help_heading = "Project Setup"
    )]
    pub project_name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IgnoreTogglesGroup {
    #[arg(
        long,
        help = "Respect .gitignore files [default: enabled].",
        overrides_with = "disable_gitignore",
        help_heading = "Ignore Rules"
    )]
    pub enable_gitignore: bool,
    #[arg(
        long,
        help = "Do not respect .gitignore files.",
        overrides_with = "enable_gitignore",
        help_heading = "Ignore Rules"
    )]
    pub disable_gitignore: bool,

    #[arg(
        long,
        help = "Skip .git/ and .xconcat/ directories [default: enabled].",
        overrides_with = "disable_builtin_ignore",
        help_heading = "Ignore Rules"
    )]
    pub enable_builtin_ignore: bool,
    #[arg(
        long,
        help = "Walk .git/ and .xconcat/ directories too.",
        overrides_with = "enable_builtin_ignore",
        help_heading = "Ignore Rules"
    )]
    pub disable_builtin_ignore: bool,

    #[arg(
        long,
        help = "Follow symbolic links while walking.",
        help_heading = "Ignore Rules"
    )]
    pub follow_links: bool,

    #[arg(
        long,
        value_name = "SIZE_STRING",
        help = "Skip files larger than this (e.g. '512KB', '2MiB') [default: 2MB].",
        help_heading = "Ignore Rules"
    )]
    pub max_file_size: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExclusionGroup {
    #[arg(long = "exclude-ext", value_name = "EXT", action = clap::ArgAction::Append, help = "Exclude files with this extension (e.g. 'log', '.map').", help_heading = "Exclusion Rules")]
    pub exclude_ext: Vec<String>,
    #[arg(long = "exclude-glob", value_name = "GLOB", action = clap::ArgAction::Append, help = "Exclude paths matching this glob ('*' and '?' only).", help_heading = "Exclusion Rules")]
    pub exclude_glob: Vec<String>,
    #[arg(long = "exclude-regex", value_name = "REGEX", action = clap::ArgAction::Append, help = "Exclude paths matching this case-insensitive regex.", help_heading = "Exclusion Rules")]
    pub exclude_regex: Vec<String>,
    #[arg(long = "exclude-path", value_name = "TEXT", action = clap::ArgAction::Append, help = "Exclude paths containing this text.", help_heading = "Exclusion Rules")]
    pub exclude_path: Vec<String>,
    #[arg(long = "preset", value_name = "NAME", action = clap::ArgAction::Append, help = "Apply a built-in rule preset (see 'xconcat presets').", help_heading = "Exclusion Rules")]
    pub preset: Vec<String>,
    #[arg(
        long,
        value_name = "COLLECTION_FILE",
        help = "Start from a saved collection instead of walking the project.",
        help_heading = "Exclusion Rules"
    )]
    pub collection: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SourceOpts {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub ignore_toggles: IgnoreTogglesGroup,
    #[clap(flatten)]
    pub exclusion: ExclusionGroup,
}

/// Output format for reports (stats, check, presets, ...). Without a format
/// the report is printed for humans.
#[derive(Args, Debug, Clone, Default)]
pub struct DataFormatOpts {
    #[arg(short = 'f', long, help = "Print the report as structured data.", value_name = "FORMAT", value_parser = ["json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Pretty-print JSON output.",
        help_heading = "Output Formatting"
    )]
    pub pretty: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Filter and concatenate text files into a single document.",
    long_about = "xconcat walks a directory, drops binary files, applies ordered exclusion rules \n(extension, glob, regex, path substring) and concatenates what remains, \noptionally wrapped in a Markdown, JSON, XML or HTML export document.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xconcat concat --preset node --exclude-ext map -f markdown --save bundle.md\n  xconcat stats --exclude-glob '*.test.*'\n  xconcat validate regex '\\.min\\.js$'\n  xconcat suggest",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "c",
        about = "Concatenate the included files and print or save the result."
    )]
    Concat(ConcatArgs),

    #[command(
        visible_alias = "m",
        about = "Show statistics for the included files."
    )]
    Stats(StatsArgs),

    #[command(
        visible_alias = "d",
        about = "Show effective configuration, rules and the per-file decision."
    )]
    Check(CheckArgs),

    #[command(about = "Check that a rule pattern is well formed.")]
    Validate(ValidateArgs),

    #[command(about = "List built-in rule presets or show one of them.")]
    Presets(PresetsArgs),

    #[command(about = "Suggest exclusion rules for common noise in the project.")]
    Suggest(SuggestArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConcatArgs {
    #[clap(flatten)]
    pub source: SourceOpts,

    #[arg(
        long,
        value_name = "FORMAT",
        value_parser = ["none", "comment", "markdown", "custom"],
        help = "Per-file header style for plain output [default: comment].",
        help_heading = "Concatenation"
    )]
    pub header_format: Option<String>,

    #[arg(
        long,
        help = "Omit document and per-file headers.",
        help_heading = "Concatenation"
    )]
    pub no_headers: bool,

    #[arg(
        long,
        value_name = "TEMPLATE",
        help = "Custom header template using {path}, {name}, {size}, {modified}. Implies --header-format custom.",
        help_heading = "Concatenation"
    )]
    pub template: Option<String>,

    #[arg(
        long,
        value_name = "TEXT",
        help = "Text placed between files; '\\n' and '\\t' are unescaped [default: blank line].",
        help_heading = "Concatenation"
    )]
    pub separator: Option<String>,

    #[arg(
        long,
        value_name = "KEY",
        value_parser = ["name", "path", "size", "modified"],
        help = "Sort files before concatenating (default: walk order).",
        help_heading = "Concatenation"
    )]
    pub sort: Option<String>,

    #[arg(
        long,
        requires = "sort",
        help = "Sort in descending order.",
        help_heading = "Concatenation"
    )]
    pub desc: bool,

    #[arg(short = 'f', long, help = "Export format [default: plain].", value_name = "FORMAT", value_parser = ["plain", "markdown", "json", "xml", "html"], help_heading = "Output Control")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Pretty-print JSON exports.",
        help_heading = "Output Control"
    )]
    pub pretty: bool,

    #[arg(
        long,
        value_name = "TITLE",
        help = "Title used by the export document.",
        help_heading = "Output Control"
    )]
    pub title: Option<String>,

    #[arg(
        short = 's',
        long,
        value_name = "OUTPUT_FILE",
        help = "Write the result to a file instead of stdout.",
        help_heading = "Output Control"
    )]
    pub save: Option<PathBuf>,

    #[arg(
        long,
        value_name = "COLLECTION_FILE",
        help = "Also save the working set (files, rules, options) as a collection.",
        help_heading = "Output Control"
    )]
    pub collection_out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(help = "Rule kind: extension, glob, regex or path.")]
    pub kind: String,
    #[arg(help = "Pattern to check.")]
    pub pattern: String,
    #[arg(
        long = "test",
        value_name = "PATH",
        action = clap::ArgAction::Append,
        help = "Also report whether PATH would be excluded by the pattern."
    )]
    pub test_paths: Vec<String>,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct PresetsArgs {
    #[arg(help = "Preset to show in detail.")]
    pub name: Option<String>,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct SuggestArgs {
    #[clap(flatten)]
    pub source: SourceOpts,
    #[clap(flatten)]
    pub format_output: DataFormatOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[arg(
        long,
        help = "Save the default config to .xconcat/xconcat.toml (prompts overwrite)."
    )]
    pub save: bool,
}

/// Turns `\n`, `\t` and `\\` in a command-line separator into the characters
/// they name.
pub fn unescape_separator(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Global flags (--json, --config, ...) work with every subcommand. Flags that
// are not given leave the config file (or the defaults) alone.
// =============================================================================

use clap::{Args, Parser, Subcommand, ValueEnum};
use link_audit::Scope;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "link-audit",
    version,
    about = "Checks the visible links on a web page and reports the ones that need attention",
    long_about = "link-audit loads a page, finds the links a user could click, probes each one and \
                  reports the broken ones. CDN bot challenges, login walls, redirects and social \
                  networks that block scripted clients are not reported as broken."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Output results in JSON format instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    /// TOML file with audit settings (timeouts, caps, social domains)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of links probed at once (results keep page order)
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Timeout for each probe, in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log debug details to stderr (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every visible link on a page
    ///
    /// Example: link-audit page https://example.com --max-links 50
    Page {
        url: String,

        /// Check at most this many links (default: 100)
        #[arg(long)]
        max_links: Option<usize>,
    },

    /// Check the links inside one section of a page
    ///
    /// Example: link-audit section https://example.com --preset footer
    Section {
        url: String,

        /// A common section of a storefront
        #[arg(long, value_enum, conflicts_with = "selector", required_unless_present = "selector")]
        preset: Option<Preset>,

        /// Any CSS selector for the section
        #[arg(long)]
        selector: Option<String>,

        /// Check at most this many links (default: no limit)
        #[arg(long)]
        max_links: Option<usize>,
    },

    /// Run the standard set: whole page (first 100 links), header, footer, categories
    Suite { url: String },

    /// Follow the first few header/nav links and check none lands on an error page
    Nav {
        url: String,

        /// How many navigation links to follow
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Header,
    Footer,
    Category,
}

impl Preset {
    pub fn selector(self) -> &'static str {
        match self {
            Preset::Header => r#"header, nav, [role="navigation"]"#,
            Preset::Footer => "footer",
            Preset::Category => r#"[data-testid="category"], .category, .menu-item"#,
        }
    }

    pub fn scope(self) -> Scope {
        Scope::section(self.selector())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_needs_preset_or_selector() {
        let missing = Cli::try_parse_from(["link-audit", "section", "https://example.com"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "link-audit", "section", "https://example.com", "--preset", "footer", "--selector", "aside",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "link-audit", "page", "https://example.com", "--json", "--max-links", "5",
        ])
        .unwrap();
        assert!(cli.global.json);
        match cli.command {
            Commands::Page { max_links, .. } => assert_eq!(max_links, Some(5)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_preset_scopes() {
        assert_eq!(Preset::Footer.scope(), Scope::section("footer"));
        assert!(Preset::Header.selector().contains("nav"));
    }
}

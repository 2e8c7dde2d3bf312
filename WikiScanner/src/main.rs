use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;

use wiki_scanner::batch::run_batch;
use wiki_scanner::config::Config;
use wiki_scanner::jobs::RemoveTemplateParam;
use wiki_scanner::pages::{FilePages, PageStore};
use wiki_scanner::wikitext::{Link, LinkType, Result, Table, Template, WikiText};

#[derive(Debug, Parser)]
#[command(
    name = "wiki_scanner",
    version,
    about = "Find and edit templates, tables and links in wikitext files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "List templates as JSON")]
    Templates(TemplatesArgs),
    #[command(about = "List parsed tables as JSON")]
    Tables(FilesArgs),
    #[command(about = "List internal and external links as JSON")]
    Links(LinksArgs),
    #[command(name = "remove-param", about = "Remove a parameter from a template")]
    RemoveParam(RemoveParamArgs),
}

#[derive(Debug, Args)]
struct FilesArgs {
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct TemplatesArgs {
    #[arg(long, value_name = "NAME", help = "Only this template (default: every top-level template)")]
    name: Option<String>,
    #[command(flatten)]
    files: FilesArgs,
}

#[derive(Debug, Args)]
struct LinksArgs {
    #[arg(long = "type", value_name = "TYPE", help = "Only internal or only external links")]
    link_type: Option<LinkType>,
    #[command(flatten)]
    files: FilesArgs,
}

#[derive(Debug, Args)]
struct RemoveParamArgs {
    #[arg(long, value_name = "NAME")]
    template: String,
    #[arg(long, value_name = "KEY")]
    key: String,
    #[arg(long, help = "Write changes back instead of printing them")]
    write: bool,
    #[command(flatten)]
    files: FilesArgs,
}

/// What one file produced, plus how many broken constructs were skipped.
#[derive(Debug, Serialize)]
struct FileReport<T> {
    file: String,
    items: Vec<T>,
    malformed: usize,
}

fn load_pages(store: &FilePages, config: &Config) -> Result<Vec<WikiText>> {
    store
        .titles()?
        .into_iter()
        .map(|title| {
            let markup = store.fetch_markup(&title)?;
            Ok(WikiText::for_page(title, markup).with_context_chars(config.context_chars))
        })
        .collect()
}

fn page_title(page: &WikiText) -> String {
    page.page_name().unwrap_or_default().to_string()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn list_templates(pages: &[WikiText], name: Option<&str>) -> Vec<FileReport<Template>> {
    pages
        .iter()
        .map(|page| {
            let mut finder = match name {
                Some(name) => page.templates(name),
                None => page.all_templates(),
            };
            let items: Vec<Template> = finder.by_ref().collect();
            FileReport {
                file: page_title(page),
                items,
                malformed: finder.diagnostics().len(),
            }
        })
        .collect()
}

fn list_tables(pages: &[WikiText]) -> Vec<FileReport<Table>> {
    pages
        .iter()
        .map(|page| {
            let mut finder = page.tables();
            let items: Vec<Table> = finder.by_ref().collect();
            FileReport {
                file: page_title(page),
                items,
                malformed: finder.diagnostics().len(),
            }
        })
        .collect()
}

fn list_links(pages: &[WikiText], link_type: Option<LinkType>) -> Vec<FileReport<Link>> {
    pages
        .iter()
        .map(|page| {
            let mut inner = page.inner_links();
            let mut external = page.external_links();
            let mut items: Vec<Link> = inner
                .by_ref()
                .map(Link::Internal)
                .chain(external.by_ref().map(Link::External))
                .filter(|l| link_type.is_none_or(|t| l.link_type() == t))
                .collect();
            items.sort_by_key(|l| l.span().start);
            FileReport {
                file: page_title(page),
                items,
                malformed: inner.diagnostics().len() + external.diagnostics().len(),
            }
        })
        .collect()
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Templates(args) => {
            let pages = load_pages(&FilePages::new(args.files.files), &config)?;
            print_json(&list_templates(&pages, args.name.as_deref()))
        }
        Commands::Tables(args) => {
            let pages = load_pages(&FilePages::new(args.files), &config)?;
            print_json(&list_tables(&pages))
        }
        Commands::Links(args) => {
            let pages = load_pages(&FilePages::new(args.files.files), &config)?;
            print_json(&list_links(&pages, args.link_type))
        }
        Commands::RemoveParam(args) => {
            let store = Arc::new(FilePages::new(args.files.files));
            let job = Arc::new(RemoveTemplateParam {
                template: args.template,
                key: args.key,
            });
            let outcomes = run_batch(store, job, &config, args.write).await?;
            if !args.write {
                for outcome in &outcomes {
                    if let Ok(Some(markup)) = &outcome.result {
                        println!("==> {} <==\n{}", outcome.title, markup);
                    }
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    if let Err(e) = run(cli, config).await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

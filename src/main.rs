use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use formwright_config::FormDef;
use formwright_graph::DependencyGraph;
use formwright_host::{
  DirectoryClient, GraphQlClient, HttpApiClient, ProcessEngine, QueryClient, RestProcessEngine,
  StaticDirectory, StaticQuery,
};
use formwright_runtime::Renderer;

/// Formwright - renders data-driven form schemas
#[derive(Parser)]
#[command(name = "formwright")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Base URL for relative API descriptor URLs
  #[arg(long, global = true, env = "FORMWRIGHT_API_BASE_URL")]
  api_base_url: Option<Url>,

  /// GraphQL endpoint for the primary query
  #[arg(long, global = true, env = "FORMWRIGHT_QUERY_ENDPOINT")]
  query_endpoint: Option<Url>,

  /// Process engine REST endpoint
  #[arg(long, global = true, env = "FORMWRIGHT_PROCESS_ENDPOINT")]
  process_endpoint: Option<Url>,

  /// Log at debug level unless RUST_LOG is set
  #[arg(long, short, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Render a form definition and print the hydrated components
  Render {
    /// Path to the form definition (JSON)
    form_file: PathBuf,

    /// Session context (JSON); read from stdin when omitted
    #[arg(long)]
    session: Option<PathBuf>,

    /// Use this document as the primary query result
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Directory groups (JSON map of group to members)
    #[arg(long)]
    directory: Option<PathBuf>,
  },

  /// Print the dependency plan of a form's API sources
  Plan {
    /// Path to the form definition (JSON)
    form_file: PathBuf,
  },

  /// Start or complete process instances
  Process {
    #[command(subcommand)]
    action: ProcessAction,
  },
}

#[derive(Subcommand)]
enum ProcessAction {
  /// Start a process instance
  Start {
    /// Process definition key
    definition_key: String,

    /// Variables (JSON object); read from stdin when omitted
    #[arg(long)]
    variables: Option<PathBuf>,
  },

  /// Complete the pending task of a process instance
  Complete {
    instance_id: String,

    /// Task definition key
    task_key: String,

    /// Variables (JSON object); read from stdin when omitted
    #[arg(long)]
    variables: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match cli.command {
    Some(Commands::Render {
      ref form_file,
      ref session,
      ref graph,
      ref directory,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(render(
        &cli,
        form_file,
        session.as_deref(),
        graph.as_deref(),
        directory.as_deref(),
      ))?;
    }
    Some(Commands::Plan { ref form_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(plan(form_file))?;
    }
    Some(Commands::Process { ref action }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(process(&cli, action))?;
    }
    None => {
      println!("formwright - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

async fn render(
  cli: &Cli,
  form_file: &Path,
  session_file: Option<&Path>,
  graph_file: Option<&Path>,
  directory_file: Option<&Path>,
) -> Result<()> {
  let form = load_form(form_file).await?;

  let session = match session_file {
    Some(path) => read_json(path, "session").await?,
    None => read_json_from_stdin("session")?,
  };

  let query: Arc<dyn QueryClient> = match (graph_file, &cli.query_endpoint) {
    (Some(path), _) => Arc::new(StaticQuery::new(read_json(path, "graph").await?)),
    (None, Some(endpoint)) => Arc::new(GraphQlClient::new(endpoint.clone())),
    (None, None) if form.query.is_some() => {
      bail!("form '{}' declares a query: pass --graph or --query-endpoint", form.form_id)
    }
    (None, None) => Arc::new(StaticQuery::default()),
  };

  let directory: Arc<dyn DirectoryClient> = match directory_file {
    Some(path) => Arc::new(
      StaticDirectory::from_file(path)
        .await
        .with_context(|| format!("failed to load directory file: {}", path.display()))?,
    ),
    None => Arc::new(StaticDirectory::default()),
  };

  let api = Arc::new(HttpApiClient::new(cli.api_base_url.clone()));
  let renderer = Renderer::new(query, api, directory);

  let output = renderer
    .render(&form, session)
    .await
    .with_context(|| format!("failed to render form '{}'", form.form_id))?;

  eprintln!(
    "Rendered {} ({} sources executed, {} stuck)",
    output.render_id,
    output.report.scheduler.executed.len(),
    output.report.scheduler.stuck.len()
  );

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn plan(form_file: &Path) -> Result<()> {
  let form = load_form(form_file).await?;
  let plan = DependencyGraph::new(&form.apis).plan();

  eprintln!(
    "Planned {} sources in {} batches",
    form.apis.len(),
    plan.batches.len()
  );
  println!("{}", serde_json::to_string_pretty(&plan)?);
  Ok(())
}

async fn process(cli: &Cli, action: &ProcessAction) -> Result<()> {
  let Some(endpoint) = &cli.process_endpoint else {
    bail!("no process engine configured: pass --process-endpoint");
  };
  let engine = RestProcessEngine::new(endpoint.clone());

  match action {
    ProcessAction::Start {
      definition_key,
      variables,
    } => {
      let variables = load_variables(variables.as_deref()).await?;
      let instance_id = engine
        .start(definition_key, &variables)
        .await
        .with_context(|| format!("failed to start process '{}'", definition_key))?;
      println!("{}", serde_json::json!({ "instanceId": instance_id }));
    }
    ProcessAction::Complete {
      instance_id,
      task_key,
      variables,
    } => {
      let variables = load_variables(variables.as_deref()).await?;
      engine
        .complete(instance_id, task_key, &variables)
        .await
        .with_context(|| {
          format!("failed to complete task '{}' of instance '{}'", task_key, instance_id)
        })?;
    }
  }

  Ok(())
}

async fn load_form(path: &Path) -> Result<FormDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read form file: {}", path.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse form file: {}", path.display()))
}

async fn load_variables(path: Option<&Path>) -> Result<serde_json::Map<String, serde_json::Value>> {
  let value = match path {
    Some(path) => read_json(path, "variables").await?,
    None => read_json_from_stdin("variables")?,
  };
  match value {
    serde_json::Value::Object(map) => Ok(map),
    other => bail!("variables must be a JSON object, got {}", other),
  }
}

async fn read_json(path: &Path, what: &str) -> Result<serde_json::Value> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read {} file: {}", what, path.display()))?;

  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse {} file: {}", what, path.display()))
}

fn read_json_from_stdin(what: &str) -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .with_context(|| format!("failed to read {} from stdin", what))?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).with_context(|| format!("failed to parse {} JSON from stdin", what))
    }
  }
}

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use permit_overlay::api::{ApiClient, ApiError};
use permit_overlay::config::{ApiConfig, EditorConfig};
use permit_overlay::context::{DocumentContext, JobData, SessionContext, allowed_forms, initial_form, non_blank};
use permit_overlay::error::EditorError;
use permit_overlay::fields::CompanyProfile;
use permit_overlay::loader::load_document;
use permit_overlay::packet::{PacketRequest, file_name_part, packet_file_name};
use permit_overlay::persist;
use permit_overlay::preset::PresetManager;
use permit_overlay::session::{Action, EditorCore, LoadOutcome};
use permit_overlay::storage::FileStore;
use permit_overlay::viewport::{PageNav, RasterPage, Rasterizer};
use serde_json::Value;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("expected a JSON array of layers in {0}")]
    NotALayerArray(PathBuf),
}

#[derive(Parser, Debug)]
#[command(name = "permit-cli", about = "Permit packet and form overlay CLI")]
struct Cli {
    /// Overrides `PERMIT_API_BASE`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `PERMIT_API_TIMEOUT_SECS`.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory holding the session and presets, one JSON file per scope.
    #[arg(long, env = "PERMIT_STATE_DIR", default_value = ".permit")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

struct CliContext {
    api: ApiClient,
    state: FileStore,
}

#[derive(Subcommand, Debug)]
enum Command {
    Company(CompanyCommand),
    Project(ProjectCommand),
    Packet(PacketCommand),
    Overlay(OverlayCommand),
    /// Print the stored session.
    Session,
}

#[derive(Args, Debug)]
struct CompanyCommand {
    #[command(subcommand)]
    command: CompanySubcommand,
}

#[derive(Subcommand, Debug)]
enum CompanySubcommand {
    List,
    Show {
        company_key: String,
    },
    /// Create or update a company and make it the session's company.
    Upsert(CompanyUpsertArgs),
}

#[derive(Args, Debug)]
struct CompanyUpsertArgs {
    company_key: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    license: Option<String>,
    #[arg(long)]
    qualifier: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct ProjectCommand {
    #[command(subcommand)]
    command: ProjectSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProjectSubcommand {
    Cities,
    /// Forms available for a city.
    Forms {
        city: String,
    },
    /// Download a blank form.
    Blank {
        city: String,
        form: String,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Store the permit selection and job data in the session.
    Select(ProjectSelectArgs),
    /// Generate the selected forms server-side.
    Generate,
    /// Projects generated so far.
    List,
}

#[derive(Args, Debug)]
struct ProjectSelectArgs {
    #[arg(long)]
    city: Option<String>,
    /// Form keys, comma separated.
    #[arg(long, value_delimiter = ',')]
    forms: Vec<String>,
    /// Form to open in the editor; defaults to the first selected form.
    #[arg(long)]
    form: Option<String>,
    #[arg(long)]
    project_name: Option<String>,
    #[arg(long)]
    job_address: Option<String>,
    #[arg(long)]
    job_zip: Option<String>,
    #[arg(long)]
    roof_category: Option<String>,
    #[arg(long)]
    roof_area_sqft: Option<String>,
}

#[derive(Args, Debug)]
struct PacketCommand {
    #[command(subcommand)]
    command: PacketSubcommand,
}

#[derive(Subcommand, Debug)]
enum PacketSubcommand {
    /// Generate and save the packet archive.
    Download {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OverlayCommand {
    #[command(flatten)]
    pages: PageArgs,

    #[command(subcommand)]
    command: OverlaySubcommand,
}

/// Page geometry used in place of a real rasterizer.
#[derive(Args, Debug, Clone, Copy)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pages: u32,
    /// Page width in document points.
    #[arg(long, default_value_t = 612.0)]
    page_width: f64,
    /// Page height in document points.
    #[arg(long, default_value_t = 792.0)]
    page_height: f64,
    #[arg(long, default_value_t = permit_overlay::consts::DEFAULT_RENDER_SCALE)]
    scale: f64,
}

#[derive(Subcommand, Debug)]
enum OverlaySubcommand {
    /// Resolved field values for the session's document.
    Fields,
    /// Layers after loading, in document space.
    Layers,
    /// Save the overlay as a company override.
    Push {
        /// Replace the layers with this JSON array (document space) first.
        #[arg(long)]
        layers: Option<PathBuf>,
    },
    Preset(PresetCommand),
}

#[derive(Args, Debug)]
struct PresetCommand {
    #[command(subcommand)]
    command: PresetSubcommand,
}

#[derive(Subcommand, Debug)]
enum PresetSubcommand {
    List,
    /// Save the `custom.*` layers of a JSON file (document space) as a preset.
    Save {
        name: String,
        #[arg(long)]
        layers: PathBuf,
    },
    /// Stamp a preset onto the current page and print the resulting layers.
    Apply {
        name: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Remove {
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ApiConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.trim().trim_end_matches('/').to_owned();
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    let ctx = CliContext { api: ApiClient::new(&config)?, state: FileStore::new(&cli.state_dir) };
    tracing::debug!(base_url = %ctx.api.base_url(), state_dir = %ctx.state.dir().display(), "cli configured");

    match cli.command {
        Command::Company(company) => run_company(ctx, company).await,
        Command::Project(project) => run_project(ctx, project).await,
        Command::Packet(packet) => run_packet(&ctx, packet).await,
        Command::Overlay(overlay) => run_overlay(ctx, overlay).await,
        Command::Session => print_json(&serde_json::to_value(SessionContext::load(&ctx.state))?),
    }
}

// =============================================================
// Company
// =============================================================

async fn run_company(mut ctx: CliContext, company: CompanyCommand) -> Result<(), CliError> {
    match company.command {
        CompanySubcommand::List => {
            let companies = ctx.api.companies().await?;
            print_json(&serde_json::to_value(companies)?)
        }
        CompanySubcommand::Show { company_key } => {
            let profile = ctx.api.company(&company_key).await?;
            print_json(&serde_json::to_value(profile)?)
        }
        CompanySubcommand::Upsert(args) => {
            let key = args.company_key.trim().to_owned();
            if key.is_empty() {
                return Err(EditorError::ContextIncomplete("company").into());
            }
            let profile = CompanyProfile {
                company_key: Some(key.clone()),
                name: args.name,
                license: args.license,
                qualifier: args.qualifier,
                address: args.address,
                phone: args.phone,
                email: args.email,
                ..CompanyProfile::default()
            };
            let saved = ctx.api.upsert_company(&key, &profile.upsert_data()).await?;
            SessionContext::patch(&mut ctx.state, |s| s.company_key = Some(key.clone()))?;
            tracing::info!(company = %key, "company saved and selected");
            print_json(&serde_json::to_value(saved)?)
        }
    }
}

// =============================================================
// Project
// =============================================================

async fn run_project(mut ctx: CliContext, project: ProjectCommand) -> Result<(), CliError> {
    match project.command {
        ProjectSubcommand::Cities => print_json(&serde_json::to_value(ctx.api.cities().await?)?),
        ProjectSubcommand::Forms { city } => print_json(&serde_json::to_value(ctx.api.forms(&city).await?)?),
        ProjectSubcommand::Blank { city, form, out_dir } => {
            let doc = DocumentContext::new(&city, &form);
            let bytes = ctx.api.template_blank(&doc).await?;
            write_file(&out_dir.join(blank_file_name(&doc)), &bytes).await
        }
        ProjectSubcommand::Select(args) => {
            let session = select_project(&mut ctx, args).await?;
            print_json(&serde_json::to_value(session)?)
        }
        ProjectSubcommand::Generate => {
            let request = PacketRequest::from_session(&SessionContext::load(&ctx.state))?;
            let result = ctx.api.generate_company(&request).await?;
            tracing::info!(company = %request.company_key, forms = request.form_keys.len(), "packet generated");
            print_json(&serde_json::to_value(result)?)
        }
        ProjectSubcommand::List => print_json(&serde_json::to_value(ctx.api.projects().await?)?),
    }
}

/// Local name for a downloaded blank form: `{city}_{form}.pdf`.
fn blank_file_name(doc: &DocumentContext) -> String {
    format!("{}_{}.pdf", file_name_part(Some(&doc.city), "city"), file_name_part(Some(&doc.form), "form"))
}

async fn select_project(ctx: &mut CliContext, args: ProjectSelectArgs) -> Result<SessionContext, CliError> {
    let current = SessionContext::load(&ctx.state);
    let city = match non_blank(args.city.as_deref()) {
        Some(city) => city.to_owned(),
        None => current.require_city()?.to_owned(),
    };

    let mut draft = current.clone();
    if !args.forms.is_empty() {
        draft.form_keys = args.forms.iter().map(|f| f.trim().to_owned()).filter(|f| !f.is_empty()).collect();
    }
    if args.form.is_some() {
        draft.form_key = args.form.clone();
    }
    let catalog = ctx.api.forms(&city).await?;
    let forms = allowed_forms(catalog, &draft);
    let form_key = initial_form(&forms, &draft).map(str::to_owned);

    let job = JobData {
        job_address: args.job_address.or(current.job_address).unwrap_or_default(),
        job_zip: args.job_zip.or(current.job_zip).unwrap_or_default(),
        roof_category: args.roof_category.or(current.roof_category).unwrap_or_default(),
        roof_area_sqft: args.roof_area_sqft.or(current.roof_area_sqft).unwrap_or_default(),
    };
    let session = SessionContext::patch(&mut ctx.state, |s| {
        s.city = Some(city);
        s.form_keys = draft.form_keys;
        s.form_key = form_key;
        if let Some(name) = args.project_name {
            s.project_name = Some(name.trim().to_owned());
        }
        s.set_job_data(&job);
    })?;
    tracing::info!(city = ?session.city, form = ?session.form_key, forms = session.form_keys.len(), "project selected");
    Ok(session)
}

// =============================================================
// Packet
// =============================================================

async fn run_packet(ctx: &CliContext, packet: PacketCommand) -> Result<(), CliError> {
    match packet.command {
        PacketSubcommand::Download { out_dir } => {
            let session = SessionContext::load(&ctx.state);
            let request = PacketRequest::from_session(&session)?;
            let bytes = ctx.api.download_company(&request).await?;
            write_file(&out_dir.join(packet_file_name(&session)), &bytes).await
        }
    }
}

// =============================================================
// Overlay
// =============================================================

/// Stand-in rasterizer: every page has the same size.
#[derive(Debug, Clone, Copy)]
struct FixedPages {
    pages: PageArgs,
    scale: f64,
}

impl FixedPages {
    fn new(pages: PageArgs, config: &EditorConfig) -> Self {
        let scale = if config.render_scale > 0.0 { config.render_scale } else { 1.0 };
        Self { pages, scale }
    }
}

impl Rasterizer for FixedPages {
    fn page_count(&self) -> u32 {
        self.pages.pages.max(1)
    }

    fn rasterize(&mut self, page: u32) -> Result<RasterPage, EditorError> {
        if page == 0 || page > self.page_count() {
            return Err(EditorError::RenderTargetMissing(format!("page {page}")));
        }
        Ok(RasterPage {
            width: self.pages.page_width * self.scale,
            height: self.pages.page_height * self.scale,
            scale: self.scale,
        })
    }
}

async fn run_overlay(ctx: CliContext, overlay: OverlayCommand) -> Result<(), CliError> {
    let session = SessionContext::load(&ctx.state);
    let mut core = EditorCore::new(EditorConfig { render_scale: overlay.pages.scale, ..EditorConfig::default() });
    let mut raster = FixedPages::new(overlay.pages, core.config());
    if load_document(&mut core, &ctx.api, &mut raster, &session).await? == LoadOutcome::Stale {
        return Ok(());
    }
    let mut presets = PresetManager::new(ctx.state);

    match overlay.command {
        OverlaySubcommand::Fields => print_json(&serde_json::to_value(core.fields())?),
        OverlaySubcommand::Layers => print_document_layers(&core),
        OverlaySubcommand::Push { layers } => {
            if let Some(path) = layers {
                replace_layers(&mut core, &path)?;
            }
            let payload = core.override_payload(&session)?;
            let response = ctx.api.save_override(&payload).await?;
            tracing::info!(company = %payload.company_key, form = %payload.form_key, layers = payload.layers.len(), "override saved");
            print_json(&response)
        }
        OverlaySubcommand::Preset(preset) => match preset.command {
            PresetSubcommand::List => {
                let names = core.document().map(|doc| presets.names(doc)).unwrap_or_default();
                print_json(&serde_json::to_value(names)?)
            }
            PresetSubcommand::Save { name, layers } => {
                replace_layers(&mut core, &layers)?;
                report(core.save_preset(&mut presets, &name)?);
                Ok(())
            }
            PresetSubcommand::Apply { name, page } => {
                core.navigate(&mut raster, PageNav::GoTo(page))?;
                report(core.apply_preset(&presets, &name)?);
                print_document_layers(&core)
            }
            PresetSubcommand::Remove { name } => {
                let removed = match core.document() {
                    Some(doc) => presets.remove(doc, &name)?,
                    None => false,
                };
                print_json(&Value::Bool(removed))
            }
        },
    }
}

/// Replace the editor's layers with a document-space JSON array read from `path`.
fn replace_layers(core: &mut EditorCore, path: &Path) -> Result<usize, CliError> {
    let text = std::fs::read_to_string(path)?;
    let Value::Array(records) = serde_json::from_str::<Value>(&text)? else {
        return Err(CliError::NotALayerArray(path.to_path_buf()));
    };
    let layers = persist::deserialize(&records, &core.viewport.frame());
    let count = layers.len();
    core.store.set_all(layers);
    Ok(count)
}

fn print_document_layers(core: &EditorCore) -> Result<(), CliError> {
    let wire = persist::serialize(core.layers(), &core.viewport.frame());
    print_json(&serde_json::to_value(wire)?)
}

fn report(actions: Vec<Action>) {
    for action in actions {
        if let Action::Status(text) = action {
            eprintln!("{text}");
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes).await?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "file written");
    println!("{}", path.display());
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

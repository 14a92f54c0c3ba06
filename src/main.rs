use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use recipebox::{
    ClientConfig, ClientError, Credential, FileStore, HttpBackend, ImageUpload, ProfileUpdate, RecipeDraft,
    RecipeQuery, SessionManager, SortKey,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

type Manager = SessionManager<HttpBackend, FileStore>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("could not read {}: {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("cannot infer image type of {}; pass --mime", .0.display())]
    UnknownImageType(PathBuf),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "recipebox", about = "Recipe sharing API client")]
struct Cli {
    #[arg(long, env = "RECIPEBOX_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "RECIPEBOX_CREDENTIAL_PATH")]
    credential_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Store a token obtained elsewhere.
    UseToken { token: String },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Print the session, plus the profile when logged in.
    Whoami,
    /// Change name, email, or password of the logged-in user.
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "RECIPEBOX_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Recipes(RecipesCommand),
    Favorites(FavoritesCommand),
}

#[derive(Args, Debug)]
struct RecipesCommand {
    #[command(subcommand)]
    command: RecipesSubcommand,
}

#[derive(Subcommand, Debug)]
enum RecipesSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, default_value = "newest")]
        sort: SortKey,
    },
    Show {
        recipe_id: String,
    },
    Mine,
    Create(DraftArgs),
    Update {
        recipe_id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete {
        recipe_id: String,
    },
    Rate {
        recipe_id: String,
        rating: u8,
    },
    Comment {
        recipe_id: String,
        text: String,
    },
    Upload {
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Args, Debug)]
struct DraftArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long = "ingredient", help = "Repeat once per ingredient")]
    ingredients: Vec<String>,
    #[arg(long, default_value = "")]
    instructions: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long, help = "Image URL, e.g. from `recipes upload`")]
    image: Option<String>,
}

impl From<DraftArgs> for RecipeDraft {
    fn from(args: DraftArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            ingredients: args.ingredients,
            instructions: args.instructions,
            category: args.category,
            tags: args.tags,
            image: args.image,
        }
    }
}

#[derive(Args, Debug)]
struct FavoritesCommand {
    #[command(subcommand)]
    command: FavoritesSubcommand,
}

#[derive(Subcommand, Debug)]
enum FavoritesSubcommand {
    List,
    Toggle { recipe_id: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_owned();
    }
    if let Some(path) = cli.credential_path {
        config.credential_path = path;
    }

    let backend = HttpBackend::from_config(&config)?;
    let store = FileStore::new(config.credential_path.clone());
    let mut session = SessionManager::new(backend, store).with_profile_fetch(config.fetch_profile);
    session.initialize().await;

    match cli.command {
        Command::Login { email, password } => print_json(&session.sign_in(&email, &password).await?),
        Command::UseToken { token } => print_json(&session.login(Credential::new(token, None))?),
        Command::Register { name, email, password } => {
            let user = session.register(&name, &email, &password).await?;
            print_json(&serde_json::json!({ "user": user, "session": session.session() }))
        }
        Command::Logout => {
            session.logout().await;
            print_json(&session.session())
        }
        Command::Whoami => run_whoami(&mut session).await,
        Command::UpdateProfile { name, email, password } => {
            let update = ProfileUpdate { name, email, password };
            print_json(session.update_profile(&update).await?)
        }
        Command::Recipes(recipes) => run_recipes(&mut session, recipes).await,
        Command::Favorites(favorites) => run_favorites(&mut session, favorites).await,
    }
}

async fn run_whoami(session: &mut Manager) -> Result<(), CliError> {
    if !session.is_logged_in() {
        return print_json(&session.session());
    }
    let profile = session.profile_or_fetch().await?.clone();
    print_json(&serde_json::json!({
        "session": session.session(),
        "profile": profile,
    }))
}

async fn run_recipes(session: &mut Manager, recipes: RecipesCommand) -> Result<(), CliError> {
    match recipes.command {
        RecipesSubcommand::List { search, category, tag, sort } => {
            let query = RecipeQuery { search, category, tag, sort };
            print_json(&session.search_recipes(&query).await?)
        }
        RecipesSubcommand::Show { recipe_id } => print_json(&session.get_recipe(&recipe_id).await?),
        RecipesSubcommand::Mine => print_json(&session.my_recipes().await?),
        RecipesSubcommand::Create(draft) => print_json(&session.create_recipe(&draft.into()).await?),
        RecipesSubcommand::Update { recipe_id, draft } => {
            print_json(&session.update_recipe(&recipe_id, &draft.into()).await?)
        }
        RecipesSubcommand::Delete { recipe_id } => {
            session.delete_recipe(&recipe_id).await?;
            print_json(&serde_json::json!({ "deleted": recipe_id }))
        }
        RecipesSubcommand::Rate { recipe_id, rating } => print_json(&session.rate_recipe(&recipe_id, rating).await?),
        RecipesSubcommand::Comment { recipe_id, text } => print_json(&session.add_comment(&recipe_id, &text).await?),
        RecipesSubcommand::Upload { path, mime } => {
            let image = read_image(path, mime)?;
            print_json(&session.upload_image(&image).await?)
        }
    }
}

async fn run_favorites(session: &mut Manager, favorites: FavoritesCommand) -> Result<(), CliError> {
    match favorites.command {
        FavoritesSubcommand::List => print_json(session.refresh_favorites().await?),
        FavoritesSubcommand::Toggle { recipe_id } => {
            let favorite = session.toggle_favorite(&recipe_id).await?;
            print_json(&serde_json::json!({ "recipe_id": recipe_id, "favorite": favorite }))
        }
    }
}

fn read_image(path: PathBuf, mime: Option<String>) -> Result<ImageUpload, CliError> {
    let mime = match mime {
        Some(mime) => mime,
        None => guess_mime(&path).ok_or_else(|| CliError::UnknownImageType(path.clone()))?.to_owned(),
    };
    let bytes = std::fs::read(&path).map_err(|source| CliError::ReadFile { path: path.clone(), source })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_owned(), |n| n.to_string_lossy().into_owned());
    Ok(ImageUpload { file_name, mime, bytes })
}

fn guess_mime(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

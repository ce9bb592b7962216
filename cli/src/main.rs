mod backend;
mod commands;
mod config;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::backend::{DEFAULT_TIMEOUT_SECS, HttpBackend};
use crate::commands::{
    Service, cmd_clear, cmd_deselect, cmd_ingredient_add, cmd_ingredient_delete,
    cmd_ingredient_edit, cmd_ingredient_list, cmd_list, cmd_manual_add, cmd_manual_remove,
    cmd_manual_sub, cmd_print, cmd_recipe_add, cmd_recipe_delete, cmd_recipe_edit,
    cmd_recipe_import, cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_set_ingredient,
    cmd_recipe_show, cmd_save, cmd_select, cmd_servings,
};
use crate::config::{Config, resolve_backend_url, set_backend_url};
use basket_core::models::{IngredientEdit, RecipeEdit};
use basket_core::service::ShoppingService;
use basket_core::store::Store;

#[derive(Parser)]
#[command(
    name = "basket",
    version,
    about = "Turn recipes into a shopping list",
    long_about = "Pick recipes from the catalog, scale their servings, add extra items by hand \
                  and get one merged shopping list you can print, save or export."
)]
struct Cli {
    /// Catalog backend base URL
    #[arg(long, global = true, env = "BASKET_BACKEND_URL")]
    backend: Option<String>,
    /// Backend request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage catalog recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage catalog ingredients
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Add a recipe to the shopping selection
    Select {
        /// Recipe name or ID
        recipe: String,
        /// Servings to shop for (defaults to the recipe's servings)
        #[arg(short, long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a recipe from the shopping selection
    Deselect {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change how many servings of a selected recipe to shop for
    Servings {
        /// Recipe name or ID
        recipe: String,
        /// Number of servings (at least 1)
        servings: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add or remove ingredients by hand
    Manual {
        #[command(subcommand)]
        command: ManualCommands,
    },
    /// Show the merged shopping list
    List {
        /// Also write the list as CSV to this path
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
        /// Print as a plain-text receipt
        #[arg(long)]
        receipt: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send the shopping list to the backend printer
    Print {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the shopping list on the backend
    Save {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear the selection and manual ingredients
    Clear {
        /// Only clear manual ingredients
        #[arg(long, conflicts_with = "selection_only")]
        manual_only: bool,
        /// Only clear the recipe selection
        #[arg(long)]
        selection_only: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change local settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List all recipes with their cost per serving
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe's ingredients and cost
    Show {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new recipe
    Add {
        /// Recipe name
        name: String,
        /// Preparation time in minutes
        #[arg(long)]
        prep_time: Option<u32>,
        /// Number of servings the recipe makes
        #[arg(short, long, default_value = "1")]
        servings: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a recipe's name, prep time or servings
    Edit {
        /// Recipe name or ID
        recipe: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New preparation time in minutes
        #[arg(long)]
        prep_time: Option<u32>,
        /// New default servings
        #[arg(short, long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe and its ingredient rows
    Delete {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe, or change its quantity
    SetIngredient {
        /// Recipe name or ID
        recipe: String,
        /// Ingredient name or ID
        ingredient: String,
        /// Quantity per serving
        quantity: f64,
        /// Unit label (e.g. g, ml, pcs)
        #[arg(short, long, default_value = "")]
        unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe name or ID
        recipe: String,
        /// Ingredient name or ID
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Recipe name override (defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Servings override (defaults to metadata servings)
        #[arg(long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// List/search catalog ingredients
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient
    Add {
        /// Ingredient name
        name: String,
        /// Cost per unit
        #[arg(long)]
        cost: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename an ingredient or change its cost
    Edit {
        /// Ingredient name or ID
        ingredient: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New cost per unit
        #[arg(long)]
        cost: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an ingredient no recipe uses
    Delete {
        /// Ingredient name or ID
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ManualCommands {
    /// Add one unit of an ingredient
    Add {
        /// Ingredient name or ID
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take one unit away (drops the entry at zero)
    Sub {
        /// Ingredient name or ID
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop an ingredient from the manual list
    Remove {
        /// Ingredient name or ID
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Remember a backend URL for later runs
    SetBackend {
        /// Base URL, e.g. http://pantry.local:5000
        url: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Load the catalog and put back the working set from the last run.
async fn connect(url: &str, timeout: Duration, store: &Store) -> Result<Service> {
    let backend = HttpBackend::new(url, timeout)?;
    let mut svc = ShoppingService::connect(backend)
        .await
        .with_context(|| format!("Could not load the catalog from {url}"))?;
    let saved = store.load_working_set()?;
    svc.restore(saved.selection, saved.manual);
    Ok(svc)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = Store::open(&config.db_path)?;
    let timeout = Duration::from_secs(cli.timeout.max(1));

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::SetBackend { url, json } => {
                let url = set_backend_url(&store, &url)?;
                if json {
                    println!("{}", serde_json::json!({ "backend_url": url }));
                } else {
                    println!("Backend set to {url}");
                }
                Ok(())
            }
            ConfigCommands::Show { json } => {
                let url = resolve_backend_url(cli.backend.as_deref(), &store)?;
                let last_saved = store.last_saved_at()?;
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "backend_url": url,
                            "data_dir": config.data_dir,
                            "db_path": config.db_path,
                            "working_set_saved_at": last_saved,
                        })
                    );
                } else {
                    println!("Backend:  {url}");
                    println!("Data dir: {}", config.data_dir.display());
                    println!("Database: {}", config.db_path.display());
                    if let Some(ts) = last_saved {
                        println!("Working set saved: {ts}");
                    }
                }
                Ok(())
            }
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let url = resolve_backend_url(cli.backend.as_deref(), &store)?;
            let svc = connect(&url, timeout, &store).await?;
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, store, port, &bind, api_key, new_api_key).await
        }
        command => {
            let url = resolve_backend_url(cli.backend.as_deref(), &store)?;
            let mut svc = connect(&url, timeout, &store).await?;
            let result = dispatch(&mut svc, command).await;
            let session = svc.session();
            store.save_working_set(session.selection().entries(), session.manual().entries())?;
            result
        }
    }
}

async fn dispatch(svc: &mut Service, command: Commands) -> Result<()> {
    match command {
        Commands::Recipe { command } => match command {
            RecipeCommands::List { json } => cmd_recipe_list(svc, json),
            RecipeCommands::Show { recipe, json } => cmd_recipe_show(svc, &recipe, json),
            RecipeCommands::Add {
                name,
                prep_time,
                servings,
                json,
            } => cmd_recipe_add(svc, &name, prep_time, servings, json).await,
            RecipeCommands::Edit {
                recipe,
                name,
                prep_time,
                servings,
                json,
            } => {
                let edit = RecipeEdit {
                    name,
                    prep_time_minutes: prep_time,
                    servings,
                };
                cmd_recipe_edit(svc, &recipe, edit, json).await
            }
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(svc, &recipe, json).await,
            RecipeCommands::SetIngredient {
                recipe,
                ingredient,
                quantity,
                unit,
                json,
            } => cmd_recipe_set_ingredient(svc, &recipe, &ingredient, quantity, &unit, json).await,
            RecipeCommands::RemoveIngredient {
                recipe,
                ingredient,
                json,
            } => cmd_recipe_remove_ingredient(svc, &recipe, &ingredient, json).await,
            RecipeCommands::Import {
                file,
                name,
                servings,
                json,
            } => cmd_recipe_import(svc, &file, name, servings, json).await,
        },
        Commands::Ingredient { command } => match command {
            IngredientCommands::List { search, json } => {
                cmd_ingredient_list(svc, search.as_deref(), json)
            }
            IngredientCommands::Add { name, cost, json } => {
                cmd_ingredient_add(svc, &name, cost, json).await
            }
            IngredientCommands::Edit {
                ingredient,
                name,
                cost,
                json,
            } => {
                let edit = IngredientEdit {
                    name,
                    cost_per_unit: cost,
                };
                cmd_ingredient_edit(svc, &ingredient, edit, json).await
            }
            IngredientCommands::Delete { ingredient, json } => {
                cmd_ingredient_delete(svc, &ingredient, json).await
            }
        },
        Commands::Select {
            recipe,
            servings,
            json,
        } => cmd_select(svc, &recipe, servings, json),
        Commands::Deselect { recipe, json } => cmd_deselect(svc, &recipe, json),
        Commands::Servings {
            recipe,
            servings,
            json,
        } => cmd_servings(svc, &recipe, servings, json),
        Commands::Manual { command } => match command {
            ManualCommands::Add { ingredient, json } => cmd_manual_add(svc, &ingredient, json),
            ManualCommands::Sub { ingredient, json } => cmd_manual_sub(svc, &ingredient, json),
            ManualCommands::Remove { ingredient, json } => {
                cmd_manual_remove(svc, &ingredient, json)
            }
        },
        Commands::List { csv, receipt, json } => cmd_list(svc, csv.as_deref(), receipt, json),
        Commands::Print { json } => cmd_print(svc, json).await,
        Commands::Save { json } => cmd_save(svc, json).await,
        Commands::Clear {
            manual_only,
            selection_only,
            json,
        } => cmd_clear(svc, manual_only, selection_only, json),
        Commands::Config { .. } | Commands::Serve { .. } => {
            anyhow::bail!("This command does not run against the catalog")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_select_with_servings() {
        let cli = Cli::try_parse_from(["basket", "select", "Soup", "--servings", "4"]).unwrap();
        match cli.command {
            Commands::Select {
                recipe, servings, ..
            } => {
                assert_eq!(recipe, "Soup");
                assert_eq!(servings, Some(4));
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn test_clear_flags_conflict() {
        assert!(
            Cli::try_parse_from(["basket", "clear", "--manual-only", "--selection-only"]).is_err()
        );
    }

    #[test]
    fn test_global_backend_flag() {
        let cli = Cli::try_parse_from([
            "basket",
            "list",
            "--backend",
            "http://pantry:5000",
            "--timeout",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("http://pantry:5000"));
        assert_eq!(cli.timeout, 3);
    }
}

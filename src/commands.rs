use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, warn};

use brixie::api::{HttpTransport, RebrickableClient, SetQuery, ThemeQuery};
use brixie::cache::{CachingGateway, ResponseCache};
use brixie::catalog::{SetEntity, SetRepository, ThemeEntity, ThemeRepository};
use brixie::config::Config;
use brixie::db::{Database, SetFilter, ThemeFilter};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Browse, refresh and favorite sets
  #[command(subcommand)]
  Sets(SetsCommand),
  /// Browse and refresh themes
  #[command(subcommand)]
  Themes(ThemesCommand),
  /// Delete all locally stored sets and themes
  Clear,
}

#[derive(Subcommand, Debug)]
pub enum SetsCommand {
  /// List locally stored sets
  List {
    #[arg(long)]
    theme: Option<i64>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    favorites: bool,
  },
  /// Fetch a page of sets from the catalog service
  Refresh(SetRefreshArgs),
  /// Show a single set
  Show {
    set_num: String,
    /// Fetch the latest version first
    #[arg(long)]
    refresh: bool,
  },
  /// Toggle the favorite flag of a stored set
  Favorite { set_num: String },
  /// Print the set list every time it changes, until interrupted
  Watch {
    #[arg(long)]
    favorites: bool,
  },
}

#[derive(Args, Debug)]
pub struct SetRefreshArgs {
  #[arg(long)]
  page: Option<u32>,
  #[arg(long)]
  page_size: Option<u32>,
  #[arg(long)]
  ordering: Option<String>,
  #[arg(long)]
  theme: Option<i64>,
  #[arg(long)]
  min_year: Option<i32>,
  #[arg(long)]
  max_year: Option<i32>,
  #[arg(long)]
  min_parts: Option<i32>,
  #[arg(long)]
  max_parts: Option<i32>,
  #[arg(long)]
  search: Option<String>,
}

impl From<SetRefreshArgs> for SetQuery {
  fn from(args: SetRefreshArgs) -> Self {
    SetQuery {
      page: args.page,
      page_size: args.page_size,
      ordering: args.ordering,
      theme_id: args.theme,
      min_year: args.min_year,
      max_year: args.max_year,
      min_parts: args.min_parts,
      max_parts: args.max_parts,
      search: args.search,
    }
  }
}

#[derive(Subcommand, Debug)]
pub enum ThemesCommand {
  /// List locally stored themes
  List {
    /// Only top-level themes
    #[arg(long, conflicts_with = "parent")]
    roots: bool,
    /// Only children of this theme
    #[arg(long)]
    parent: Option<i64>,
    #[arg(long)]
    search: Option<String>,
  },
  /// Fetch a page of themes from the catalog service
  Refresh {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long)]
    ordering: Option<String>,
  },
  /// Show a single theme
  Show {
    id: i64,
    #[arg(long)]
    refresh: bool,
  },
}

/// Components shared by all commands, built once from the configuration.
pub struct Context {
  sets: SetRepository,
  themes: ThemeRepository,
  gateway: Arc<CachingGateway<HttpTransport>>,
}

impl Context {
  pub fn build(config: &Config) -> Result<Self> {
    if config.api.api_key.is_none() {
      warn!("No API key configured; catalog requests will likely be rejected");
    }

    let db = Arc::new(Database::open(&config.database.resolve_path()?)?);
    let transport = HttpTransport::new(&config.api)?;
    let cache = Arc::new(ResponseCache::new(config.cache.clone()));
    let gateway = Arc::new(CachingGateway::new(transport, cache));
    let client = Arc::new(RebrickableClient::new(gateway.clone()));

    Ok(Self {
      sets: SetRepository::new(client.clone(), db.clone()),
      themes: ThemeRepository::new(client, db),
      gateway,
    })
  }
}

pub async fn run(ctx: &Context, command: Command) -> Result<()> {
  let result = match command {
    Command::Sets(cmd) => run_sets(ctx, cmd).await,
    Command::Themes(cmd) => run_themes(ctx, cmd).await,
    Command::Clear => {
      ctx.sets.clear()?;
      ctx.themes.clear()?;
      println!("Local catalog cleared");
      Ok(())
    }
  };

  debug!(
    hits = ctx.gateway.hits(),
    misses = ctx.gateway.misses(),
    entries = ctx.gateway.cache().len(),
    "Response cache usage"
  );
  result
}

async fn run_sets(ctx: &Context, cmd: SetsCommand) -> Result<()> {
  match cmd {
    SetsCommand::List {
      theme,
      search,
      favorites,
    } => {
      let filter = if favorites {
        SetFilter::Favorites
      } else if let Some(query) = search {
        SetFilter::Search(query)
      } else if let Some(theme_id) = theme {
        SetFilter::Theme(theme_id)
      } else {
        SetFilter::All
      };

      let sets = ctx.sets.observe(filter).next().await.unwrap_or_default();
      print_sets(&sets);
    }
    SetsCommand::Refresh(args) => {
      let stored = ctx.sets.refresh(&args.into()).await?;
      println!("Stored {} sets", stored);
    }
    SetsCommand::Show { set_num, refresh } => {
      let set = if refresh {
        ctx.sets.refresh_one(&set_num).await?
      } else {
        ctx.sets.get_by_id(&set_num)
      };
      match set {
        Some(set) => print_set_detail(&set),
        None => return Err(eyre!("Set {} not found", set_num)),
      }
    }
    SetsCommand::Favorite { set_num } => match ctx.sets.toggle_favorite(&set_num)? {
      Some(true) => println!("{} added to favorites", set_num),
      Some(false) => println!("{} removed from favorites", set_num),
      None => return Err(eyre!("Set {} is not stored locally; refresh it first", set_num)),
    },
    SetsCommand::Watch { favorites } => {
      let mut stream = if favorites {
        ctx.sets.observe_favorites()
      } else {
        ctx.sets.observe_all()
      };

      loop {
        tokio::select! {
          next = stream.next() => match next {
            Some(sets) => {
              println!("--- {} sets ---", sets.len());
              print_sets(&sets);
            }
            None => break,
          },
          _ = tokio::signal::ctrl_c() => break,
        }
      }
    }
  }
  Ok(())
}

async fn run_themes(ctx: &Context, cmd: ThemesCommand) -> Result<()> {
  match cmd {
    ThemesCommand::List {
      roots,
      parent,
      search,
    } => {
      let filter = match (roots, parent, search) {
        (true, _, _) => ThemeFilter::Roots,
        (_, Some(parent_id), _) => ThemeFilter::Children(parent_id),
        (_, _, Some(query)) => ThemeFilter::Search(query),
        _ => ThemeFilter::All,
      };

      let themes = ctx.themes.observe(filter).next().await.unwrap_or_default();
      print_themes(&themes);
    }
    ThemesCommand::Refresh {
      page,
      page_size,
      ordering,
    } => {
      let query = ThemeQuery {
        page,
        page_size,
        ordering,
      };
      let stored = ctx.themes.refresh(&query).await?;
      println!("Stored {} themes", stored);
    }
    ThemesCommand::Show { id, refresh } => {
      let theme = if refresh {
        ctx.themes.refresh_one(id).await?
      } else {
        ctx.themes.get_by_id(id)
      };
      match theme {
        Some(theme) => print_themes(std::slice::from_ref(&theme)),
        None => return Err(eyre!("Theme {} not found", id)),
      }
    }
  }
  Ok(())
}

fn print_sets(sets: &[SetEntity]) {
  for set in sets {
    println!(
      "{} {:<12} {:<6} {}",
      if set.is_favorite { "*" } else { " " },
      set.set_num,
      set.year.map(|y| y.to_string()).unwrap_or_default(),
      set.name.as_deref().unwrap_or("-"),
    );
  }
}

fn print_set_detail(set: &SetEntity) {
  println!("{}", set.name.as_deref().unwrap_or(&set.set_num));
  println!("  number:    {}", set.set_num);
  if let Some(year) = set.year {
    println!("  year:      {}", year);
  }
  if let Some(theme_id) = set.theme_id {
    println!("  theme:     {}", theme_id);
  }
  if let Some(parts) = set.num_parts {
    println!("  parts:     {}", parts);
  }
  if let Some(url) = &set.set_url {
    println!("  url:       {}", url);
  }
  println!("  favorite:  {}", if set.is_favorite { "yes" } else { "no" });
  println!("  cached at: {}", set.cached_at.format("%Y-%m-%d %H:%M:%S"));
}

fn print_themes(themes: &[ThemeEntity]) {
  for theme in themes {
    let parent = theme
      .parent_id
      .map(|p| format!("(parent {})", p))
      .unwrap_or_default();
    println!(
      "{:>6} {} {}",
      theme.id,
      theme.name.as_deref().unwrap_or("-"),
      parent
    );
  }
}

use std::error::Error;

use clap::{Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use inkpress_cli::client::ApiClient;
use inkpress_cli::feed::CommentFeed;
use inkpress_cli::search::{DEFAULT_PAGE_SIZE, SearchController};
use inkpress_cli::session::{SessionProvider, TokenStore};
use inkpress_cli::types::{Comment, NewPost, SearchFilters, VoteDirection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(about = "Read, write and discuss posts on an Inkpress blog")]
struct Cli {
    /// Base URL for the Inkpress service
    #[arg(long, env = "INKPRESS_URL")]
    url: Url,

    /// Public API key sent with every request
    #[arg(long, env = "INKPRESS_API_KEY")]
    api_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Vote {
    Up,
    Down,
}

impl From<Vote> for VoteDirection {
    fn from(vote: Vote) -> Self {
        match vote {
            Vote::Up => VoteDirection::Up,
            Vote::Down => VoteDirection::Down,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup { email: String, password: String },
    /// Sign in and remember the session
    Signin { email: String, password: String },
    /// End the stored session
    Signout,
    /// Show the signed-in user
    Whoami,
    /// List posts, newest first
    Posts {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
        /// Only posts whose title or content contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one post with its related posts and comments
    Show {
        id: i32,
        /// Do not count this read as a view
        #[arg(long)]
        no_view: bool,
    },
    /// Publish a new post
    Publish {
        title: String,
        content: String,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long)]
        category: Option<i32>,
        #[arg(short, long = "tag")]
        tags: Vec<i32>,
        #[arg(short, long)]
        excerpt: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Replace the title and content of one of your posts
    Edit {
        id: i32,
        title: String,
        content: String,
    },
    /// Remove one of your posts
    Unpublish { id: i32 },
    /// Search posts with optional filters
    Search {
        query: String,
        #[arg(long)]
        category: Option<i32>,
        #[arg(long)]
        tag: Option<i32>,
        #[arg(long)]
        author: Option<String>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },
    /// Comment on a post
    Comment { post_id: i32, content: String },
    /// Reply to a comment
    Reply { comment_id: i32, content: String },
    /// Vote on a comment
    Vote {
        comment_id: i32,
        #[arg(value_enum)]
        direction: Vote,
    },
    /// Like a post, or take the like back
    Like { post_id: i32 },
    /// Bookmark a post, or remove the bookmark with --remove
    Bookmark {
        post_id: i32,
        #[arg(long)]
        remove: bool,
    },
    /// List bookmarked posts
    Bookmarks {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// List tags, or create one
    Tags {
        #[arg(long)]
        create: Option<String>,
    },
    /// List categories, or create one
    Categories {
        #[arg(long)]
        create: Option<String>,
    },
    /// Set your display name and bio
    Profile {
        display_name: String,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Views, likes and comments for your posts
    Analytics,
    /// Subscribe an address to the newsletter
    Subscribe { email: String },
    /// Print a share link for a post
    Share {
        post_id: i32,
        platform: String,
        /// Public URL of the post page
        page_url: String,
    },
    /// Follow the comments on a post as they are written
    Watch { post_id: i32 },
    /// Interactive search: each stdin line updates the query
    Find,
}

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

#[tokio::main]
async fn main() -> CliResult {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "inkpress_cli=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let store = TokenStore::default_location();
    let stored = match &store {
        Some(store) => store.load().unwrap_or_else(|err| {
            warn!(error = %err, "Ignoring stored session");
            None
        }),
        None => None,
    };

    let anonymous = ApiClient::new(cli.url, cli.api_key);
    let client = anonymous
        .clone()
        .with_token(stored.as_ref().map(|s| s.access_token.clone()));

    match cli.command {
        Commands::Signup { email, password } => {
            let provider = SessionProvider::new(anonymous);
            let user = provider.sign_up(&email, &password).await?;
            match (provider.session().await, &store) {
                (Some(session), Some(store)) => {
                    store.save(&session)?;
                    println!("Signed up and signed in as {}", user.email);
                }
                (Some(_), None) => println!("Signed up as {} (session not saved)", user.email),
                (None, _) => println!("Signed up as {}; confirm your email to sign in", user.email),
            }
        }
        Commands::Signin { email, password } => {
            let provider = SessionProvider::new(anonymous);
            let user = provider.sign_in(&email, &password).await?;
            if let (Some(session), Some(store)) = (provider.session().await, &store) {
                store.save(&session)?;
            }
            println!("Signed in as {}", user.email);
        }
        Commands::Signout => {
            let Some(session) = stored else {
                println!("Not signed in");
                return Ok(());
            };
            let provider = SessionProvider::new(anonymous);
            if provider.restore(session).await?.is_some() {
                provider.sign_out().await?;
            }
            if let Some(store) = &store {
                store.clear()?;
            }
            println!("Signed out");
        }
        Commands::Whoami => match stored {
            Some(session) => {
                let provider = SessionProvider::new(anonymous);
                match provider.restore(session).await? {
                    Some(user) => println!("{} ({})", user.email, user.id),
                    None => println!("Session expired; sign in again"),
                }
            }
            None => println!("Not signed in"),
        },
        Commands::Posts {
            page,
            limit,
            search,
        } => {
            let posts = client.list_posts(page, limit, search.as_deref()).await?;
            println!("Page {} ({} posts total)", posts.page, posts.total);
            for post in posts.items {
                println!(
                    "#{:<5} {}  by {}  {}",
                    post.id,
                    post.title,
                    post.author,
                    post.created_at.format("%Y-%m-%d")
                );
                if let Some(excerpt) = post.excerpt {
                    println!("       {excerpt}");
                }
            }
        }
        Commands::Show { id, no_view } => show_post(&client, id, !no_view).await?,
        Commands::Publish {
            title,
            content,
            author,
            category,
            tags,
            excerpt,
            image_url,
        } => {
            let post = client
                .create_post(&NewPost {
                    title,
                    content,
                    author,
                    category_id: category,
                    tag_ids: tags,
                    image_url,
                    excerpt,
                })
                .await?;
            println!("Published post #{}", post.id);
        }
        Commands::Edit { id, title, content } => {
            let post = client.update_post(id, &title, &content).await?;
            println!("Updated post #{}", post.id);
        }
        Commands::Unpublish { id } => {
            client.delete_post(id).await?;
            println!("Deleted post #{id}");
        }
        Commands::Search {
            query,
            category,
            tag,
            author,
            page,
            limit,
        } => {
            let request = inkpress_cli::types::SearchRequest {
                query,
                filters: SearchFilters {
                    category,
                    tag,
                    author,
                },
                page,
                limit,
            };
            print_search(&client, &request).await?;
        }
        Commands::Comment { post_id, content } => {
            let comment = client.add_comment(post_id, &content).await?;
            println!("Comment #{} added", comment.id);
        }
        Commands::Reply {
            comment_id,
            content,
        } => {
            let reply = client.reply(comment_id, &content).await?;
            println!("Reply #{} added to comment #{comment_id}", reply.id);
        }
        Commands::Vote {
            comment_id,
            direction,
        } => {
            let result = client.vote(comment_id, direction.into()).await?;
            println!("Comment #{comment_id} now has {} votes", result.votes);
        }
        Commands::Like { post_id } => {
            let toggle = client.toggle_like(post_id).await?;
            let verb = if toggle.liked { "Liked" } else { "Unliked" };
            println!("{verb} post #{post_id} ({} likes)", toggle.likes);
        }
        Commands::Bookmark { post_id, remove } => {
            let status = if remove {
                client.unbookmark(post_id).await?
            } else {
                client.bookmark(post_id).await?
            };
            let state = if status.bookmarked { "bookmarked" } else { "not bookmarked" };
            println!("Post #{} is {state}", status.post_id);
        }
        Commands::Bookmarks { page } => {
            let posts = client.bookmarks(page, DEFAULT_PAGE_SIZE).await?;
            for post in posts.items {
                println!("#{:<5} {}", post.id, post.title);
            }
        }
        Commands::Tags { create } => {
            if let Some(name) = create {
                let tag = client.create_tag(&name).await?;
                println!("Created tag #{} ({})", tag.id, tag.slug);
            }
            for tag in client.tags().await? {
                println!("#{:<4} {} ({})", tag.id, tag.name, tag.slug);
            }
        }
        Commands::Categories { create } => {
            if let Some(name) = create {
                let category = client.create_category(&name).await?;
                println!("Created category #{} ({})", category.id, category.slug);
            }
            for category in client.categories().await? {
                println!("#{:<4} {} ({})", category.id, category.name, category.slug);
            }
        }
        Commands::Profile {
            display_name,
            bio,
            avatar_url,
        } => {
            let profile = client
                .save_profile(&display_name, bio.as_deref(), avatar_url.as_deref())
                .await?;
            println!("Profile saved for {}", profile.display_name);
        }
        Commands::Analytics => {
            println!("{:<6} {:<32} {:>6} {:>6} {:>8}", "id", "title", "views", "likes", "comments");
            for row in client.analytics().await? {
                println!(
                    "{:<6} {:<32} {:>6} {:>6} {:>8}",
                    row.post_id, row.title, row.views, row.likes, row.comments
                );
            }
        }
        Commands::Subscribe { email } => {
            anonymous.subscribe(&email).await?;
            println!("Subscribed {email}");
        }
        Commands::Share {
            post_id,
            platform,
            page_url,
        } => {
            let link = client.share_link(post_id, &platform, &page_url).await?;
            println!("{}", link.share_url);
        }
        Commands::Watch { post_id } => watch_comments(&client, post_id).await?,
        Commands::Find => interactive_search(client).await?,
    }

    Ok(())
}

async fn show_post(client: &ApiClient, id: i32, count_view: bool) -> CliResult {
    let post = client.get_post(id).await?;
    if count_view {
        if let Err(err) = client.increment_views(id).await {
            warn!(error = %err, "Could not record view");
        }
    }

    println!("{}", post.post.title);
    println!(
        "by {} on {}  ·  {}  ·  {} likes",
        post.post.author,
        post.post.created_at.format("%Y-%m-%d"),
        post.reading_time,
        post.post.likes
    );
    if let Some(category) = &post.category {
        println!("Category: {}", category.name);
    }
    if !post.tags.is_empty() {
        let tags: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
        println!("Tags: {}", tags.join(", "));
    }
    println!("\n{}\n", post.post.content);

    let related = client.related(id).await?;
    if !related.is_empty() {
        println!("Related:");
        for item in related {
            println!("  #{} {}", item.id, item.title);
        }
    }

    let comments = client.comments(id).await?;
    println!("{} comments", comments.len());
    for comment in comments {
        print_comment(&comment);
    }
    Ok(())
}

fn print_comment(comment: &Comment) {
    let indent = if comment.parent_id.is_some() { "    " } else { "  " };
    println!(
        "{indent}[{}] {} ({:+}): {}",
        comment.id, comment.author, comment.votes, comment.content
    );
}

async fn print_search(
    client: &ApiClient,
    request: &inkpress_cli::types::SearchRequest,
) -> CliResult {
    let results = client.search(request).await?;
    println!(
        "{} results for \"{}\" (page {})",
        results.total, request.query, results.page
    );
    for post in results.items {
        println!("#{:<5} {}  by {}", post.id, post.title, post.author);
    }
    Ok(())
}

async fn watch_comments(client: &ApiClient, post_id: i32) -> CliResult {
    // Subscribe before fetching so nothing written in between is missed.
    let stream = client.comment_stream(post_id).await?;
    tokio::pin!(stream);

    let mut feed = CommentFeed::new(post_id);
    feed.extend_fetched(client.comments(post_id).await?);
    for comment in feed.iter() {
        print_comment(comment);
    }

    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(comment)) => {
                    let id = comment.id;
                    if feed.push(comment) {
                        if let Some(comment) = feed.get(id) {
                            print_comment(comment);
                        }
                    }
                }
                Some(Err(err)) => warn!(error = %err, "Dropped malformed event"),
                None => {
                    debug!("Comment stream closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn interactive_search(client: ApiClient) -> CliResult {
    let (search, mut requests, task) = SearchController::spawn(DEFAULT_PAGE_SIZE);

    let runner = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            if let Err(err) = print_search(&client, &request).await {
                eprintln!("Search failed: {err}");
            }
        }
    });

    eprintln!("Type to search. Commands: :page N, :category N, :tag N, :author NAME, :clear");
    let mut filters = SearchFilters::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, argument) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            ":page" => match argument.parse() {
                Ok(page) => search.set_page(page),
                Err(_) => eprintln!("Page must be a number"),
            },
            ":category" => {
                filters.category = argument.parse().ok();
                search.set_filters(filters.clone());
            }
            ":tag" => {
                filters.tag = argument.parse().ok();
                search.set_filters(filters.clone());
            }
            ":author" => {
                filters.author = Some(argument.to_string()).filter(|a| !a.is_empty());
                search.set_filters(filters.clone());
            }
            ":clear" => {
                filters = SearchFilters::default();
                search.set_filters(filters.clone());
            }
            _ => search.set_query(line),
        }
    }

    drop(search);
    task.await?;
    runner.await?;
    Ok(())
}

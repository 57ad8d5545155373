use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::PgPool;

use crate::databases::books::{self, BookRow};

static PRICE_LIMIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"under\s*₹?([0-9]+)").expect("valid regex"));
static LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"books?.*in\s+([a-z0-9\s]+)").expect("valid regex"));

const GREETING: &str = "Hi! I'm the Book Circle AI Assistant. I can help with FAQs like posting books, searching, or navigating the site. What can I assist you with?";

const PRICE_RESULTS: i64 = 5;
const LOCATION_RESULTS: i64 = 5;
const SUGGESTION_RESULTS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Profile,
    Cart,
    Home,
    Messages,
}

impl Page {
    pub fn path(self) -> &'static str {
        match self {
            Page::Profile => "profile.html",
            Page::Cart => "profile.html#cart",
            Page::Home => "home.html",
            Page::Messages => "messages.html",
        }
    }

    fn announcement(self) -> &'static str {
        match self {
            Page::Profile => "Redirecting to your Profile page...",
            Page::Cart => "Redirecting to your Cart...",
            Page::Home => "Redirecting to Home page...",
            Page::Messages => "Redirecting to Messages page...",
        }
    }
}

/// What the visitor asked for. The first matching rule wins.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    PostBookHelp,
    BooksUnder(u64),
    PriceSearchHelp,
    Navigate(Page),
    NavigationHelp,
    BooksIn(String),
    Suggest(Vec<String>),
    Greeting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BotReply {
    Text { message: String },
    Navigation { page: String, message: String },
}

impl BotReply {
    fn text(message: impl Into<String>) -> Self {
        BotReply::Text { message: message.into() }
    }
}

pub fn classify(message: &str) -> Intent {
    let msg = message.trim().to_lowercase();

    if msg.contains("post") && msg.contains("book") {
        return Intent::PostBookHelp;
    }

    if msg.contains("search") && msg.contains("under") {
        return PRICE_LIMIT
            .captures(&msg)
            // digits only, so the parse can fail only on overflow
            .map(|caps| Intent::BooksUnder(caps[1].parse::<u64>().unwrap_or(u64::MAX)))
            .unwrap_or(Intent::PriceSearchHelp);
    }

    if msg.contains("go to") || msg.contains("show") {
        let page = if msg.contains("profile") {
            Some(Page::Profile)
        } else if msg.contains("cart") {
            Some(Page::Cart)
        } else if msg.contains("home") {
            Some(Page::Home)
        } else if msg.contains("message") {
            Some(Page::Messages)
        } else {
            None
        };
        return page.map(Intent::Navigate).unwrap_or(Intent::NavigationHelp);
    }

    if let Some(caps) = LOCATION.captures(&msg) {
        let location = caps[1].trim();
        if !location.is_empty() {
            return Intent::BooksIn(location.to_string());
        }
    }

    let keywords: Vec<String> = msg
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_string)
        .collect();
    if !keywords.is_empty() {
        return Intent::Suggest(keywords);
    }

    Intent::Greeting
}

impl Intent {
    /// Replies that need no catalogue lookup.
    pub fn static_reply(&self) -> Option<BotReply> {
        let reply = match self {
            Intent::PostBookHelp => BotReply::text(
                "To post a book: Go to your Profile page, fill in the book details (title, author, price, location, description), upload an image if available, and click 'Post Book'.",
            ),
            Intent::PriceSearchHelp => BotReply::text(
                "To search for books under a price: Use the search bar on the Home page and select a price filter.",
            ),
            Intent::Navigate(page) => BotReply::Navigation {
                page: page.path().to_string(),
                message: page.announcement().to_string(),
            },
            Intent::NavigationHelp => BotReply::text(
                "I can help you navigate to Profile, Home, Messages, or Cart. What page would you like to go to?",
            ),
            Intent::Greeting => BotReply::text(GREETING),
            Intent::BooksUnder(_) | Intent::BooksIn(_) | Intent::Suggest(_) => return None,
        };
        Some(reply)
    }
}

fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.fract() == 0.0 => format!("{}", p as i64),
        Some(p) => format!("{}", p),
        None => "N/A".to_string(),
    }
}

fn describe(book: &BookRow, with_location: bool) -> String {
    let title = book.title.as_deref().unwrap_or("Untitled");
    let author = book.author.as_deref().unwrap_or("unknown author");
    let price = format_price(book.price);

    if with_location {
        let location = book.location.as_deref().unwrap_or("unknown location");
        format!("{} by {} - ₹{} ({})", title, author, price, location)
    } else {
        format!("{} by {} - ₹{}", title, author, price)
    }
}

fn list(books: &[BookRow], with_location: bool) -> String {
    books
        .iter()
        .map(|b| describe(b, with_location))
        .collect::<Vec<_>>()
        .join("; ")
}

pub async fn reply(pool: &PgPool, message: &str) -> Result<BotReply, sqlx::Error> {
    let intent = classify(message);
    debug!("chatbot intent: {:?}", intent);

    let reply = match intent {
        Intent::BooksUnder(max_price) => {
            let found = books::books_under_price(pool, max_price as f64, PRICE_RESULTS).await?;
            let listed = if found.is_empty() {
                "No books found.".to_string()
            } else {
                list(&found, true)
            };
            BotReply::text(format!("Books under ₹{}: {}", max_price, listed))
        }
        Intent::BooksIn(location) => {
            let found = books::books_in_location(pool, &location, LOCATION_RESULTS).await?;
            if found.is_empty() {
                BotReply::text(format!("Sorry, no books found in {}.", location))
            } else {
                BotReply::text(format!("Books available in {}: {}", location, list(&found, true)))
            }
        }
        Intent::Suggest(keywords) => {
            let found = books::books_matching_keywords(pool, &keywords, SUGGESTION_RESULTS).await?;
            if found.is_empty() {
                BotReply::text(
                    "I'm sorry, I couldn't find books matching your query. Try searching on the Home page or ask about posting books, searching, or navigation.",
                )
            } else {
                BotReply::text(format!(
                    "Based on your interest in \"{}\", here are some book suggestions: {}",
                    keywords.join(", "),
                    list(&found, false)
                ))
            }
        }
        other => other.static_reply().unwrap_or_else(|| BotReply::text(GREETING)),
    };

    Ok(reply)
}

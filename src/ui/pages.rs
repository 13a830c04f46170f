//! Server-rendered page shells.
//!
//! Pages are minimal: a navbar carrying the theme toggle and avatar, and a
//! body per surface. The rich-text editor itself is a client-side widget
//! mounted into `#editor`; it is not rendered here.
//!
//! Templates live in `templates/` and are rendered with `minijinja`. Their
//! `.html` names turn on HTML auto-escaping for every interpolated value.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use super::theme::Theme;
use crate::services::github::Repository;
use crate::services::session::Identity;

pub const APP_NAME: &str = "DailyCommit";

const LAYOUT: &str = include_str!("../../templates/layout.html");
const LOGIN: &str = include_str!("../../templates/login.html");
const HOME: &str = include_str!("../../templates/home.html");
const EDITOR: &str = include_str!("../../templates/editor.html");

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.add_template("layout.html", LAYOUT)?;
    env.add_template("login.html", LOGIN)?;
    env.add_template("home.html", HOME)?;
    env.add_template("editor.html", EDITOR)?;
    Ok(env)
}

/// Navbar and `<head>` values shared by every page.
#[derive(Serialize)]
struct Chrome<'a> {
    app_name: &'static str,
    theme: &'static str,
    toggle_label: &'static str,
    title: &'a str,
    identity: Option<&'a Identity>,
}

impl<'a> Chrome<'a> {
    fn new(theme: Theme, identity: Option<&'a Identity>, title: &'a str) -> Self {
        Self {
            app_name: APP_NAME,
            theme: theme.as_str(),
            toggle_label: theme.toggle_label(),
            title,
            identity,
        }
    }
}

#[derive(Serialize)]
struct Page<'a, B: Serialize> {
    #[serde(flatten)]
    chrome: Chrome<'a>,
    #[serde(flatten)]
    body: B,
}

fn render<B: Serialize>(template: &str, chrome: Chrome<'_>, body: B) -> Result<String, minijinja::Error> {
    environment()?.get_template(template)?.render(Page { chrome, body })
}

#[derive(Serialize)]
struct LoginBody<'a> {
    signin_href: &'a str,
    error: Option<&'a str>,
}

/// Login page. `signin_href` already carries the callback URL.
///
/// # Errors
///
/// Returns a [`minijinja::Error`] if the template fails to render.
pub fn login_page(theme: Theme, signin_href: &str, error: Option<&str>) -> Result<String, minijinja::Error> {
    render("login.html", Chrome::new(theme, None, "Login"), LoginBody { signin_href, error })
}

#[derive(Serialize)]
struct RepoRow<'a> {
    name: &'a str,
    description: Option<&'a str>,
    updated: &'a str,
    stars: u32,
    html_url: &'a str,
}

impl<'a> From<&'a Repository> for RepoRow<'a> {
    fn from(repo: &'a Repository) -> Self {
        Self {
            name: &repo.name,
            description: repo.description.as_deref(),
            updated: repo.updated_at.get(..10).unwrap_or(&repo.updated_at),
            stars: repo.stargazers_count,
            html_url: &repo.html_url,
        }
    }
}

#[derive(Serialize)]
struct HomeBody<'a> {
    repos: Vec<RepoRow<'a>>,
    error: Option<&'a str>,
}

/// Repository list, or the fetch error in its place.
///
/// # Errors
///
/// Returns a [`minijinja::Error`] if the template fails to render.
pub fn home_page(theme: Theme, identity: &Identity, repos: Result<&[Repository], &str>) -> Result<String, minijinja::Error> {
    let body = match repos {
        Ok(repos) => HomeBody { repos: repos.iter().map(RepoRow::from).collect(), error: None },
        Err(message) => HomeBody { repos: Vec::new(), error: Some(message) },
    };
    render("home.html", Chrome::new(theme, Some(identity), "Repositories"), body)
}

#[derive(Serialize)]
struct EditorBody<'a> {
    repo: &'a str,
}

/// Editor shell for one repository.
///
/// # Errors
///
/// Returns a [`minijinja::Error`] if the template fails to render.
pub fn editor_page(theme: Theme, identity: &Identity, repo: &str) -> Result<String, minijinja::Error> {
    let title = format!("Editor - {repo}");
    render("editor.html", Chrome::new(theme, Some(identity), &title), EditorBody { repo })
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;

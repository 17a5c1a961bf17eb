//! Markdown to standalone HTML page.

use minijinja::{context, AutoEscape, Environment, UndefinedBehavior, Value};
use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

const PAGE_TEMPLATE_NAME: &str = "page.html";
const PAGE_TEMPLATE: &str = include_str!("../assets/page.html");
const DEFAULT_TITLE: &str = "Default Title";

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}

/// Text of the first level-1 heading, if any.
pub fn first_heading(markdown: &str) -> Option<String> {
    let mut in_h1 = false;
    let mut title = String::new();
    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_h1 = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let trimmed = title.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
                in_h1 = false;
                title.clear();
            }
            Event::Text(text) | Event::Code(text) if in_h1 => title.push_str(&text),
            _ => {}
        }
    }
    None
}

/// Page template loaded once; renders Markdown documents into full HTML pages.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { env })
    }

    /// The title comes from the first H1 and is escaped; the rendered body is inserted as is.
    pub fn page(&self, markdown: &str) -> Result<String, minijinja::Error> {
        let title = first_heading(markdown).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let content = Value::from_safe_string(markdown_to_html(markdown));
        self.env
            .get_template(PAGE_TEMPLATE_NAME)?
            .render(context! { title => title, content => content })
    }
}

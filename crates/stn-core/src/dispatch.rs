//! Routes a plaintext payload to one of the delivery renderings.

use std::sync::Arc;

use tracing::debug;

use crate::{
    domain::{Article, ChatId, MessageRef},
    errors::Error,
    formatting::escape_markdown_v2,
    messaging::{port::MessagingPort, types::ParseMode},
    store::ArticleStore,
    Result,
};

/// Delivery rendering requested by the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Markdown,
    InAppHtml,
    ServerHtml,
    Plain,
}

impl Format {
    /// Case-insensitive; anything unrecognized (including empty) is `Plain`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "markdown" => Format::Markdown,
            "in-app-html" => Format::InAppHtml,
            "server-html" => Format::ServerHtml,
            _ => Format::Plain,
        }
    }
}

pub struct Dispatcher {
    messenger: Arc<dyn MessagingPort>,
    articles: Arc<dyn ArticleStore>,
    public_url: String,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        articles: Arc<dyn ArticleStore>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            messenger,
            articles,
            public_url: public_url.into(),
        }
    }

    pub async fn deliver(&self, chat_id: ChatId, text: &str, format: Format) -> Result<MessageRef> {
        debug!(chat_id = chat_id.0, ?format, "delivering message");
        match format {
            Format::Markdown => {
                self.messenger
                    .send_text(chat_id, &escape_markdown_v2(text), ParseMode::MarkdownV2)
                    .await
            }
            Format::InAppHtml => self.messenger.send_text(chat_id, text, ParseMode::Html).await,
            Format::ServerHtml => {
                let article = Article {
                    article_id: uuid::Uuid::new_v4().to_string(),
                    raw_content: text.to_string(),
                };
                self.articles.create_article(&article).await?;
                let link = self.article_url(&article.article_id);
                self.messenger.send_text(chat_id, &link, ParseMode::Plain).await
            }
            Format::Plain => self.messenger.send_text(chat_id, text, ParseMode::Plain).await,
        }
    }

    /// Send an uploaded file as a document, followed by its caption when present.
    pub async fn deliver_file(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<MessageRef> {
        if bytes.is_empty() {
            return Err(Error::Validation("Invalid file".to_string()));
        }
        debug!(chat_id = chat_id.0, file_name, size = bytes.len(), "delivering file");
        let sent = self.messenger.send_document(chat_id, file_name, bytes).await?;
        if let Some(caption) = caption.filter(|c| !c.trim().is_empty()) {
            self.messenger
                .send_text(chat_id, caption, ParseMode::Plain)
                .await?;
        }
        Ok(sent)
    }

    pub fn article_url(&self, article_id: &str) -> String {
        format!("{}/html/{}", self.public_url, article_id)
    }
}

//! Authenticated ingestion: authorize, decrypt when asked, dispatch.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    crypto,
    dispatch::{Dispatcher, Format},
    domain::Subscription,
    errors::Error,
    registry::Registry,
    Result,
};

/// A text delivery request, whatever transport it arrived on.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub msg: String,
    pub encrypted: bool,
    pub format: Format,
}

/// A file delivery request.
#[derive(Clone, Debug)]
pub struct InboundFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

pub struct Ingestor {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
}

impl Ingestor {
    pub fn new(registry: Arc<Registry>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// `Some` iff a record exists for `public_id` and it is enabled.
    ///
    /// Unknown and disabled ids are indistinguishable to the caller.
    pub async fn authorize(&self, public_id: &str) -> Result<Option<Subscription>> {
        Ok(self
            .registry
            .find_by_public_id(public_id)
            .await?
            .filter(|s| s.receive_enabled))
    }

    /// Decrypt when flagged, then dispatch to an already authorized subscription.
    pub async fn relay_message(&self, sub: &Subscription, inbound: InboundMessage) -> Result<()> {
        if inbound.msg.is_empty() {
            return Err(Error::Validation("Invalid message".to_string()));
        }

        let text = if inbound.encrypted {
            crypto::decrypt(&inbound.msg, &sub.symmetric_key).map_err(|e| {
                warn!(chat_id = sub.chat_id.0, error = %e, "failed to decrypt message");
                Error::Crypto(e)
            })?
        } else {
            inbound.msg
        };
        if text.is_empty() {
            return Err(Error::Validation("Invalid message".to_string()));
        }

        self.dispatcher
            .deliver(sub.chat_id, &text, inbound.format)
            .await?;
        info!(chat_id = sub.chat_id.0, format = ?inbound.format, "message relayed");
        Ok(())
    }

    pub async fn relay_file(&self, sub: &Subscription, file: InboundFile) -> Result<()> {
        self.dispatcher
            .deliver_file(sub.chat_id, &file.file_name, file.bytes, file.caption.as_deref())
            .await?;
        info!(chat_id = sub.chat_id.0, "file relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    use super::*;
    use crate::{
        domain::{ChatId, ChatProfile, UserId},
        errors::CryptoError,
        messaging::types::ParseMode,
        store::memory::MemoryStore,
        testing::RecordingMessenger,
    };

    const UNKNOWN_ID: &str = "0123456789abcdef0123456789abcdef";

    struct Fixture {
        messenger: Arc<RecordingMessenger>,
        registry: Arc<Registry>,
        ingestor: Ingestor,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::new(UserId(1)));
        let registry = Arc::new(Registry::new(store.clone()));
        let dispatcher = Arc::new(Dispatcher::new(messenger.clone(), store, "http://x"));
        let ingestor = Ingestor::new(registry.clone(), dispatcher);
        Fixture {
            messenger,
            registry,
            ingestor,
        }
    }

    async fn subscribe(f: &Fixture, chat: i64) -> Subscription {
        f.registry
            .get_or_create(ChatId(chat), &ChatProfile::default())
            .await
            .unwrap()
            .subscription
    }

    fn plain(msg: &str) -> InboundMessage {
        InboundMessage {
            msg: msg.to_string(),
            encrypted: false,
            format: Format::Plain,
        }
    }

    fn sealed(plain: &[u8], key_hex: &str) -> InboundMessage {
        type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
        let key = hex::decode(key_hex).unwrap();
        let iv = [5u8; 16];
        let mut buf = vec![0u8; plain.len() + 16];
        buf[..plain.len()].copy_from_slice(plain);
        let ct = Aes256CbcEnc::new_from_slices(&key, &iv)
            .unwrap()
            .encrypt_padded_mut::<Pkcs7>(&mut buf, plain.len())
            .unwrap()
            .to_vec();
        let mut payload = iv.to_vec();
        payload.extend_from_slice(&ct);
        InboundMessage {
            msg: BASE64.encode(payload),
            encrypted: true,
            format: Format::Plain,
        }
    }

    #[tokio::test]
    async fn subscribed_chat_receives_plain_message() {
        let f = fixture();
        let sub = subscribe(&f, 100).await;

        let authorized = f.ingestor.authorize(&sub.public_id).await.unwrap().unwrap();
        f.ingestor
            .relay_message(&authorized, plain("hi"))
            .await
            .unwrap();

        let sent = f.messenger.sent_texts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(100));
        assert_eq!(sent[0].text, "hi");
        assert_eq!(sent[0].mode, ParseMode::Plain);
    }

    #[tokio::test]
    async fn unknown_and_disabled_are_indistinguishable() {
        let f = fixture();
        let sub = subscribe(&f, 100).await;
        f.registry.disable(ChatId(100)).await.unwrap();

        assert!(f.ingestor.authorize(&sub.public_id).await.unwrap().is_none());
        assert!(f.ingestor.authorize(UNKNOWN_ID).await.unwrap().is_none());
        assert!(f.ingestor.authorize("not-hex").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_message_is_a_validation_error() {
        let f = fixture();
        let sub = subscribe(&f, 1).await;
        let err = f.ingestor.relay_message(&sub, plain("")).await;
        assert!(matches!(err, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn decrypted_message_is_delivered() {
        let f = fixture();
        let sub = subscribe(&f, 1).await;
        f.ingestor
            .relay_message(&sub, sealed(b"deploy done", &sub.symmetric_key))
            .await
            .unwrap();
        assert_eq!(f.messenger.texts_to(ChatId(1)), vec!["deploy done"]);
    }

    #[tokio::test]
    async fn empty_plaintext_after_decryption_is_rejected() {
        let f = fixture();
        let sub = subscribe(&f, 1).await;
        let err = f
            .ingestor
            .relay_message(&sub, sealed(b"", &sub.symmetric_key))
            .await;
        match err {
            Err(Error::Validation(msg)) => assert_eq!(msg, "Invalid message"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(f.messenger.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn short_ciphertext_sends_nothing() {
        let f = fixture();
        let sub = subscribe(&f, 1).await;
        let inbound = InboundMessage {
            msg: BASE64.encode([0u8; 31]),
            encrypted: true,
            format: Format::Plain,
        };
        let err = f.ingestor.relay_message(&sub, inbound).await;
        assert!(matches!(
            err,
            Err(Error::Crypto(CryptoError::ShortCiphertext))
        ));
        assert!(f.messenger.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn file_goes_to_the_authorized_chat() {
        let f = fixture();
        let sub = subscribe(&f, 7).await;
        let file = InboundFile {
            file_name: "a.txt".to_string(),
            bytes: b"x".to_vec(),
            caption: None,
        };
        f.ingestor.relay_file(&sub, file).await.unwrap();

        let docs = f.messenger.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].chat_id, ChatId(7));
        assert_eq!(docs[0].file_name, "a.txt");
    }
}

use chrono::Utc;
use log::{ debug, warn };
use std::error::Error;
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Mutex as StdMutex };
use tokio::sync::Mutex;

use super::emotion::{ detect_emotion, Emotion, LOGO_AVATAR };
use super::replier::Replier;
use super::splash::AuthChoice;
use crate::history::{ ConversationLog, HistoryStore, CONVERSATION_KEY };
use crate::models::conversation::{ ConversationEntry, Role };

pub const GREETING: &str = "Hola, soy Amiko 😊 ¿En qué puedo ayudarte hoy?";
pub const APOLOGY: &str = "Hubo un error procesando tu mensaje.";
pub const CLEARED: &str = "Conversación borrada.";
pub const DEFAULT_BOT_NAME: &str = "AMIKO";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Intro,
    Send,
    Receive,
    Vibrate,
}

/// Where the session draws itself. Implementations must not block.
pub trait Renderer: Send + Sync {
    fn message(&self, role: Role, text: &str);

    fn notice(&self, text: &str);

    fn typing(&self, active: bool);

    fn cue(&self, cue: Cue);

    fn avatar(&self, _path: &str) {}

    fn brand(&self, _name: &str) {}

    fn clear(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The companion answered.
    Replied(String),
    /// The replier failed; the apology was shown instead.
    Failed(String),
    /// Blank input, nothing happened.
    Ignored,
    /// Another message is still waiting for its answer.
    Busy,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub personality: Option<String>,
    pub bot_name: String,
    pub vibrate: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            personality: None,
            bot_name: DEFAULT_BOT_NAME.to_string(),
            vibrate: false,
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One open chat: the persisted log, the current mood and the send gate.
pub struct ChatSession {
    store: Arc<dyn HistoryStore>,
    replier: Arc<dyn Replier>,
    renderer: Arc<dyn Renderer>,
    log: Mutex<ConversationLog>,
    sending: AtomicBool,
    mood: StdMutex<Emotion>,
    bot_name: StdMutex<String>,
    personality: Option<String>,
    vibrate: bool,
}

impl ChatSession {
    /// Restores the stored conversation and redraws it. An empty log gets the greeting.
    pub async fn start(
        store: Arc<dyn HistoryStore>,
        replier: Arc<dyn Replier>,
        renderer: Arc<dyn Renderer>,
        options: SessionOptions
    ) -> Self {
        let log = ConversationLog::restore(store.as_ref(), CONVERSATION_KEY).await;
        debug!("Restored {} conversation entries", log.len());
        for entry in log.entries() {
            renderer.message(entry.role, &entry.text);
        }
        let empty = log.is_empty();

        let session = Self {
            store,
            replier,
            renderer,
            log: Mutex::new(log),
            sending: AtomicBool::new(false),
            mood: StdMutex::new(Emotion::Neutral),
            bot_name: StdMutex::new(DEFAULT_BOT_NAME.to_string()),
            personality: options.personality,
            vibrate: options.vibrate,
        };
        session.set_bot_name(&options.bot_name);
        session.renderer.avatar(LOGO_AVATAR);

        if empty {
            session.add_message(Role::Bot, GREETING).await;
        }
        session
    }

    async fn add_message(&self, role: Role, text: &str) {
        self.renderer.message(role, text);
        self.renderer.cue(match role {
            Role::User => Cue::Send,
            Role::Bot => Cue::Receive,
        });

        let mut log = self.log.lock().await;
        log.append(role, text);
        if let Err(e) = log.persist(self.store.as_ref()).await {
            warn!("Failed to persist conversation: {}", e);
        }
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        if self.sending.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return SendOutcome::Busy;
        }
        let _in_flight = InFlight(&self.sending);

        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        self.add_message(Role::User, text).await;
        if self.vibrate {
            self.renderer.cue(Cue::Vibrate);
        }
        self.renderer.typing(true);

        let result = self.replier.reply(text, self.personality.as_deref()).await;
        self.renderer.typing(false);

        match result {
            Ok(reply) => {
                let emotion = detect_emotion(text);
                self.set_mood(emotion);
                self.renderer.avatar(&emotion.avatar_path());
                self.add_message(Role::Bot, &reply).await;
                SendOutcome::Replied(reply)
            }
            Err(e) => {
                warn!("Reply failed: {}", e);
                self.add_message(Role::Bot, APOLOGY).await;
                SendOutcome::Failed(APOLOGY.to_string())
            }
        }
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Shows an emotion on the avatar without touching the conversation.
    pub fn show_mood(&self, emotion: Emotion) {
        self.set_mood(emotion);
        self.renderer.avatar(&emotion.avatar_path());
        self.renderer.notice(&format!("Estado visualizado: {}", emotion));
    }

    fn set_mood(&self, emotion: Emotion) {
        if let Ok(mut mood) = self.mood.lock() {
            *mood = emotion;
        }
    }

    pub fn mood(&self) -> Emotion {
        self.mood.lock().map(|mood| *mood).unwrap_or_default()
    }

    pub async fn clear_conversation(&self) {
        {
            let mut log = self.log.lock().await;
            log.clear();
            if let Err(e) = log.persist(self.store.as_ref()).await {
                warn!("Failed to persist cleared conversation: {}", e);
            }
        }
        self.renderer.clear();
        self.add_message(Role::Bot, CLEARED).await;
    }

    /// Drops the stored conversation. What is on screen stays until the next start.
    pub async fn forget_history(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let key = self.log.lock().await.key().to_string();
        self.store.remove_item(&key).await
    }

    pub async fn history_lines(&self) -> Vec<String> {
        self.log.lock().await.history_lines()
    }

    pub async fn entries(&self) -> Vec<ConversationEntry> {
        self.log.lock().await.entries().to_vec()
    }

    pub async fn export_transcript(
        &self,
        dir: impl AsRef<Path>
    ) -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
        let transcript = self.log.lock().await.transcript();
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("amiko_transcript_{}.txt", Utc::now().timestamp_millis()));
        tokio::fs::write(&path, transcript).await?;
        Ok(path)
    }

    /// Renames the companion. Blank names fall back to the default.
    pub fn set_bot_name(&self, name: &str) -> String {
        let name = match name.trim() {
            "" => DEFAULT_BOT_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        if let Ok(mut current) = self.bot_name.lock() {
            *current = name.clone();
        }
        self.renderer.brand(&name);
        name
    }

    pub fn bot_name(&self) -> String {
        self.bot_name
            .lock()
            .map(|name| name.clone())
            .unwrap_or_else(|_| DEFAULT_BOT_NAME.to_string())
    }

    pub fn choose_auth(&self, choice: AuthChoice) {
        self.renderer.notice(choice.notice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRenderer {
        events: StdMutex<Vec<String>>,
    }

    impl RecordingRenderer {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Renderer for RecordingRenderer {
        fn message(&self, role: Role, text: &str) {
            self.push(format!("{}:{}", role.label(), text));
        }

        fn notice(&self, text: &str) {
            self.push(format!("notice:{}", text));
        }

        fn typing(&self, active: bool) {
            self.push(format!("typing:{}", active));
        }

        fn cue(&self, cue: Cue) {
            self.push(format!("cue:{:?}", cue));
        }

        fn avatar(&self, path: &str) {
            self.push(format!("avatar:{}", path));
        }

        fn clear(&self) {
            self.push("clear".to_string());
        }
    }

    struct ScriptedReplier {
        reply: Result<String, String>,
        delay: Duration,
        seen: StdMutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedReplier {
        fn answering(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), delay: Duration::ZERO, seen: StdMutex::default() }
        }

        fn failing() -> Self {
            Self {
                reply: Err("upstream down".to_string()),
                delay: Duration::ZERO,
                seen: StdMutex::default(),
            }
        }
    }

    #[async_trait]
    impl Replier for ScriptedReplier {
        async fn reply(
            &self,
            text: &str,
            personality: Option<&str>
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().push((text.to_string(), personality.map(str::to_string)));
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(|e| e.into())
        }
    }

    async fn session_with(
        store: Arc<MemoryHistoryStore>,
        replier: Arc<ScriptedReplier>,
        options: SessionOptions
    ) -> (ChatSession, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::default());
        let session = ChatSession::start(store, replier, renderer.clone(), options).await;
        (session, renderer)
    }

    #[tokio::test]
    async fn test_greeting_only_when_log_is_empty() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("hola"));

        let (first, _) = session_with(store.clone(), replier.clone(), SessionOptions::default()).await;
        let entries = first.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role, Role::Bot);
        assert_eq!(entries[0].text, GREETING);

        let (second, renderer) = session_with(store, replier, SessionOptions::default()).await;
        assert_eq!(second.entries().await.len(), 1);
        assert_eq!(renderer.events().first().map(String::as_str), Some(&*format!("BOT:{}", GREETING)));
    }

    #[tokio::test]
    async fn test_send_appends_both_sides_and_persists() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("Cuéntame más"));
        let options = SessionOptions { personality: Some("divertida".to_string()), ..Default::default() };
        let (session, renderer) = session_with(store.clone(), replier.clone(), options).await;

        let outcome = session.send("  estoy muy triste  ").await;
        assert_eq!(outcome, SendOutcome::Replied("Cuéntame más".to_string()));

        let entries = session.entries().await;
        let texts: Vec<_> = entries.iter().map(|e| (e.role, e.text.as_str())).collect();
        assert_eq!(texts, [
            (Role::Bot, GREETING),
            (Role::User, "estoy muy triste"),
            (Role::Bot, "Cuéntame más"),
        ]);
        assert_eq!(session.mood(), Emotion::Sad);
        assert_eq!(
            replier.seen.lock().unwrap().as_slice(),
            [("estoy muy triste".to_string(), Some("divertida".to_string()))]
        );

        let events = renderer.events();
        assert!(events.contains(&"avatar:images/amiko_sad.png".to_string()));
        assert!(events.contains(&"typing:true".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("cue:Receive"));

        let stored = ConversationLog::restore(store.as_ref(), CONVERSATION_KEY).await;
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("x"));
        let (session, _) = session_with(store, replier.clone(), SessionOptions::default()).await;

        assert_eq!(session.send("   ").await, SendOutcome::Ignored);
        assert_eq!(session.entries().await.len(), 1);
        assert!(replier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_shows_apology() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::failing());
        let (session, _) = session_with(store, replier, SessionOptions::default()).await;

        assert_eq!(session.send("hola").await, SendOutcome::Failed(APOLOGY.to_string()));
        let entries = session.entries().await;
        assert_eq!(entries.last().map(|e| e.text.as_str()), Some(APOLOGY));
        assert!(!session.is_sending());
    }

    #[tokio::test]
    async fn test_failed_reply_keeps_mood() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::failing());
        let (session, renderer) = session_with(store, replier, SessionOptions::default()).await;

        session.send("estoy muy triste").await;
        assert_eq!(session.mood(), Emotion::Neutral);
        let avatars: Vec<_> = renderer
            .events()
            .into_iter()
            .filter(|e| e.starts_with("avatar:"))
            .collect();
        assert_eq!(avatars, [format!("avatar:{}", LOGO_AVATAR)]);
    }

    #[tokio::test]
    async fn test_overlapping_send_is_busy() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier {
            reply: Ok("listo".to_string()),
            delay: Duration::from_millis(200),
            seen: StdMutex::default(),
        });
        let (session, _) = session_with(store, replier.clone(), SessionOptions::default()).await;

        let (first, second) = tokio::join!(session.send("uno"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.send("dos").await
        });
        assert_eq!(first, SendOutcome::Replied("listo".to_string()));
        assert_eq!(second, SendOutcome::Busy);
        assert_eq!(replier.seen.lock().unwrap().len(), 1);

        assert_eq!(session.send("tres").await, SendOutcome::Replied("listo".to_string()));
    }

    #[tokio::test]
    async fn test_clear_leaves_single_notice() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("ok"));
        let (session, renderer) = session_with(store.clone(), replier, SessionOptions::default()).await;
        session.send("hola").await;

        session.clear_conversation().await;
        let entries = session.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, CLEARED);
        assert!(renderer.events().contains(&"clear".to_string()));

        let stored = ConversationLog::restore(store.as_ref(), CONVERSATION_KEY).await;
        assert_eq!(stored.entries(), entries.as_slice());
    }

    #[tokio::test]
    async fn test_forget_removes_storage_only() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("ok"));
        let (session, _) = session_with(store.clone(), replier, SessionOptions::default()).await;

        session.forget_history().await.unwrap();
        assert_eq!(store.get_item(CONVERSATION_KEY).await.unwrap(), None);
        assert_eq!(session.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_show_mood_is_not_persisted() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("ok"));
        let (session, renderer) = session_with(store, replier, SessionOptions::default()).await;

        session.show_mood(Emotion::Happy);
        assert_eq!(session.mood(), Emotion::Happy);
        assert_eq!(session.entries().await.len(), 1);
        assert_eq!(
            renderer.events().last().map(String::as_str),
            Some("notice:Estado visualizado: happy")
        );
    }

    #[tokio::test]
    async fn test_export_writes_transcript() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("ok"));
        let (session, _) = session_with(store, replier, SessionOptions::default()).await;

        let path = session.export_transcript(dir.path()).await.unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("amiko_transcript_") && name.ends_with(".txt"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with(&format!("] BOT: {}", GREETING)));
    }

    #[tokio::test]
    async fn test_bot_name_falls_back_when_blank() {
        let store = Arc::new(MemoryHistoryStore::default());
        let replier = Arc::new(ScriptedReplier::answering("ok"));
        let options = SessionOptions { bot_name: "Luz".to_string(), ..Default::default() };
        let (session, _) = session_with(store, replier, options).await;

        assert_eq!(session.bot_name(), "Luz");
        assert_eq!(session.set_bot_name("   "), DEFAULT_BOT_NAME);
        assert_eq!(session.bot_name(), DEFAULT_BOT_NAME);
    }
}

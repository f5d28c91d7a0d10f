//! Chat widget: a turn-by-turn conversation over the knowledge table with
//! simulated typing latency.
//!
//! [`Conversation`] is the state machine. It never sleeps; it records when
//! the pending bot turn is due and delivers it from [`Conversation::poll`].
//! [`AssistantSession`] drives one on a tokio task against real time.

use crate::shared::config::AssistantConfig;
use crate::shared::host::HostPage;
use crate::shared::models::{Action, ConversationMessage, DISMISS_KEY, MessageIds, QuickAction};
use crate::shared::resolver::Resolver;
use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Closed,
    Idle,
    /// A bot turn is scheduled and the typing indicator is shown.
    AwaitingReply,
}

/// Outcome of handing the widget a user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    Blank,
    /// A bot reply is still in flight; the input is refused, not queued.
    Busy,
    Closed,
}

#[derive(Debug)]
struct PendingTurn {
    /// `None` while the widget is closed; the turn is re-armed on open.
    due: Option<Instant>,
    text: String,
    options: Vec<QuickAction>,
}

pub struct Conversation<H> {
    resolver: Resolver,
    config: AssistantConfig,
    host: H,
    open: bool,
    transcript: Vec<ConversationMessage>,
    pending: Option<PendingTurn>,
    ids: MessageIds,
}

impl<H: HostPage> Conversation<H> {
    pub fn new(resolver: Resolver, config: AssistantConfig, host: H) -> Self {
        Self {
            resolver,
            config,
            host,
            open: false,
            transcript: Vec::new(),
            pending: None,
            ids: MessageIds::default(),
        }
    }

    pub fn state(&self) -> ChatState {
        match (self.open, self.is_typing()) {
            (false, _) => ChatState::Closed,
            (true, false) => ChatState::Idle,
            (true, true) => ChatState::AwaitingReply,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_typing(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.due.is_some())
    }

    pub fn transcript(&self) -> &[ConversationMessage] {
        &self.transcript
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// When the pending bot turn is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().and_then(|p| p.due)
    }

    pub fn open(&mut self, now: Instant) {
        if self.open {
            return;
        }
        self.open = true;
        info!("Chat opened");

        if let Some(turn) = self.pending.as_mut() {
            turn.due = Some(now + self.config.reply_delay());
            debug!("Re-armed suspended bot reply");
        } else if self.transcript.is_empty() {
            let (text, options) = self.resolver.greeting();
            self.pending = Some(PendingTurn {
                due: Some(now + self.config.greeting_delay()),
                text,
                options,
            });
        }
    }

    /// Close the widget and stop the typing timer. A pending greeting is
    /// dropped; a pending reply is kept without a deadline so the user turn
    /// it answers is never left unanswered. The transcript stays.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if self.transcript.is_empty() {
            if self.pending.take().is_some() {
                debug!("Cancelled pending greeting");
            }
        } else if let Some(turn) = self.pending.as_mut() {
            turn.due = None;
            debug!("Suspended pending bot reply");
        }
        info!("Chat closed");
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.open {
            self.close();
        } else {
            self.open(now);
        }
    }

    pub fn key(&mut self, key: &str) {
        if key == DISMISS_KEY {
            self.close();
        }
    }

    /// Free-text input from the message box.
    pub fn submit(&mut self, text: &str, now: Instant) -> Submission {
        if !self.open {
            return Submission::Closed;
        }
        if text.trim().is_empty() {
            return Submission::Blank;
        }
        if self.pending.is_some() {
            warn!("Ignoring {:?}: a reply is still pending", text);
            return Submission::Busy;
        }

        let resolution = self.resolver.resolve(text);
        let id = self.ids.next_id();
        self.transcript
            .push(ConversationMessage::user(id, resolution.user_text));
        self.pending = Some(PendingTurn {
            due: Some(now + self.config.reply_delay()),
            text: resolution.bot_text,
            options: resolution.options,
        });
        Submission::Accepted
    }

    /// Act on a quick-action chip.
    pub fn choose(&mut self, chip: &QuickAction, now: Instant) -> Submission {
        if !self.open {
            return Submission::Closed;
        }

        match &chip.action {
            Action::Query { text } => {
                let text = if text.is_empty() { &chip.label } else { text };
                return self.submit(text, now);
            }
            Action::Scroll { anchor } => {
                if self.host.has_anchor(anchor) {
                    self.close();
                    self.host.reveal(anchor, self.config.highlight());
                } else {
                    warn!("No anchor named {:?} on the page", anchor);
                }
            }
            Action::OpenModal { subject } => {
                self.close();
                self.host.open_consultation(subject.as_deref());
            }
            Action::OpenLink { url } => self.host.open_link(url),
            Action::CloseChat => self.close(),
        }
        Submission::Accepted
    }

    /// Deliver the pending bot turn if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<&ConversationMessage> {
        let due = self.pending.as_ref().and_then(|p| p.due)?;
        if due > now {
            return None;
        }
        let turn = self.pending.take()?;
        let id = self.ids.next_id();
        self.transcript
            .push(ConversationMessage::bot(id, turn.text, turn.options));
        self.transcript.last()
    }
}

#[derive(Debug, Clone)]
pub enum ChatCommand {
    Open,
    Close,
    Toggle,
    Key(String),
    Submit(String),
    Choose(QuickAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Opened,
    Closed,
    Typing(bool),
    Message(ConversationMessage),
    Rejected(Submission),
}

/// A [`Conversation`] running on its own task.
pub struct AssistantSession {
    commands: mpsc::UnboundedSender<ChatCommand>,
    task: JoinHandle<()>,
}

impl AssistantSession {
    pub fn spawn<H>(conversation: Conversation<H>) -> (Self, mpsc::UnboundedReceiver<ChatEvent>)
    where
        H: HostPage + Send + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_conversation(conversation, command_rx, event_tx));
        (Self { commands, task }, events)
    }

    pub fn send(&self, command: ChatCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Chat session has ended"))
    }

    /// Stop the session; pending timers die with the task.
    pub async fn shutdown(self) -> Result<()> {
        let Self { commands, task } = self;
        drop(commands);
        task.await?;
        Ok(())
    }
}

async fn run_conversation<H: HostPage>(
    mut conversation: Conversation<H>,
    mut commands: mpsc::UnboundedReceiver<ChatCommand>,
    events: mpsc::UnboundedSender<ChatEvent>,
) {
    loop {
        let deadline = conversation.next_deadline();
        let was_open = conversation.is_open();
        let was_typing = conversation.is_typing();
        let seen = conversation.transcript().len();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                let now = Instant::now();
                let outcome = match command {
                    ChatCommand::Open => {
                        conversation.open(now);
                        Submission::Accepted
                    }
                    ChatCommand::Close => {
                        conversation.close();
                        Submission::Accepted
                    }
                    ChatCommand::Toggle => {
                        conversation.toggle(now);
                        Submission::Accepted
                    }
                    ChatCommand::Key(key) => {
                        conversation.key(&key);
                        Submission::Accepted
                    }
                    ChatCommand::Submit(text) => conversation.submit(&text, now),
                    ChatCommand::Choose(chip) => conversation.choose(&chip, now),
                };

                if outcome != Submission::Accepted {
                    let _ = events.send(ChatEvent::Rejected(outcome));
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                conversation.poll(Instant::now());
            }
        }

        for message in &conversation.transcript()[seen..] {
            let _ = events.send(ChatEvent::Message(message.clone()));
        }

        if conversation.is_open() != was_open {
            let event = if conversation.is_open() {
                ChatEvent::Opened
            } else {
                ChatEvent::Closed
            };
            let _ = events.send(event);
        }
        if conversation.is_typing() != was_typing {
            let _ = events.send(ChatEvent::Typing(conversation.is_typing()));
        }
    }
    debug!("Chat session ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::catalog::Catalog;
    use crate::shared::host::{HostCall, RecordingHost};
    use crate::shared::matcher::Matcher;
    use crate::shared::models::Sender;
    use std::time::Duration;

    fn conversation() -> Conversation<RecordingHost> {
        let catalog = Catalog::builtin();
        let host = RecordingHost::new(["kurs-tarix", "aloqa"]);
        Conversation::new(
            Resolver::new(&catalog, Matcher::default()),
            AssistantConfig::default(),
            host,
        )
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_greeting_arrives_after_delay() {
        let mut chat = conversation();
        let t0 = Instant::now();
        assert_eq!(chat.state(), ChatState::Closed);

        chat.open(t0);
        assert_eq!(chat.state(), ChatState::AwaitingReply);
        assert!(chat.poll(t0 + ms(599)).is_none());

        let greeting = chat.poll(t0 + ms(600)).unwrap();
        assert_eq!(greeting.sender, Sender::Bot);
        assert_eq!(greeting.options.len(), 2);
        assert_eq!(chat.state(), ChatState::Idle);
    }

    #[test]
    fn test_reopen_with_transcript_skips_greeting() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));
        chat.close();
        chat.open(t0 + ms(1000));
        assert!(!chat.is_typing());
        assert_eq!(chat.transcript().len(), 1);
    }

    #[test]
    fn test_close_cancels_pending_greeting() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.close();
        assert!(chat.next_deadline().is_none());
        assert!(chat.poll(t0 + ms(5000)).is_none());
        assert!(chat.transcript().is_empty());
    }

    #[test]
    fn test_close_suspends_pending_reply_until_reopen() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));

        assert_eq!(chat.submit("narx", t0 + ms(700)), Submission::Accepted);
        chat.close();
        assert!(chat.next_deadline().is_none());
        assert!(chat.poll(t0 + ms(5000)).is_none());

        chat.open(t0 + ms(6000));
        assert_eq!(chat.state(), ChatState::AwaitingReply);
        assert_eq!(chat.submit("narx", t0 + ms(6100)), Submission::Busy);
        assert!(chat.poll(t0 + ms(6999)).is_none());

        let reply = chat.poll(t0 + ms(7000)).unwrap();
        assert!(reply.text.starts_with("Kurslarimiz narxlari"));
        let senders: Vec<_> = chat.transcript().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::Bot, Sender::User, Sender::Bot]);
    }

    #[test]
    fn test_scroll_chip_while_awaiting_keeps_reply() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));
        chat.submit("manzil", t0 + ms(700));

        chat.choose(&QuickAction::scroll("Manzil", "aloqa"), t0 + ms(800));
        assert_eq!(chat.state(), ChatState::Closed);

        chat.open(t0 + ms(3000));
        chat.poll(t0 + ms(4000));
        let senders: Vec<_> = chat.transcript().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::Bot, Sender::User, Sender::Bot]);
    }

    #[test]
    fn test_second_submission_while_awaiting_is_refused() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));

        assert_eq!(chat.submit("narx", t0 + ms(700)), Submission::Accepted);
        assert_eq!(chat.submit("manzil", t0 + ms(800)), Submission::Busy);
        assert_eq!(chat.transcript().len(), 2);

        let reply = chat.poll(t0 + ms(1700)).unwrap();
        assert!(reply.text.starts_with("Kurslarimiz narxlari"));
        assert_eq!(chat.submit("manzil", t0 + ms(1800)), Submission::Accepted);
    }

    #[test]
    fn test_blank_and_closed_submissions() {
        let mut chat = conversation();
        let t0 = Instant::now();
        assert_eq!(chat.submit("salom", t0), Submission::Closed);
        chat.open(t0);
        chat.poll(t0 + ms(600));
        assert_eq!(chat.submit("   ", t0), Submission::Blank);
    }

    #[test]
    fn test_query_chip_resubmits_payload() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));

        let chip = QuickAction::query("Ingliz tili (IELTS)", "course:ielts");
        assert_eq!(chat.choose(&chip, t0 + ms(700)), Submission::Accepted);
        assert_eq!(chat.transcript().last().unwrap().text, "Ingliz tili");
    }

    #[test]
    fn test_query_chip_without_payload_uses_label() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));

        let chip = QuickAction::query("Tarix", "");
        chat.choose(&chip, t0 + ms(700));
        let reply = chat.poll(t0 + ms(1700)).unwrap();
        assert!(reply.text.starts_with("Siz Tarix haqida"));
    }

    #[test]
    fn test_scroll_chip_closes_and_reveals() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);

        chat.choose(&QuickAction::scroll("Batafsil", "kurs-tarix"), t0);
        assert!(!chat.is_open());
        assert_eq!(
            chat.host().calls(),
            vec![HostCall::Reveal {
                anchor: "kurs-tarix".to_string(),
                highlight_for: ms(2000)
            }]
        );
    }

    #[test]
    fn test_scroll_to_missing_anchor_keeps_widget_open() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.choose(&QuickAction::scroll("Batafsil", "kurs-yoq"), t0);
        assert!(chat.is_open());
        assert!(chat.host().calls().is_empty());
    }

    #[test]
    fn test_open_modal_and_link_chips() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.choose(&QuickAction::open_link("Telegram", "https://t.me/markaz"), t0);
        assert!(chat.is_open());

        chat.choose(&QuickAction::open_modal("Konsultatsiya", Some("Tarix")), t0);
        assert!(!chat.is_open());
        assert_eq!(
            chat.host().calls(),
            vec![
                HostCall::OpenLink {
                    url: "https://t.me/markaz".to_string()
                },
                HostCall::OpenConsultation {
                    subject: Some("Tarix".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_close_chip_and_dismiss_key() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.choose(&QuickAction::close_chat("Yopish"), t0);
        assert_eq!(chat.state(), ChatState::Closed);

        chat.open(t0);
        chat.key("Enter");
        assert!(chat.is_open());
        chat.key(DISMISS_KEY);
        assert!(!chat.is_open());
    }

    #[test]
    fn test_message_ids_follow_creation_order() {
        let mut chat = conversation();
        let t0 = Instant::now();
        chat.open(t0);
        chat.poll(t0 + ms(600));
        chat.submit("salom", t0 + ms(700));
        chat.poll(t0 + ms(1700));
        let ids: Vec<_> = chat.transcript().iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_delivers_turns_in_order() {
        let (session, mut events) = AssistantSession::spawn(conversation());

        session.send(ChatCommand::Open).unwrap();
        assert_eq!(events.recv().await, Some(ChatEvent::Opened));
        assert_eq!(events.recv().await, Some(ChatEvent::Typing(true)));

        let Some(ChatEvent::Message(greeting)) = events.recv().await else {
            panic!("expected greeting");
        };
        assert_eq!(greeting.sender, Sender::Bot);
        assert_eq!(events.recv().await, Some(ChatEvent::Typing(false)));

        session.send(ChatCommand::Submit("narx".to_string())).unwrap();
        session.send(ChatCommand::Submit("manzil".to_string())).unwrap();

        let Some(ChatEvent::Message(user)) = events.recv().await else {
            panic!("expected user bubble");
        };
        assert_eq!(user.text, "narx");
        assert_eq!(events.recv().await, Some(ChatEvent::Typing(true)));
        assert_eq!(
            events.recv().await,
            Some(ChatEvent::Rejected(Submission::Busy))
        );

        let Some(ChatEvent::Message(reply)) = events.recv().await else {
            panic!("expected bot reply");
        };
        assert!(reply.text.starts_with("Kurslarimiz narxlari"));

        session.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_close_cancels_reply() {
        let (session, mut events) = AssistantSession::spawn(conversation());
        session.send(ChatCommand::Open).unwrap();
        session.send(ChatCommand::Key(DISMISS_KEY.to_string())).unwrap();

        assert_eq!(events.recv().await, Some(ChatEvent::Opened));
        assert_eq!(events.recv().await, Some(ChatEvent::Typing(true)));
        assert_eq!(events.recv().await, Some(ChatEvent::Closed));
        assert_eq!(events.recv().await, Some(ChatEvent::Typing(false)));

        tokio::time::sleep(ms(5000)).await;
        assert!(events.try_recv().is_err());
        session.shutdown().await.unwrap();
    }
}

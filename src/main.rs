//! Line-oriented terminal front-end for the Mingle backend.
//!
//! Thin by design: it maps slash commands onto the REST surface, keeps at
//! most one chat connection open, and prints reconciled log events as the
//! connection delivers them.

use std::path::Path;

use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use mingle_client::api::ApiClient;
use mingle_client::config::Config;
use mingle_client::connection::ChatConnection;
use mingle_client::messages::{ChatMessage, Sender, BOT_DISPLAY_NAME};
use mingle_client::session::Session;
use mingle_client::transcript::ChatEvent;

const HELP: &str = "\
/register <email> <username> <password>
/login <email> <password>    /logout
/chats    /new [title]    /open <chat-id>    /rename <title>    /delete <chat-id>
/members    /invite <email>...    /remove <member-id>    /users
/pdfs    /upload <path>    /rmpdf <pdf-id>
/bidding    /bid <amount> <max-budget>
/health    /close    /quit
anything else is sent to the open chat";

struct OpenChat {
    connection: ChatConnection,
    printer: JoinHandle<()>,
}

struct App {
    config: Config,
    api: ApiClient,
    session: Option<Session>,
    open: Option<OpenChat>,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };
    info!("using backend {}", config.server);

    let api = ApiClient::new(config.server.clone());
    let mut app = App {
        config,
        api,
        session: None,
        open: None,
    };

    println!("mingle: /help for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !app.dispatch(line.trim()).await {
            break;
        }
    }
    app.close_chat();
}

impl App {
    /// Handle one input line. Returns false to quit.
    async fn dispatch(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        if !line.starts_with('/') {
            self.say(line);
            return true;
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        match command {
            "/help" => println!("{HELP}"),
            "/register" => self.register(rest).await,
            "/login" => self.login(rest).await,
            "/logout" => {
                self.close_chat();
                self.session = None;
                println!("signed out");
            }
            "/chats" => self.list_chats().await,
            "/new" => self.new_chat(rest).await,
            "/open" => match rest.parse::<i64>() {
                Ok(chat_id) => self.open_chat(chat_id).await,
                Err(_) => println!("usage: /open <chat-id>"),
            },
            "/rename" => self.rename_chat(rest).await,
            "/delete" => match rest.parse::<i64>() {
                Ok(chat_id) => self.delete_chat(chat_id).await,
                Err(_) => println!("usage: /delete <chat-id>"),
            },
            "/members" => self.list_members().await,
            "/invite" => self.invite(rest).await,
            "/remove" => match rest.parse::<i64>() {
                Ok(member_id) => self.remove_member(member_id).await,
                Err(_) => println!("usage: /remove <member-id>"),
            },
            "/users" => self.list_users().await,
            "/pdfs" => self.list_pdfs().await,
            "/upload" => self.upload_pdf(rest).await,
            "/rmpdf" => match rest.parse::<i64>() {
                Ok(pdf_id) => match self.api.delete_pdf(pdf_id).await {
                    Ok(()) => println!("PDF {pdf_id} deleted"),
                    Err(e) => println!("could not delete PDF: {e}"),
                },
                Err(_) => println!("usage: /rmpdf <pdf-id>"),
            },
            "/bidding" => self.show_bidding().await,
            "/bid" => self.update_bidding(rest).await,
            "/health" => match self.api.health().await {
                Ok(()) => println!("backend is up"),
                Err(e) => println!("backend check failed: {e}"),
            },
            "/close" => {
                self.close_chat();
                println!("chat closed");
            }
            "/quit" => return false,
            _ => println!("unknown command {command}, try /help"),
        }
        true
    }

    fn signed_in(&self) -> Option<Session> {
        if self.session.is_none() {
            println!("sign in first: /login <email> <password>");
        }
        self.session.clone()
    }

    async fn register(&mut self, rest: &str) {
        let mut parts = rest.split_whitespace();
        let (Some(email), Some(username), Some(password), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            println!("usage: /register <email> <username> <password>");
            return;
        };
        match self.api.register(email, username, password).await {
            Ok(session) => {
                println!("registered and signed in as {}", session.username);
                self.session = Some(session);
            }
            Err(e) => println!("registration failed: {e}"),
        }
    }

    async fn login(&mut self, rest: &str) {
        let mut parts = rest.split_whitespace();
        let (Some(email), Some(password), None) = (parts.next(), parts.next(), parts.next())
        else {
            println!("usage: /login <email> <password>");
            return;
        };
        match self.api.login(email, password).await {
            Ok(session) => {
                println!("signed in as {}", session.username);
                self.session = Some(session);
            }
            Err(e) => println!("login failed: {e}"),
        }
    }

    async fn list_chats(&mut self) {
        let Some(session) = self.signed_in() else { return };
        match self.api.chats(&session).await {
            Ok(chats) if chats.is_empty() => println!("no chats yet, /new <title> to create one"),
            Ok(chats) => {
                for chat in chats {
                    let owner = chat.owner_username.unwrap_or_else(|| "?".to_string());
                    println!("{:>4}  {}  (owner: {owner})", chat.id, chat.title);
                }
            }
            Err(e) => println!("could not list chats: {e}"),
        }
    }

    async fn new_chat(&mut self, rest: &str) {
        let Some(session) = self.signed_in() else { return };
        let title = if rest.is_empty() { "New Chat" } else { rest };
        match self.api.create_chat(&session, title).await {
            Ok(chat_id) => {
                println!("created chat \"{title}\" ({chat_id})");
                self.open_chat(chat_id).await;
            }
            Err(e) => println!("could not create chat: {e}"),
        }
    }

    async fn open_chat(&mut self, chat_id: i64) {
        let Some(session) = self.signed_in() else { return };
        // Switching always releases the previous socket first.
        self.close_chat();
        let history = match self.api.chat_messages(&session, chat_id).await {
            Ok(history) => history,
            Err(e) => {
                println!("could not load history for chat {chat_id}: {e}");
                return;
            }
        };
        match ChatConnection::open(&self.config.ws_origin(), chat_id, &session, history).await {
            Ok((connection, mut events)) => {
                println!("=== chat {chat_id} ===");
                for message in connection.log().await {
                    print_message(&message, &session.username);
                }
                let username = session.username.clone();
                let printer = tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        match event {
                            ChatEvent::Appended(message) => print_message(&message, &username),
                            ChatEvent::TypingStarted => {
                                println!("{BOT_DISPLAY_NAME} is typing...");
                            }
                            ChatEvent::TypingEnded => {}
                            ChatEvent::Closed => {
                                println!("connection closed, /open {chat_id} to reconnect");
                                break;
                            }
                        }
                    }
                });
                self.open = Some(OpenChat { connection, printer });
            }
            Err(e) => println!("could not open chat {chat_id}: {e}"),
        }
    }

    async fn rename_chat(&mut self, title: &str) {
        let Some(session) = self.signed_in() else { return };
        let Some(open) = &self.open else {
            println!("no open chat, /open <id> first");
            return;
        };
        if title.is_empty() {
            println!("usage: /rename <new title>");
            return;
        }
        let chat_id = open.connection.chat_id();
        match self.api.rename_chat(&session, chat_id, title).await {
            Ok(()) => println!("chat renamed to \"{title}\""),
            Err(e) => println!("could not rename chat: {e}"),
        }
    }

    async fn delete_chat(&mut self, chat_id: i64) {
        let Some(session) = self.signed_in() else { return };
        if self
            .open
            .as_ref()
            .is_some_and(|open| open.connection.chat_id() == chat_id)
        {
            self.close_chat();
        }
        match self.api.delete_chat(&session, chat_id).await {
            Ok(()) => println!("chat {chat_id} deleted"),
            Err(e) => println!("could not delete chat: {e}"),
        }
    }

    async fn list_members(&mut self) {
        let Some(session) = self.signed_in() else { return };
        let Some(open) = &self.open else {
            println!("no open chat, /open <id> first");
            return;
        };
        match self.api.members(&session, open.connection.chat_id()).await {
            Ok(members) => {
                for member in members {
                    println!("{:>4}  {}  <{}>", member.id, member.username, member.email);
                }
            }
            Err(e) => println!("could not list members: {e}"),
        }
    }

    async fn invite(&mut self, rest: &str) {
        let Some(session) = self.signed_in() else { return };
        let Some(open) = &self.open else {
            println!("no open chat, /open <id> first");
            return;
        };
        let emails: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if emails.is_empty() {
            println!("usage: /invite <email>...");
            return;
        }
        match self
            .api
            .invite(&session, open.connection.chat_id(), &emails)
            .await
        {
            Ok(message) => println!("{message}"),
            Err(e) => println!("could not invite: {e}"),
        }
    }

    async fn remove_member(&mut self, member_id: i64) {
        let Some(session) = self.signed_in() else { return };
        let Some(open) = &self.open else {
            println!("no open chat, /open <id> first");
            return;
        };
        match self
            .api
            .remove_member(&session, open.connection.chat_id(), member_id)
            .await
        {
            Ok(()) => println!("member {member_id} removed"),
            Err(e) => println!("could not remove member: {e}"),
        }
    }

    async fn list_users(&mut self) {
        let Some(session) = self.signed_in() else { return };
        match self.api.users(&session).await {
            Ok(users) => {
                for user in users {
                    println!("{:>4}  {}  <{}>", user.id, user.username, user.email);
                }
            }
            Err(e) => println!("could not list users: {e}"),
        }
    }

    async fn list_pdfs(&mut self) {
        match self.api.pdfs().await {
            Ok(pdfs) if pdfs.is_empty() => println!("no PDFs uploaded"),
            Ok(pdfs) => {
                for pdf in pdfs {
                    println!("{:>4}  {}", pdf.id, pdf.filename);
                }
            }
            Err(e) => println!("could not list PDFs: {e}"),
        }
    }

    async fn upload_pdf(&mut self, rest: &str) {
        if rest.is_empty() {
            println!("usage: /upload <path-to-pdf>");
            return;
        }
        let path = Path::new(rest);
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.pdf")
            .to_string();
        match tokio::fs::read(path).await {
            Ok(bytes) => match self.api.upload_pdf(&filename, bytes).await {
                Ok(message) => println!("{message}"),
                Err(e) => println!("upload failed: {e}"),
            },
            Err(e) => println!("could not read {}: {e}", path.display()),
        }
    }

    async fn show_bidding(&mut self) {
        let Some(session) = self.signed_in() else { return };
        match self.api.bidding_rules(&session).await {
            Ok(rules) => println!(
                "bid {:.2} / budget {:.2} / charged so far {:.2}",
                rules.bid_amount, rules.max_budget, rules.charged_amount
            ),
            Err(e) => println!("could not fetch bidding rules: {e}"),
        }
    }

    async fn update_bidding(&mut self, rest: &str) {
        let Some(session) = self.signed_in() else { return };
        let mut parts = rest.split_whitespace();
        let (Some(Ok(bid_amount)), Some(Ok(max_budget)), None) = (
            parts.next().map(str::parse::<f64>),
            parts.next().map(str::parse::<f64>),
            parts.next(),
        ) else {
            println!("usage: /bid <amount> <max-budget>");
            return;
        };
        match self
            .api
            .update_bidding_rules(&session, bid_amount, max_budget)
            .await
        {
            Ok(()) => println!("bidding rules updated"),
            Err(e) => println!("could not update bidding rules: {e}"),
        }
    }

    fn say(&self, text: &str) {
        let Some(open) = &self.open else {
            println!("no open chat, /open <id> first");
            return;
        };
        if let Err(e) = open.connection.send(text) {
            println!("send failed: {e}");
        }
    }

    fn close_chat(&mut self) {
        if let Some(mut open) = self.open.take() {
            open.connection.close();
            open.printer.abort();
        }
    }
}

fn print_message(message: &ChatMessage, self_username: &str) {
    if message.placeholder {
        return;
    }
    let label = match message.sender {
        Sender::Bot => BOT_DISPLAY_NAME.to_string(),
        Sender::System => "system".to_string(),
        Sender::User => {
            if message.is_own_echo(self_username) {
                "you".to_string()
            } else {
                message
                    .sender_username
                    .clone()
                    .unwrap_or_else(|| "user".to_string())
            }
        }
    };
    println!("[{label}] {}", message.content);
}

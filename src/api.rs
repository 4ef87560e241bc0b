//! Typed REST surface of the Mingle backend.
//!
//! Authenticated calls carry `Authorization: Bearer <token>` from the
//! session passed in; a non-2xx status becomes [`ClientError::Api`] with the
//! server's `detail` text. Failures here never touch the chat log.

use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;

use crate::error::ClientError;
use crate::messages::{BiddingRules, ChatMessage, ChatSummary, PdfEntry, User};
use crate::session::Session;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ChatsEnvelope {
    chats: Vec<ChatSummary>,
}

#[derive(Debug, Deserialize)]
struct MessagesEnvelope {
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MembersEnvelope {
    members: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct PdfsEnvelope {
    pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Deserialize)]
struct CreatedChat {
    chat_id: i64,
}

#[derive(Debug, Deserialize)]
struct Notice {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiDetail {
    detail: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base: base.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = match response.json::<ApiDetail>().await {
            Ok(body) => body.detail,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    // --- auth ---

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::expect_ok(response).await?.json().await?;
        Ok(Session::new(auth.access_token, auth.username, email.to_string()))
    }

    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "username": username, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::expect_ok(response).await?.json().await?;
        Ok(Session::new(auth.access_token, auth.username, email.to_string()))
    }

    pub async fn users(&self, session: &Session) -> Result<Vec<User>, ClientError> {
        let response = self
            .http
            .get(self.url("/users"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Ok(Self::expect_ok(response).await?.json().await?)
    }

    // --- chats ---

    pub async fn chats(&self, session: &Session) -> Result<Vec<ChatSummary>, ClientError> {
        let response = self
            .http
            .get(self.url("/chats"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let envelope: ChatsEnvelope = Self::expect_ok(response).await?.json().await?;
        Ok(envelope.chats)
    }

    pub async fn create_chat(&self, session: &Session, title: &str) -> Result<i64, ClientError> {
        let response = self
            .http
            .post(self.url("/chats"))
            .bearer_auth(&session.token)
            .json(&json!({ "title": title }))
            .send()
            .await?;
        let created: CreatedChat = Self::expect_ok(response).await?.json().await?;
        Ok(created.chat_id)
    }

    pub async fn rename_chat(
        &self,
        session: &Session,
        chat_id: i64,
        title: &str,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/chats/{chat_id}")))
            .bearer_auth(&session.token)
            .json(&json!({ "title": title }))
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    pub async fn delete_chat(&self, session: &Session, chat_id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/chats/{chat_id}")))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    /// History fetch used to seed the log before the socket takes over.
    pub async fn chat_messages(
        &self,
        session: &Session,
        chat_id: i64,
    ) -> Result<Vec<ChatMessage>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/chats/{chat_id}/messages")))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let envelope: MessagesEnvelope = Self::expect_ok(response).await?.json().await?;
        Ok(envelope.messages)
    }

    pub async fn members(&self, session: &Session, chat_id: i64) -> Result<Vec<User>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/chats/{chat_id}/members")))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let envelope: MembersEnvelope = Self::expect_ok(response).await?.json().await?;
        Ok(envelope.members)
    }

    pub async fn invite(
        &self,
        session: &Session,
        chat_id: i64,
        emails: &[String],
    ) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/chats/{chat_id}/invite")))
            .bearer_auth(&session.token)
            .json(&json!({ "emails": emails }))
            .send()
            .await?;
        let notice: Notice = Self::expect_ok(response).await?.json().await?;
        Ok(notice.message)
    }

    pub async fn remove_member(
        &self,
        session: &Session,
        chat_id: i64,
        member_id: i64,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/chats/{chat_id}/members/{member_id}")))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    // --- pdfs (public endpoints, matching the backend) ---

    pub async fn pdfs(&self) -> Result<Vec<PdfEntry>, ClientError> {
        let response = self.http.get(self.url("/pdfs")).send().await?;
        let envelope: PdfsEnvelope = Self::expect_ok(response).await?.json().await?;
        Ok(envelope.pdfs)
    }

    pub async fn upload_pdf(&self, filename: &str, bytes: Vec<u8>) -> Result<String, ClientError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.url("/upload-pdf"))
            .multipart(form)
            .send()
            .await?;
        let notice: Notice = Self::expect_ok(response).await?.json().await?;
        Ok(notice.message)
    }

    pub async fn delete_pdf(&self, pdf_id: i64) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/pdfs/{pdf_id}")))
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    // --- bidding (restaurant accounts) ---

    pub async fn bidding_rules(&self, session: &Session) -> Result<BiddingRules, ClientError> {
        let response = self
            .http
            .get(self.url("/api/bidding"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Ok(Self::expect_ok(response).await?.json().await?)
    }

    pub async fn update_bidding_rules(
        &self,
        session: &Session,
        bid_amount: f64,
        max_budget: f64,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/api/bidding"))
            .bearer_auth(&session.token)
            .json(&json!({ "bid_amount": bid_amount, "max_budget": max_budget }))
            .send()
            .await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Self::expect_ok(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;

    #[test]
    fn chats_envelope_tolerates_missing_owner() {
        let envelope: ChatsEnvelope = serde_json::from_str(
            r#"{"chats": [
                {"id": 1, "title": "Q3 Earnings", "last_updated": "2024-01-01"},
                {"id": 2, "title": "Menus", "owner_username": "ada"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(envelope.chats.len(), 2);
        assert_eq!(envelope.chats[0].owner_username, None);
        assert_eq!(envelope.chats[1].owner_username.as_deref(), Some("ada"));
    }

    #[test]
    fn history_envelope_matches_backend_rows() {
        let envelope: MessagesEnvelope = serde_json::from_str(
            r#"{"messages": [
                {"id": 1, "content": "hi", "sender": "user", "timestamp": "2024-01-01 10:00:00"},
                {"id": 2, "content": "hello", "sender": "bot", "timestamp": "2024-01-01 10:00:05"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(envelope.messages.len(), 2);
        assert_eq!(envelope.messages[1].sender, Sender::Bot);
    }

    #[test]
    fn members_and_pdfs_envelopes_deserialize() {
        let members: MembersEnvelope = serde_json::from_str(
            r#"{"members": [{"id": 1, "email": "a@x.com", "username": "ada"}]}"#,
        )
        .unwrap();
        assert_eq!(members.members[0].username, "ada");

        let pdfs: PdfsEnvelope =
            serde_json::from_str(r#"{"pdfs": [{"id": 3, "filename": "menu.pdf"}]}"#).unwrap();
        assert_eq!(pdfs.pdfs[0].filename, "menu.pdf");
    }

    #[test]
    fn error_detail_and_auth_shapes_deserialize() {
        let detail: ApiDetail =
            serde_json::from_str(r#"{"detail": "Only the chat owner can delete the chat."}"#)
                .unwrap();
        assert!(detail.detail.contains("owner"));

        let auth: AuthResponse = serde_json::from_str(
            r#"{"access_token": "tok", "token_type": "bearer", "username": "ada"}"#,
        )
        .unwrap();
        assert_eq!(auth.access_token, "tok");
        assert_eq!(auth.username, "ada");
    }
}
